//! RANSAC plane fitting for terrain surface samples.
//!
//! Fits a single dominant plane to a small cloud of patch-top samples,
//! robust to outliers such as overhanging or protruding patches.

use nalgebra::{Matrix3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::plane::Hyperplane;

/// Configuration for RANSAC plane fitting.
#[derive(Clone, Debug)]
pub struct PlaneRansacConfig {
    /// Maximum number of iterations.
    /// Default: 50
    pub max_iterations: usize,

    /// Inlier distance threshold (meters).
    /// Default: 0.1m
    pub inlier_threshold: f64,

    /// Minimum number of points and inliers for a valid model.
    /// Default: 5
    pub min_points: usize,
}

impl Default for PlaneRansacConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            inlier_threshold: 0.1,
            min_points: 5,
        }
    }
}

/// Result of a successful plane fit.
#[derive(Clone, Debug)]
pub struct PlaneFit {
    /// Fitted plane; the normal points upward (`n.z >= 0`).
    pub plane: Hyperplane,
    /// Number of inliers supporting the model.
    pub inliers: usize,
}

/// Fit a plane to `points` with RANSAC followed by a least-squares refit
/// over the consensus set.
///
/// The fit is a pure function of its inputs: `seed` fixes the sampling
/// sequence, so the same cloud always yields the same plane regardless of
/// which thread performs the fit.
///
/// Returns `None` if there are fewer than `min_points` samples or no model
/// reaches `min_points` inliers.
pub fn fit_plane_ransac(
    points: &[Vector3<f64>],
    config: &PlaneRansacConfig,
    seed: u64,
) -> Option<PlaneFit> {
    let n = points.len();
    if n < config.min_points {
        return None;
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut best_count = 0;
    let mut best_plane = None;

    for _ in 0..config.max_iterations {
        let (a, b, c) = sample_triplet(&mut rng, n);
        let normal = (points[b] - points[a]).cross(&(points[c] - points[a]));
        if normal.norm() < 1e-12 {
            // degenerate sample
            continue;
        }
        let plane = Hyperplane::from_point_normal(&points[a], normal);

        let count = points
            .iter()
            .filter(|p| plane.signed_distance(p).abs() <= config.inlier_threshold)
            .count();
        if count > best_count {
            best_count = count;
            best_plane = Some(plane);
            if count == n {
                break;
            }
        }
    }

    let plane = best_plane?;
    if best_count < config.min_points {
        return None;
    }

    let inliers: Vec<Vector3<f64>> = points
        .iter()
        .filter(|p| plane.signed_distance(p).abs() <= config.inlier_threshold)
        .copied()
        .collect();

    Some(PlaneFit {
        plane: refit_least_squares(&inliers).unwrap_or(plane),
        inliers: best_count,
    })
}

fn sample_triplet(rng: &mut StdRng, n: usize) -> (usize, usize, usize) {
    let a = rng.random_range(0..n);
    let mut b = rng.random_range(0..n);
    while b == a {
        b = rng.random_range(0..n);
    }
    let mut c = rng.random_range(0..n);
    while c == a || c == b {
        c = rng.random_range(0..n);
    }
    (a, b, c)
}

/// Total-least-squares plane through a point set: the centroid together
/// with the smallest-variance direction of the covariance matrix.
fn refit_least_squares(points: &[Vector3<f64>]) -> Option<Hyperplane> {
    if points.len() < 3 {
        return None;
    }

    let centroid: Vector3<f64> = points.iter().sum::<Vector3<f64>>() / points.len() as f64;
    let mut covariance = Matrix3::zeros();
    for p in points {
        let d = p - centroid;
        covariance += d * d.transpose();
    }

    let eigen = covariance.symmetric_eigen();
    let smallest = eigen.eigenvalues.imin();
    let mut normal: Vector3<f64> = eigen.eigenvectors.column(smallest).into_owned();
    if normal.norm() < 1e-12 {
        return None;
    }
    // orient upward so slope lands in [0, pi/2]
    if normal.z < 0.0 {
        normal = -normal;
    }
    Some(Hyperplane::from_point_normal(&centroid, normal))
}
