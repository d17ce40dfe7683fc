//! Oriented planes in 3D.

use nalgebra::{Unit, Vector3};

/// An infinite plane `n · p + d = 0` with unit normal `n`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hyperplane {
    normal: Unit<Vector3<f64>>,
    offset: f64,
}

impl Hyperplane {
    /// Create from a (not necessarily unit) normal and the plane offset.
    pub fn new(normal: Vector3<f64>, offset: f64) -> Self {
        let norm = normal.norm();
        Self {
            normal: Unit::new_unchecked(normal / norm),
            offset: offset / norm,
        }
    }

    /// Plane through `point` with the given normal.
    pub fn from_point_normal(point: &Vector3<f64>, normal: Vector3<f64>) -> Self {
        let normal = Unit::new_normalize(normal);
        Self {
            offset: -normal.dot(point),
            normal,
        }
    }

    /// Unit normal of the plane.
    #[inline]
    pub fn normal(&self) -> Unit<Vector3<f64>> {
        self.normal
    }

    /// Signed distance from `p` to the plane; positive on the side the
    /// normal points to.
    #[inline]
    pub fn signed_distance(&self, p: &Vector3<f64>) -> f64 {
        self.normal.dot(p) + self.offset
    }

    /// Height of the plane above `(x, y)`: the z where the vertical line
    /// through the point pierces the plane. Non-finite for a vertical plane.
    pub fn height_at(&self, x: f64, y: f64) -> f64 {
        -(self.offset + self.normal.x * x + self.normal.y * y) / self.normal.z
    }

    /// Angle between the plane normal and vertical, in `[0, π]`.
    pub fn slope(&self) -> f64 {
        self.normal.z.clamp(-1.0, 1.0).acos()
    }

    /// Direction of steepest ascent: the projection of vertical onto the
    /// plane. Zero for a horizontal plane.
    pub fn slope_direction(&self) -> Vector3<f64> {
        let n = self.normal.into_inner();
        Vector3::z() - n.z * n
    }
}
