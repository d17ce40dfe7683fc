//! 3D axis-aligned bounding boxes.

use nalgebra::Vector3;

/// Axis-aligned bounding box in 3D space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb3 {
    /// Minimum corner (smallest x, y and z values).
    pub min: Vector3<f64>,
    /// Maximum corner (largest x, y and z values).
    pub max: Vector3<f64>,
}

impl Aabb3 {
    /// Create a new bounding box from min and max corners.
    #[inline]
    pub const fn new(min: Vector3<f64>, max: Vector3<f64>) -> Self {
        Self { min, max }
    }

    /// Create a bounding box centered on `center` extending `half_extents`
    /// in every direction.
    #[inline]
    pub fn from_center_half_extents(center: Vector3<f64>, half_extents: Vector3<f64>) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Center of the box.
    #[inline]
    pub fn center(&self) -> Vector3<f64> {
        (self.min + self.max) * 0.5
    }

    /// Check whether a point lies inside the box (inclusive).
    #[inline]
    pub fn contains(&self, p: &Vector3<f64>) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Check whether the vertical interval `[bottom, top]` overlaps the
    /// box's z range.
    #[inline]
    pub fn overlaps_z(&self, bottom: f64, top: f64) -> bool {
        bottom <= self.max.z && top >= self.min.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_center() {
        let b = Aabb3::from_center_half_extents(
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::new(0.5, 0.5, 1.0),
        );
        assert_eq!(b.min, Vector3::new(0.5, 1.5, 2.0));
        assert_eq!(b.max, Vector3::new(1.5, 2.5, 4.0));
        assert_eq!(b.center(), Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_contains() {
        let b = Aabb3::new(Vector3::zeros(), Vector3::new(1.0, 1.0, 1.0));
        assert!(b.contains(&Vector3::new(0.5, 0.5, 0.5)));
        assert!(b.contains(&Vector3::new(0.0, 1.0, 0.0)));
        assert!(!b.contains(&Vector3::new(0.5, 0.5, 1.1)));
    }

    #[test]
    fn test_overlaps_z() {
        let b = Aabb3::new(Vector3::new(0.0, 0.0, -0.2), Vector3::new(1.0, 1.0, 0.2));
        assert!(b.overlaps_z(0.0, 0.0));
        assert!(b.overlaps_z(-1.0, -0.2));
        assert!(!b.overlaps_z(0.3, 1.0));
    }
}
