//! Vertical surface intervals stored in grid cells.

use serde::{Deserialize, Serialize};

/// A surface patch: the vertical interval `[bottom, top]` occupied by
/// terrain within one grid cell.
///
/// A zero-thickness patch represents a bare surface sample; a thick patch
/// represents a solid column such as a wall or a raised slab.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SurfacePatch {
    bottom: f64,
    top: f64,
}

impl SurfacePatch {
    /// Create a patch spanning `[bottom, top]`. Corners are swapped if given
    /// in the wrong order.
    pub fn new(bottom: f64, top: f64) -> Self {
        if bottom <= top {
            Self { bottom, top }
        } else {
            Self {
                bottom: top,
                top: bottom,
            }
        }
    }

    /// Create a zero-thickness patch at height `z`.
    #[inline]
    pub fn thin(z: f64) -> Self {
        Self { bottom: z, top: z }
    }

    /// Height of the patch's top surface.
    #[inline]
    pub fn top(&self) -> f64 {
        self.top
    }

    /// Height of the patch's bottom surface.
    #[inline]
    pub fn bottom(&self) -> f64 {
        self.bottom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corner_order() {
        let p = SurfacePatch::new(1.0, -1.0);
        assert_eq!(p.bottom(), -1.0);
        assert_eq!(p.top(), 1.0);
    }

    #[test]
    fn test_thin() {
        let p = SurfacePatch::thin(0.5);
        assert_eq!(p.bottom(), p.top());
    }
}
