//! Oriented-bounding-box collision tests against the elevation map.

use bhumi_map::{Aabb3, MlsGrid};
use nalgebra::{Unit, UnitQuaternion, Vector3};

use crate::config::TraversabilityConfig;

/// Check whether the robot body collides with any surface patch when
/// standing at `position` (body center) on a support plane with the given
/// normal, yawed by `yaw`.
///
/// The body is an oriented box: the support plane's tilt composed with the
/// yaw rotation. Each patch is tested by its top surface point only, so
/// the z half-extent is a quarter of the body height rather than half;
/// with the full extent the box would straddle the very patches the robot
/// stands on.
///
/// Returns `true` when the pose is collision free.
pub(crate) fn is_collision_free(
    mls: &MlsGrid,
    config: &TraversabilityConfig,
    position: &Vector3<f64>,
    plane_normal: &Unit<Vector3<f64>>,
    yaw: f64,
) -> bool {
    let half = Vector3::new(
        config.robot_size_x / 2.0,
        config.robot_size_y / 2.0,
        config.robot_height / 2.0 / 2.0,
    );

    let tilt = UnitQuaternion::rotation_between(&Vector3::z(), plane_normal)
        .unwrap_or_else(UnitQuaternion::identity);
    let spin = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), yaw);
    let rot = (tilt * spin).to_rotation_matrix();

    // world-aligned box around the oriented body
    let extents = rot.matrix().abs() * half;
    let aabb = Aabb3::from_center_half_extents(*position, extents);

    let rot_inv = rot.matrix().transpose();
    !mls.intersect_aabb(&aabb, |idx, patch| {
        let mut p = mls.cell_center(idx);
        p.z = patch.top();
        let local = rot_inv * (p - position);
        local.x.abs() <= half.x && local.y.abs() <= half.y && local.z.abs() <= half.z
    })
}
