//! Helpers for moving between the Euler rotations entities integrate each tick
//! and the quaternions picking and look-at math need. Rotations use the XYZ
//! intrinsic order with +Y up; an entity's facing axis is its local +Z.

use glam::{EulerRot, Mat3, Quat, Vec3};

/// Quaternion for an `{x, y, z}` Euler rotation in radians.
pub fn quat_from_euler(rotation: Vec3) -> Quat {
    Quat::from_euler(EulerRot::XYZ, rotation.x, rotation.y, rotation.z)
}

pub fn euler_from_quat(quaternion: Quat) -> Vec3 {
    let (x, y, z) = quaternion.to_euler(EulerRot::XYZ);
    Vec3::new(x, y, z)
}

/// Rotation that turns local +Z from `from` toward `to`, keeping +Y as close
/// to world up as the direction allows. Returns `None` when the points
/// coincide.
pub fn look_at_rotation(from: Vec3, to: Vec3) -> Option<Quat> {
    let forward = (to - from).try_normalize()?;
    let mut right = Vec3::Y.cross(forward);
    if right.length_squared() <= f32::EPSILON {
        // Looking straight up or down; borrow +Z as the reference axis.
        right = forward.cross(Vec3::Z);
    }
    let right = right.try_normalize()?;
    let up = forward.cross(right);
    Some(Quat::from_mat3(&Mat3::from_cols(right, up, forward)).normalize())
}

/// Euler form of [`look_at_rotation`].
pub fn look_at_euler(from: Vec3, to: Vec3) -> Option<Vec3> {
    look_at_rotation(from, to).map(euler_from_quat)
}

#[cfg(test)]
mod tests {
    use super::*;
    const EPSILON: f32 = 1e-5;

    fn approx_eq(a: Vec3, b: Vec3) {
        for (lhs, rhs) in a.to_array().into_iter().zip(b.to_array()) {
            assert!((lhs - rhs).abs() <= EPSILON, "{a} != {b}");
        }
    }

    #[test]
    fn looking_down_positive_z_is_identity() {
        let rotation = look_at_rotation(Vec3::ZERO, Vec3::new(0.0, 0.0, 5.0)).expect("rotation");
        approx_eq(rotation * Vec3::Z, Vec3::Z);
        approx_eq(rotation * Vec3::Y, Vec3::Y);
    }

    #[test]
    fn looking_along_x_turns_about_y() {
        let rotation = look_at_rotation(Vec3::ZERO, Vec3::new(3.0, 0.0, 0.0)).expect("rotation");
        approx_eq(rotation * Vec3::Z, Vec3::X);
        approx_eq(rotation * Vec3::Y, Vec3::Y);
    }

    #[test]
    fn looking_straight_up_still_resolves() {
        let rotation = look_at_rotation(Vec3::ZERO, Vec3::new(0.0, 2.0, 0.0)).expect("rotation");
        approx_eq(rotation * Vec3::Z, Vec3::Y);
    }

    #[test]
    fn coincident_points_have_no_rotation() {
        assert!(look_at_rotation(Vec3::ONE, Vec3::ONE).is_none());
    }

    #[test]
    fn euler_round_trip_preserves_orientation() {
        let rotation = Vec3::new(0.3, -0.7, 1.1);
        let quaternion = quat_from_euler(rotation);
        let back = quat_from_euler(euler_from_quat(quaternion));
        approx_eq(back * Vec3::X, quaternion * Vec3::X);
        approx_eq(back * Vec3::Z, quaternion * Vec3::Z);
    }
}
