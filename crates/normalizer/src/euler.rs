//! Quaternion to Euler angle conversion.

use contracts::Attitude;
use nalgebra::{Quaternion, Unit};

const MIN_QUAT_NORM: f64 = 1.0e-9;

/// Convert an `(x, y, z, w)` quaternion to roll/pitch/yaw.
///
/// Angles follow the extrinsic x-y-z convention. A quaternion whose
/// norm is effectively zero cannot be normalized and maps to all-zero
/// angles.
pub fn quat_to_attitude(x: f64, y: f64, z: f64, w: f64) -> Attitude {
    match Unit::try_new(Quaternion::new(w, x, y, z), MIN_QUAT_NORM) {
        Some(rotation) => {
            let (roll, pitch, yaw) = rotation.euler_angles();
            Attitude::new(roll, pitch, yaw)
        }
        None => Attitude::default(),
    }
}
