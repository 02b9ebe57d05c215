// Presence Tag — Gravity Compensation

use crate::events::Axes;
use crate::fusion::orientation::OrientationState;

/// Unit gravity vector in the sensor frame for the given roll/pitch (degrees).
/// Flat and z-up gives `(0, 0, 1)`.
pub fn gravity_vector(roll_deg: f32, pitch_deg: f32) -> Axes {
    let roll = roll_deg.to_radians();
    let pitch = pitch_deg.to_radians();
    Axes::new(
        -pitch.sin(),
        roll.sin() * pitch.cos(),
        roll.cos() * pitch.cos(),
    )
}

/// Acceleration (g) with the static gravity component removed.
pub fn linear_acceleration(accel: Axes, orientation: &OrientationState) -> Axes {
    accel - gravity_vector(orientation.roll, orientation.pitch)
}
