// Presence Tag — Complementary-filter Orientation Estimator

use crate::events::{Axes, SensorSample};

/// Fused attitude in degrees.  Yaw is integrated gyro only and drifts without bound.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrientationState {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

impl OrientationState {
    pub fn is_finite(&self) -> bool {
        self.roll.is_finite() && self.pitch.is_finite() && self.yaw.is_finite()
    }
}

/// Roll and pitch (degrees) implied by the gravity direction alone.
pub fn tilt_angles(accel: Axes) -> (f32, f32) {
    let roll = accel.y.atan2(accel.z).to_degrees();
    let pitch = (-accel.x)
        .atan2((accel.y * accel.y + accel.z * accel.z).sqrt())
        .to_degrees();
    (roll, pitch)
}

#[derive(Debug, Clone)]
pub struct OrientationEstimator {
    alpha: f32,
    nominal_dt: f32,
    max_dt: f32,
    state: OrientationState,
}

impl OrientationEstimator {
    pub fn new(alpha: f32, nominal_dt: f32, max_dt: f32) -> Self {
        Self {
            alpha,
            nominal_dt,
            max_dt,
            state: OrientationState::default(),
        }
    }

    pub fn state(&self) -> OrientationState {
        self.state
    }

    /// Usable integration step: zero, negative (timer wrap) and non-finite
    /// values fall back to the nominal period, long stalls are capped.
    pub fn clamp_dt(&self, dt: f32) -> f32 {
        if !dt.is_finite() || dt <= 0.0 {
            self.nominal_dt
        } else {
            dt.min(self.max_dt)
        }
    }

    /// Blend integrated gyro rate with accelerometer tilt and integrate yaw,
    /// without touching the stored state.
    pub fn next(&self, sample: &SensorSample, dt: f32) -> OrientationState {
        let dt = self.clamp_dt(dt);
        let (acc_roll, acc_pitch) = tilt_angles(sample.accel);
        let prev = self.state;
        let a = self.alpha;

        OrientationState {
            roll: a * (prev.roll + sample.gyro.x * dt) + (1.0 - a) * acc_roll,
            pitch: a * (prev.pitch + sample.gyro.y * dt) + (1.0 - a) * acc_pitch,
            yaw: prev.yaw + sample.gyro.z * dt,
        }
    }

    /// Accept a state produced by [`next`](Self::next).
    pub fn commit(&mut self, state: OrientationState) {
        self.state = state;
    }

    pub fn update(&mut self, sample: &SensorSample, dt: f32) -> OrientationState {
        let state = self.next(sample, dt);
        self.commit(state);
        state
    }
}
