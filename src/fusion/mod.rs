// Presence Tag — Sensor-fusion Movement Detector
//
// Sensor read → complementary filter → gravity removal → moving average →
// hysteresis.  All state lives in one `FusionContext` owned by the fusion
// task; the only thing that leaves it is the transition callback.

pub mod calibration;
pub mod gravity;
pub mod motion;
pub mod orientation;

use anyhow::Context;

use crate::config::*;
use crate::events::{Axes, MotionState, SensorSample};
use crate::sensor::{retry_once, InertialSensor};

use self::calibration::CalibrationOffsets;
use self::gravity::linear_acceleration;
use self::motion::MotionDetector;
use self::orientation::{OrientationEstimator, OrientationState};

/// Called with the new state on every moving/not-moving transition.
pub type TransitionListener = Box<dyn FnMut(MotionState) + Send>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FusionStats {
    /// Frames that made it through the whole pipeline.
    pub frames: u64,
    /// Frames dropped because the read failed twice.
    pub skipped_frames: u64,
    pub read_retries: u64,
    /// Samples refused for NaN/Inf values.
    pub rejected_samples: u64,
    pub transitions: u64,
}

/// Everything one pipeline iteration produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionOutput {
    pub sample: SensorSample,
    pub orientation: OrientationState,
    pub linear_accel: Axes,
    pub magnitude: f32,
    pub average: f32,
    pub transition: Option<MotionState>,
}

pub struct FusionContext {
    offsets: CalibrationOffsets,
    estimator: OrientationEstimator,
    detector: MotionDetector,
    listeners: Vec<TransitionListener>,
    stats: FusionStats,
}

impl FusionContext {
    /// Offsets come from [`calibration::calibrate`]; there is no way to run
    /// the classifier without them.
    pub fn new(config: &FusionConfig, offsets: CalibrationOffsets) -> anyhow::Result<Self> {
        config.validate().context("invalid fusion configuration")?;
        Ok(Self {
            offsets,
            estimator: OrientationEstimator::new(config.alpha, config.nominal_dt, config.max_dt),
            detector: MotionDetector::new(
                config.buffer_capacity,
                config.enter_threshold,
                config.exit_threshold,
            ),
            listeners: Vec::new(),
            stats: FusionStats::default(),
        })
    }

    /// Register a callback for state transitions.  Callbacks run on the
    /// fusion task and must not block.
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(MotionState) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn state(&self) -> MotionState {
        self.detector.state()
    }

    pub fn orientation(&self) -> OrientationState {
        self.estimator.state()
    }

    pub fn offsets(&self) -> &CalibrationOffsets {
        &self.offsets
    }

    pub fn stats(&self) -> FusionStats {
        self.stats
    }

    /// Bias-corrected accel + gyro, one retry on a failed transaction.
    pub fn read_sample<S: InertialSensor>(&mut self, sensor: &mut S) -> anyhow::Result<SensorSample> {
        let offsets = self.offsets;
        let retries = &mut self.stats.read_retries;
        retry_once(
            || {
                Ok(SensorSample {
                    accel: sensor.read_accel(offsets.accel_bias())?,
                    gyro: sensor.read_gyro(offsets.gyro())?,
                })
            },
            |e| {
                *retries += 1;
                log::warn!("IMU read failed ({:#}), retrying", e);
            },
        )
    }

    /// Read the sensor and run one iteration.  A frame whose read fails even
    /// after the retry is skipped and the previous fused state is held.
    pub fn tick<S: InertialSensor>(&mut self, sensor: &mut S, dt: f32) -> Option<FusionOutput> {
        match self.read_sample(sensor) {
            Ok(sample) => self.step(sample, dt),
            Err(e) => {
                self.stats.skipped_frames += 1;
                log::warn!("Skipping fusion frame: {:#}", e);
                None
            }
        }
    }

    /// Run one iteration on an already-read sample.  `dt` is the time since
    /// the last processed frame in seconds.
    pub fn step(&mut self, sample: SensorSample, dt: f32) -> Option<FusionOutput> {
        if !sample.is_finite() {
            self.reject(&sample);
            return None;
        }

        // Orientation only advances for samples the motion buffer accepts.
        let orientation = self.estimator.next(&sample, dt);
        let linear_accel = linear_acceleration(sample.accel, &orientation);
        let magnitude = linear_accel.magnitude();

        let Some(update) = self.detector.push(magnitude) else {
            self.reject(&sample);
            return None;
        };
        self.estimator.commit(orientation);

        self.stats.frames += 1;

        if let Some(state) = update.transition {
            self.stats.transitions += 1;
            log::info!("Motion: {} (avg {:.3} g)", state.label(), update.average);
            for listener in self.listeners.iter_mut() {
                listener(state);
            }
        }

        if self.stats.frames % DIAGNOSTIC_LOG_EVERY_FRAMES == 0 {
            log::debug!(
                "roll {:.1}° pitch {:.1}° yaw {:.1}° avg {:.3} g — {:?}",
                orientation.roll,
                orientation.pitch,
                orientation.yaw,
                update.average,
                self.stats
            );
        }

        Some(FusionOutput {
            sample,
            orientation,
            linear_accel,
            magnitude,
            average: update.average,
            transition: update.transition,
        })
    }

    fn reject(&mut self, sample: &SensorSample) {
        self.stats.rejected_samples += 1;
        log::warn!("Dropping IMU sample with non-finite result {:?}", sample);
    }
}
