// Presence Tag — One-time IMU Bias Calibration
//
// Averages a burst of zero-bias reads while the tag rests flat (Z up).  The
// stored offsets are the plain per-axis means.  Gravity is taken back out only
// where the accelerometer offset is applied (`accel_bias`), so corrected
// readings keep the 1 g on Z and the tilt/gravity stages still see it.

use std::thread;

use anyhow::{bail, Context};

use crate::config::*;
use crate::events::Axes;
use crate::sensor::{retry_once, InertialSensor, SensorBlock};

/// Expected accelerometer reading of a flat tag at rest (g).
pub const REST_GRAVITY: Axes = Axes::new(0.0, 0.0, 1.0);

/// Per-axis calibration means, fixed for the rest of the run once computed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationOffsets {
    accel: Axes,
    gyro: Axes,
}

/// An ideal sensor: exactly 1 g on Z, no gyro drift.
impl Default for CalibrationOffsets {
    fn default() -> Self {
        Self::new(REST_GRAVITY, Axes::ZERO)
    }
}

impl CalibrationOffsets {
    pub fn new(accel: Axes, gyro: Axes) -> Self {
        Self { accel, gyro }
    }

    /// Mean accelerometer reading at rest, in g.
    pub fn accel(&self) -> Axes {
        self.accel
    }

    /// Gyroscope bias in °/s.
    pub fn gyro(&self) -> Axes {
        self.gyro
    }

    /// What to subtract from accelerometer reads: the rest mean minus the
    /// gravity a flat tag is expected to feel.
    pub fn accel_bias(&self) -> Axes {
        self.accel - REST_GRAVITY
    }

    /// Fail unless the accelerometer mean is within tolerance of a flat,
    /// z-up tag.  Catches a tag calibrated on its side and a sensor that acks
    /// but never samples.
    pub fn verify_at_rest(&self) -> anyhow::Result<()> {
        if !(self.accel_bias().magnitude() <= CALIBRATION_REST_TOLERANCE_G) {
            bail!(
                "accelerometer reads {:?} g at rest, expected about {:?} g",
                self.accel,
                REST_GRAVITY
            );
        }
        Ok(())
    }
}

/// Mean of `samples` consecutive zero-bias reads of `block`, in physical units.
///
/// Each read gets one retry; a read that still fails aborts the whole average.
pub fn average<S: InertialSensor>(
    sensor: &mut S,
    block: SensorBlock,
    samples: usize,
) -> anyhow::Result<Axes> {
    if samples == 0 {
        bail!("{:?} calibration needs at least one sample", block);
    }

    let mut sum = [0.0f64; 3];
    for i in 0..samples {
        let v = retry_once(
            || sensor.read_scaled(block, Axes::ZERO),
            |e| log::warn!("{:?} calibration read {} failed ({:#}), retrying", block, i, e),
        )
        .with_context(|| format!("{:?} calibration aborted at sample {} of {}", block, i, samples))?;

        sum[0] += v.x as f64;
        sum[1] += v.y as f64;
        sum[2] += v.z as f64;

        if (i + 1) % CALIBRATION_YIELD_EVERY == 0 {
            thread::yield_now();
        }
    }

    let n = samples as f64;
    let mean = Axes::new((sum[0] / n) as f32, (sum[1] / n) as f32, (sum[2] / n) as f32);
    if !mean.is_finite() {
        bail!("{:?} calibration produced a non-finite mean {:?}", block, mean);
    }
    Ok(mean)
}

/// Average `samples` reads of each block into calibration offsets.
///
/// Fails if the sensor cannot be read.  Whether the tag was actually flat is
/// checked separately by [`CalibrationOffsets::verify_at_rest`].
pub fn calibrate<S: InertialSensor>(sensor: &mut S, samples: usize) -> anyhow::Result<CalibrationOffsets> {
    log::info!("Calibrating IMU over {} samples — keep the tag flat and still", samples);

    let accel_mean = average(sensor, SensorBlock::Accel, samples)?;
    let gyro_mean = average(sensor, SensorBlock::Gyro, samples)?;

    log::info!(
        "Calibration done — accel mean ({:.4}, {:.4}, {:.4}) g, gyro bias ({:.3}, {:.3}, {:.3}) °/s",
        accel_mean.x,
        accel_mean.y,
        accel_mean.z,
        gyro_mean.x,
        gyro_mean.y,
        gyro_mean.z
    );
    Ok(CalibrationOffsets::new(accel_mean, gyro_mean))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::{RawFrame, ReplaySensor};

    fn close(a: Axes, b: Axes) -> bool {
        (a - b).magnitude() < 1e-5
    }

    #[test]
    fn constant_signal_averages_to_itself_for_any_count() {
        let frame = RawFrame {
            accel: [120, -340, 16500],
            gyro: [-262, 65, 13],
        };
        let accel = Axes::new(120.0 / 16384.0, -340.0 / 16384.0, 16500.0 / 16384.0);
        let gyro = Axes::new(-2.0, 65.0 / 131.0, 13.0 / 131.0);

        for samples in [1, 7, 1000] {
            let mut imu = ReplaySensor::constant(frame);
            assert!(close(average(&mut imu, SensorBlock::Accel, samples).unwrap(), accel));
            assert!(close(average(&mut imu, SensorBlock::Gyro, samples).unwrap(), gyro));
        }
    }

    #[test]
    fn gyro_is_scaled_with_gyro_constant() {
        let mut imu = ReplaySensor::constant(RawFrame {
            accel: [0, 0, 16384],
            gyro: [131, 0, 0],
        });
        let gyro = average(&mut imu, SensorBlock::Gyro, 10).unwrap();
        assert!((gyro.x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn calibrate_returns_the_mean_of_a_constant_signal() {
        let accel = Axes::new(0.1, -0.05, 0.98);
        let gyro = Axes::new(0.1, -0.05, 0.98);
        let mut imu = ReplaySensor::constant(RawFrame::from_units(accel, gyro));
        let offsets = calibrate(&mut imu, 100).unwrap();

        // Register quantisation: 1/16384 g and 1/131 °/s.
        assert!((offsets.accel() - accel).magnitude() < 1e-4);
        assert!((offsets.gyro() - gyro).magnitude() < 1e-2);
    }

    #[test]
    fn accel_bias_keeps_gravity_out() {
        let frame = RawFrame::from_units(Axes::new(0.02, -0.01, 1.03), Axes::new(0.5, -1.5, 0.25));
        let mut imu = ReplaySensor::constant(frame);
        let offsets = calibrate(&mut imu, 200).unwrap();

        assert!((offsets.accel().z - 1.03).abs() < 1e-3);
        let bias = offsets.accel_bias();
        assert!((bias.x - 0.02).abs() < 1e-3);
        assert!((bias.y + 0.01).abs() < 1e-3);
        assert!((bias.z - 0.03).abs() < 1e-3);
        assert!((offsets.gyro().x - 0.5).abs() < 1e-2);
        assert!((offsets.gyro().y + 1.5).abs() < 1e-2);

        // Corrected reading of the same pose is exactly gravity.
        let a = imu.read_accel(offsets.accel_bias()).unwrap();
        assert!(close(a, REST_GRAVITY));
    }

    #[test]
    fn default_offsets_leave_readings_untouched() {
        let offsets = CalibrationOffsets::default();
        assert_eq!(offsets.accel_bias(), Axes::ZERO);
        assert_eq!(offsets.gyro(), Axes::ZERO);
        assert!(offsets.verify_at_rest().is_ok());
    }

    #[test]
    fn zero_samples_is_an_error() {
        let mut imu = ReplaySensor::constant(RawFrame::LEVEL_AT_REST);
        assert!(average(&mut imu, SensorBlock::Accel, 0).is_err());
        assert!(calibrate(&mut imu, 0).is_err());
    }

    #[test]
    fn unreachable_sensor_aborts() {
        let mut imu = ReplaySensor::new(Vec::new());
        let err = calibrate(&mut imu, 10).unwrap_err();
        assert!(format!("{:#}", err).contains("aborted at sample 0"));
    }

    #[test]
    fn single_glitch_is_retried() {
        let mut imu = ReplaySensor::constant(RawFrame::LEVEL_AT_REST);
        imu.fail_next(1);
        assert!(calibrate(&mut imu, 50).is_ok());
    }

    #[test]
    fn persistent_fault_is_not_retried_forever() {
        let mut imu = ReplaySensor::constant(RawFrame::LEVEL_AT_REST);
        imu.fail_next(2);
        assert!(calibrate(&mut imu, 50).is_err());
    }

    #[test]
    fn tag_not_flat_fails_rest_check() {
        let mut imu = ReplaySensor::constant(RawFrame::LEVEL_AT_REST);
        assert!(calibrate(&mut imu, 20).unwrap().verify_at_rest().is_ok());

        // All-zero registers: a sensor that acks but never samples.
        let mut imu = ReplaySensor::constant(RawFrame::default());
        let offsets = calibrate(&mut imu, 20).unwrap();
        assert!(offsets.verify_at_rest().is_err());

        // Resting on its side.
        let mut imu = ReplaySensor::constant(RawFrame::from_units(Axes::new(1.0, 0.0, 0.0), Axes::ZERO));
        let offsets = calibrate(&mut imu, 20).unwrap();
        assert!(offsets.verify_at_rest().is_err());

        let offsets = CalibrationOffsets::new(Axes::new(0.0, 0.0, f32::NAN), Axes::ZERO);
        assert!(offsets.verify_at_rest().is_err());
    }
}
