// Presence Tag — Sensor Interface
//
// The fusion core talks to the IMU only through `InertialSensor`.  A driver
// supplies raw 16-bit register triples; scaling and bias removal live here so
// every backend (hardware driver, host replay) converts units the same way.

use anyhow::anyhow;

use crate::config::*;
use crate::events::Axes;

/// Register block of a burst read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorBlock {
    Accel,
    Gyro,
}

impl SensorBlock {
    /// LSB per physical unit for the configured full-scale range.
    pub fn scale(self) -> f32 {
        match self {
            Self::Accel => ACCEL_SCALE_2G,
            Self::Gyro => GYRO_SCALE_250,
        }
    }
}

pub trait InertialSensor {
    /// One bus transaction returning the X/Y/Z registers of `block`.
    fn read_raw(&mut self, block: SensorBlock) -> anyhow::Result<[i16; 3]>;

    /// Read `block` in physical units with `bias` subtracted per axis.
    fn read_scaled(&mut self, block: SensorBlock, bias: Axes) -> anyhow::Result<Axes> {
        let raw = self.read_raw(block)?;
        let scale = block.scale();
        Ok(Axes::new(
            raw[0] as f32 / scale - bias.x,
            raw[1] as f32 / scale - bias.y,
            raw[2] as f32 / scale - bias.z,
        ))
    }

    /// Acceleration in g.
    fn read_accel(&mut self, bias: Axes) -> anyhow::Result<Axes> {
        self.read_scaled(SensorBlock::Accel, bias)
    }

    /// Angular rate in °/s.
    fn read_gyro(&mut self, bias: Axes) -> anyhow::Result<Axes> {
        self.read_scaled(SensorBlock::Gyro, bias)
    }
}

/// Run `read`; on failure hand the error to `on_retry` and try exactly once more.
pub fn retry_once<T>(
    mut read: impl FnMut() -> anyhow::Result<T>,
    on_retry: impl FnOnce(&anyhow::Error),
) -> anyhow::Result<T> {
    match read() {
        Ok(value) => Ok(value),
        Err(e) => {
            on_retry(&e);
            read()
        }
    }
}

/// Raw accel + gyro registers captured in one loop iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawFrame {
    pub accel: [i16; 3],
    pub gyro: [i16; 3],
}

impl RawFrame {
    /// Device at rest, flat, z-up: 1 g on Z, no rotation.
    pub const LEVEL_AT_REST: Self = Self {
        accel: [0, 0, ACCEL_SCALE_2G as i16],
        gyro: [0, 0, 0],
    };

    /// Build a frame from physical units (g, °/s), saturating at the register range.
    pub fn from_units(accel: Axes, gyro: Axes) -> Self {
        fn to_raw(v: Axes, scale: f32) -> [i16; 3] {
            [v.x, v.y, v.z].map(|c| (c * scale).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16)
        }
        Self {
            accel: to_raw(accel, ACCEL_SCALE_2G),
            gyro: to_raw(gyro, GYRO_SCALE_250),
        }
    }
}

/// Scripted sensor for host runs.  Serves `frames` in order (looping if
/// requested); a frame is consumed by its gyro read, which the pipeline always
/// issues after the accel read.
#[derive(Debug, Clone)]
pub struct ReplaySensor {
    frames: Vec<RawFrame>,
    cursor: usize,
    looping: bool,
    fail_next: usize,
    reads: u64,
}

impl ReplaySensor {
    pub fn new(frames: Vec<RawFrame>) -> Self {
        Self {
            frames,
            cursor: 0,
            looping: false,
            fail_next: 0,
            reads: 0,
        }
    }

    /// A sensor that returns `frame` forever.
    pub fn constant(frame: RawFrame) -> Self {
        Self::new(vec![frame]).looping()
    }

    pub fn looping(mut self) -> Self {
        self.looping = true;
        self
    }

    /// Make the next `count` transactions fail as if the bus timed out.
    pub fn fail_next(&mut self, count: usize) {
        self.fail_next = count;
    }

    /// Successful transactions served so far.
    pub fn reads(&self) -> u64 {
        self.reads
    }

    pub fn is_exhausted(&self) -> bool {
        !self.looping && self.cursor >= self.frames.len()
    }
}

impl InertialSensor for ReplaySensor {
    fn read_raw(&mut self, block: SensorBlock) -> anyhow::Result<[i16; 3]> {
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(anyhow!("replay: injected bus timeout"));
        }
        if self.frames.is_empty() || self.is_exhausted() {
            return Err(anyhow!("replay: no frames left"));
        }

        let frame = self.frames[self.cursor % self.frames.len()];
        self.reads += 1;
        Ok(match block {
            SensorBlock::Accel => frame.accel,
            SensorBlock::Gyro => {
                self.cursor += 1;
                if self.looping && self.cursor == self.frames.len() {
                    self.cursor = 0;
                }
                frame.gyro
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_with_per_sensor_constants() {
        let frame = RawFrame {
            accel: [16384, -8192, 0],
            gyro: [131, -262, 1310],
        };
        let mut imu = ReplaySensor::constant(frame);

        let a = imu.read_accel(Axes::ZERO).unwrap();
        assert_eq!(a, Axes::new(1.0, -0.5, 0.0));

        let g = imu.read_gyro(Axes::ZERO).unwrap();
        assert_eq!(g, Axes::new(1.0, -2.0, 10.0));
    }

    #[test]
    fn bias_is_subtracted_per_axis() {
        let mut imu = ReplaySensor::constant(RawFrame::LEVEL_AT_REST);
        let a = imu.read_accel(Axes::new(0.1, -0.1, 0.25)).unwrap();
        assert!((a.x + 0.1).abs() < 1e-6);
        assert!((a.y - 0.1).abs() < 1e-6);
        assert!((a.z - 0.75).abs() < 1e-6);
    }

    #[test]
    fn injected_failures_then_recovery() {
        let mut imu = ReplaySensor::constant(RawFrame::LEVEL_AT_REST);
        imu.fail_next(2);
        assert!(imu.read_raw(SensorBlock::Accel).is_err());
        assert!(imu.read_raw(SensorBlock::Accel).is_err());
        assert!(imu.read_raw(SensorBlock::Accel).is_ok());
        assert_eq!(imu.reads(), 1);
    }

    #[test]
    fn finite_script_runs_out() {
        let mut imu = ReplaySensor::new(vec![RawFrame::LEVEL_AT_REST]);
        assert!(imu.read_raw(SensorBlock::Accel).is_ok());
        assert!(imu.read_raw(SensorBlock::Gyro).is_ok());
        assert!(imu.is_exhausted());
        assert!(imu.read_raw(SensorBlock::Accel).is_err());
    }

    #[test]
    fn from_units_saturates() {
        let frame = RawFrame::from_units(Axes::new(0.0, 0.0, 5.0), Axes::new(300.0, 0.0, -1.0));
        assert_eq!(frame.accel[2], i16::MAX);
        assert_eq!(frame.gyro[0], i16::MAX);
        assert_eq!(frame.gyro[2], -131);
    }
}
