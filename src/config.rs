// Presence Tag — Hardware & System Configuration
// Target: ESP32-WROOM-32 tag node with an MPU-6500/9250 on I2C

use anyhow::bail;

// ---------------------------------------------------------------------------
// GPIO Pin Definitions
// ---------------------------------------------------------------------------
pub const PIN_I2C_SDA: i32 = 21;    // Default ESP32 I2C data line
pub const PIN_I2C_SCL: i32 = 22;    // Default ESP32 I2C clock line
pub const PIN_STATUS_LED: i32 = 2;  // On-board LED, lit while moving

// ---------------------------------------------------------------------------
// I2C Bus
// ---------------------------------------------------------------------------
pub const I2C_ADDR_IMU: u8 = 0x68;
pub const I2C_BAUDRATE_KHZ: u32 = 400;
pub const I2C_TIMEOUT_TICKS: u32 = 1000; // FreeRTOS ticks

// ---------------------------------------------------------------------------
// Task Stack Sizes (bytes)
// ---------------------------------------------------------------------------
pub const STACK_FUSION: usize = 6144;
pub const STACK_NOTIFY: usize = 4096;
pub const STACK_STATUS: usize = 3072;

// ---------------------------------------------------------------------------
// Timing (milliseconds)
// ---------------------------------------------------------------------------
pub const FUSION_PERIOD_MS: u64 = 5;           // 200 Hz fusion loop
pub const NOTIFY_POLL_INTERVAL_MS: u64 = 50;
pub const STATUS_POLL_INTERVAL_MS: u64 = 100;
pub const DIAGNOSTIC_LOG_EVERY_FRAMES: u64 = 200; // ~1 s at 200 Hz

// ---------------------------------------------------------------------------
// IMU Sensor Scale Factors
// ---------------------------------------------------------------------------
pub const ACCEL_SCALE_2G: f32 = 16384.0;  // LSB/g  at ±2 g
pub const GYRO_SCALE_250: f32 = 131.0;    // LSB/°/s at ±250 °/s

// ---------------------------------------------------------------------------
// Calibration
// ---------------------------------------------------------------------------
pub const CALIBRATION_SAMPLES: usize = 1000;
pub const CALIBRATION_YIELD_EVERY: usize = 100; // let other tasks run mid-burst
pub const CALIBRATION_REST_TOLERANCE_G: f32 = 0.25; // |mean accel - (0,0,1)| at rest

// ---------------------------------------------------------------------------
// Fusion & Motion Detection defaults
// ---------------------------------------------------------------------------
pub const COMPLEMENTARY_ALPHA: f32 = 0.98;
pub const MOTION_BUFFER_CAPACITY: usize = 32;
pub const EXIT_MOVING_THRESHOLD: f32 = 0.05; // g

#[cfg(not(feature = "high-sensitivity"))]
pub const ENTER_MOVING_THRESHOLD: f32 = 0.5; // g
#[cfg(feature = "high-sensitivity")]
pub const ENTER_MOVING_THRESHOLD: f32 = 0.25; // g

/// Longest gap the gyro integration will accept as a single step (seconds).
pub const MAX_DT_S: f32 = 0.1;

// ---------------------------------------------------------------------------
// Tracker proximity model
// ---------------------------------------------------------------------------
pub const RSSI_SMOOTHING_ALPHA: f32 = 0.2;
pub const TX_POWER_DBM: f32 = -59.0;      // measured RSSI at 1 m
pub const PATH_LOSS_EXPONENT: f32 = 2.5;

/// Run-time tunables of the fusion pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct FusionConfig {
    /// Gyro weight of the complementary filter; the accelerometer gets `1 - alpha`.
    pub alpha: f32,
    /// Moving average (g) at or above which `NotMoving` becomes `Moving`.
    pub enter_threshold: f32,
    /// Moving average (g) at or below which `Moving` becomes `NotMoving`.
    pub exit_threshold: f32,
    pub buffer_capacity: usize,
    /// Step used when the measured `dt` is unusable (zero, negative, NaN).
    pub nominal_dt: f32,
    pub max_dt: f32,
    pub calibration_samples: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            alpha: COMPLEMENTARY_ALPHA,
            enter_threshold: ENTER_MOVING_THRESHOLD,
            exit_threshold: EXIT_MOVING_THRESHOLD,
            buffer_capacity: MOTION_BUFFER_CAPACITY,
            nominal_dt: FUSION_PERIOD_MS as f32 / 1000.0,
            max_dt: MAX_DT_S,
            calibration_samples: CALIBRATION_SAMPLES,
        }
    }
}

impl FusionConfig {
    /// Reject combinations the pipeline cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            bail!("complementary alpha must be in (0, 1], got {}", self.alpha);
        }
        if !(self.exit_threshold.is_finite() && self.enter_threshold.is_finite()) {
            bail!("motion thresholds must be finite");
        }
        if self.exit_threshold >= self.enter_threshold {
            bail!(
                "exit threshold ({}) must be below enter threshold ({})",
                self.exit_threshold,
                self.enter_threshold
            );
        }
        if self.buffer_capacity == 0 {
            bail!("motion buffer capacity must be non-zero");
        }
        if !(self.nominal_dt > 0.0 && self.nominal_dt <= self.max_dt) {
            bail!(
                "nominal dt ({}) must be positive and no larger than max dt ({})",
                self.nominal_dt,
                self.max_dt
            );
        }
        if self.calibration_samples == 0 {
            bail!("calibration needs at least one sample");
        }
        Ok(())
    }
}
