// Presence Tag — Sensor Samples & Motion Events

use core::ops::Sub;

// ---------------------------------------------------------------------------
// Three-axis vector (g for acceleration, °/s for angular rate)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Axes {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Axes {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Sub for Axes {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

// ---------------------------------------------------------------------------
// Sensor Data (6-axis IMU reading, already scaled and bias-corrected)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorSample {
    pub accel: Axes,
    pub gyro: Axes,
}

impl SensorSample {
    pub fn is_finite(&self) -> bool {
        self.accel.is_finite() && self.gyro.is_finite()
    }
}

// ---------------------------------------------------------------------------
// Motion Classification
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionState {
    #[default]
    NotMoving,
    Moving,
}

impl MotionState {
    pub fn is_moving(self) -> bool {
        self == Self::Moving
    }

    /// Mailbox encoding: `0` = not moving, `1` = moving.
    pub fn as_flag(self) -> u8 {
        match self {
            Self::NotMoving => 0,
            Self::Moving => 1,
        }
    }

    pub fn from_flag(flag: u8) -> Option<Self> {
        match flag {
            0 => Some(Self::NotMoving),
            1 => Some(Self::Moving),
            _ => None,
        }
    }

    /// Value written to the wireless notify characteristic (ASCII digit).
    pub fn notify_payload(self) -> [u8; 1] {
        match self {
            Self::NotMoving => [b'0'],
            Self::Moving => [b'1'],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NotMoving => "still",
            Self::Moving => "moving",
        }
    }
}

impl From<bool> for MotionState {
    fn from(moving: bool) -> Self {
        if moving {
            Self::Moving
        } else {
            Self::NotMoving
        }
    }
}

/// Parse a notification as received by the tracker: the first `'0'` or `'1'`
/// byte decides, anything else in the payload is ignored.
pub fn decode_notify_payload(payload: &[u8]) -> Option<MotionState> {
    payload.iter().find_map(|b| match b {
        b'0' => Some(MotionState::NotMoving),
        b'1' => Some(MotionState::Moving),
        _ => None,
    })
}
