// Presence Tag — Motion Detection Core
//
// Hardware-independent half of the tag firmware: sensor abstraction, fusion
// pipeline, mailbox and notification boundary.  Builds on the host so the
// numerics can be tested without a board.

pub mod config;
pub mod events;
pub mod fusion;
#[cfg(not(target_os = "espidf"))]
pub mod host_log;
pub mod mailbox;
pub mod notify;
pub mod proximity;
pub mod sensor;

pub use config::FusionConfig;
pub use events::{Axes, MotionState, SensorSample};
pub use fusion::calibration::{calibrate, CalibrationOffsets};
pub use fusion::{FusionContext, FusionOutput, FusionStats};
pub use mailbox::MotionMailbox;
pub use sensor::InertialSensor;
