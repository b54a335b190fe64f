//! Capability contracts for the hardware the behavior kernel drives, and the
//! stand-in implementations used when no robot is attached.

pub mod actuator;
pub mod detector;
pub mod player;
pub mod types;

pub use actuator::{Actuator, LoggingActuator};
pub use detector::{Detector, NullDetector, Scripted, ScriptedDetector};
pub use player::{CommandPlayer, SilentPlayer, SoundPlayer};
pub use types::{CueId, HeadPose, MotionCommand, Point3, Pose, PresenceSample, StopSignal};
