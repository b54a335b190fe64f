use std::sync::Mutex;
use tracing::{debug, info};

use super::types::{MotionCommand, Pose};
use crate::kernel::error::ActuatorError;

/// Head and antenna motors.
///
/// Only the controller loop calls into an actuator. `hold` and `command` are
/// fire-and-forget: they must hand the motion off and return, not wait for it
/// to finish.
pub trait Actuator: Send + Sync {
    fn current_pose(&self) -> Result<Pose, ActuatorError>;
    fn hold(&self, pose: Pose) -> Result<(), ActuatorError>;
    fn command(&self, motion: MotionCommand) -> Result<(), ActuatorError>;

    /// Lifecycle hooks for the surrounding application. The controller never calls these.
    fn enable(&self) -> Result<(), ActuatorError> {
        Ok(())
    }

    fn disable(&self) -> Result<(), ActuatorError> {
        Ok(())
    }
}

/// Antenna positions (left, right) a glance wiggle passes through, ending at neutral.
pub const WIGGLE_SEQUENCE: [[f64; 2]; 3] = [[0.5, -0.5], [-0.5, 0.5], [0.0, 0.0]];

/// Stand-in for a robot connection: tracks a simulated pose and logs every call.
#[derive(Debug, Default)]
pub struct LoggingActuator {
    pose: Mutex<Pose>,
}

impl LoggingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_pose<T>(&self, f: impl FnOnce(&mut Pose) -> T) -> Result<T, ActuatorError> {
        let mut pose = self
            .pose
            .lock()
            .map_err(|_| ActuatorError::Fault("pose lock poisoned".to_string()))?;
        Ok(f(&mut pose))
    }
}

impl Actuator for LoggingActuator {
    fn current_pose(&self) -> Result<Pose, ActuatorError> {
        self.with_pose(|pose| *pose)
    }

    fn hold(&self, pose: Pose) -> Result<(), ActuatorError> {
        info!("[Motion] Holding pose {:?}", pose);
        self.with_pose(|current| *current = pose)
    }

    fn command(&self, motion: MotionCommand) -> Result<(), ActuatorError> {
        info!("[Motion] {:?}", motion);
        self.with_pose(|pose| match motion {
            MotionCommand::Glance {
                target,
                wiggle_antennas,
                ..
            } => {
                // Aim only, no kinematics: yaw/pitch toward the target.
                pose.head.yaw = target.y.atan2(target.x);
                pose.head.pitch = -target.z.atan2(target.x);
                if wiggle_antennas {
                    for step in WIGGLE_SEQUENCE {
                        debug!("[Motion] Antennas -> {:?}", step);
                        pose.antennas = step;
                    }
                }
            }
            MotionCommand::SetAntennas { left, right } => {
                pose.antennas = [left, right];
            }
        })
    }

    fn enable(&self) -> Result<(), ActuatorError> {
        info!("[Motion] Motors enabled");
        Ok(())
    }

    fn disable(&self) -> Result<(), ActuatorError> {
        info!("[Motion] Motors disabled");
        Ok(())
    }
}
