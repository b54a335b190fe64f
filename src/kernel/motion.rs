use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::config::BehaviorConfig;
use crate::devices::{Actuator, MotionCommand, Point3, Pose};

/// Antenna spread used for the startle reaction (left, right).
pub const STARTLE_ANTENNAS: (f64, f64) = (0.6, -0.6);

/// Chance that an idle glance also wiggles the antennas.
const WIGGLE_CHANCE: f64 = 0.4;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MotionGateState {
    pub frozen: bool,
    /// Captured on the transition into frozen; `None` if the pose read failed.
    pub held_pose: Option<Pose>,
}

/// Routes every outgoing motion command through a frozen/unfrozen gate.
///
/// Owned by the controller loop; never called from anywhere else.
pub struct MotionGate {
    actuator: Arc<dyn Actuator>,
    state: MotionGateState,
    startle_gesture: Duration,
}

impl MotionGate {
    pub fn new(actuator: Arc<dyn Actuator>, config: &BehaviorConfig) -> Self {
        Self {
            actuator,
            state: MotionGateState::default(),
            startle_gesture: config.startle_gesture(),
        }
    }

    /// Holds the current pose. No-op if already frozen.
    ///
    /// A failed pose read still freezes the gate; the pose is not re-read
    /// later and no hold command is sent.
    pub fn freeze(&mut self) {
        if self.state.frozen {
            return;
        }
        self.state.frozen = true;

        match self.actuator.current_pose() {
            Ok(pose) => {
                self.state.held_pose = Some(pose);
                if let Err(e) = self.actuator.hold(pose) {
                    warn!("[Motion] Hold command failed: {}", e);
                }
                info!("[Motion] Frozen");
            }
            Err(e) => warn!("[Motion] Pose read failed, frozen without hold: {}", e),
        }
    }

    pub fn unfreeze(&mut self) {
        if !self.state.frozen {
            return;
        }
        self.state = MotionGateState::default();
        info!("[Motion] Unfrozen");
    }

    /// Forwards `command` unless frozen. Returns whether it reached the actuator.
    pub fn issue(&mut self, command: MotionCommand) -> bool {
        if self.state.frozen {
            debug!("[Motion] Frozen, dropping {:?}", command);
            return false;
        }
        match self.actuator.command(command) {
            Ok(()) => true,
            Err(e) => {
                warn!("[Motion] Command failed: {}", e);
                false
            }
        }
    }

    /// Antenna pop, a short pause so it reads as a reaction, then [`freeze`](Self::freeze).
    /// No-op if already frozen.
    pub async fn express_startle(&mut self) {
        if self.state.frozen {
            return;
        }
        let (left, right) = STARTLE_ANTENNAS;
        self.issue(MotionCommand::SetAntennas { left, right });
        tokio::time::sleep(self.startle_gesture).await;
        self.freeze();
    }

    pub fn is_frozen(&self) -> bool {
        self.state.frozen
    }

    pub fn state(&self) -> &MotionGateState {
        &self.state
    }
}

/// Random look-around used while idling.
pub fn draw_glance(rng: &mut impl Rng) -> MotionCommand {
    MotionCommand::Glance {
        target: Point3 {
            x: rng.gen_range(0.3..=0.5),
            y: rng.gen_range(-0.4..=0.4),
            z: rng.gen_range(-0.1..=0.3),
        },
        duration: Duration::from_secs_f64(rng.gen_range(1.0..=2.5)),
        wiggle_antennas: rng.gen_bool(WIGGLE_CHANCE),
    }
}
