use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One reading from the face detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceSample {
    pub present: bool,
}

impl PresenceSample {
    pub const PRESENT: Self = Self { present: true };
    pub const ABSENT: Self = Self { present: false };
}

/// The short audio renderings the robot can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CueId {
    /// Idle jingle, played while nobody is watching.
    Ambient,
    /// Alert played the moment a face shows up.
    Startle,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HeadPose {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

/// Full commanded pose: head plus the two antenna joints (left, right).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub head: HeadPose,
    pub antennas: [f64; 2],
}

/// A point in the robot's world frame, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MotionCommand {
    /// Turn the head toward a point, optionally wiggling the antennas afterwards.
    Glance {
        target: Point3,
        duration: Duration,
        wiggle_antennas: bool,
    },
    /// Snap the antennas to fixed joint positions (left, right).
    SetAntennas { left: f64, right: f64 },
}

/// Cooperative stop flag handed to a render call.
///
/// Players check it between audio chunks; setting it never interrupts a chunk
/// that is already being written.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
