use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Detector call failed. Always downgraded to "not present" by the monitor.
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("no frame available")]
    NoFrame,
    #[error("sensor timed out after {0:?}")]
    Timeout(Duration),
    #[error("sensor disconnected")]
    Disconnected,
    #[error("sensor fault: {0}")]
    Fault(String),
}

/// Pose read or motion write failed.
#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("actuator disconnected")]
    Disconnected,
    #[error("actuator call timed out after {0:?}")]
    Timeout(Duration),
    #[error("actuator rejected command: {0}")]
    Rejected(String),
    #[error("actuator fault: {0}")]
    Fault(String),
}

/// Rendering a cue failed. The cue lock is released regardless.
#[derive(Debug, Error)]
pub enum CueError {
    #[error("no audio output available")]
    Unavailable,
    #[error("player i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("player exited with {0}")]
    PlayerExit(String),
    #[error("render fault: {0}")]
    Fault(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// A subsystem did not quiesce within its shutdown bound. Shutdown proceeds anyway.
#[derive(Debug, Error)]
#[error("{subsystem} did not stop within {bound:?}")]
pub struct ShutdownTimeout {
    pub subsystem: &'static str,
    pub bound: Duration,
}
