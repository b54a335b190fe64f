use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::error::ConfigError;

/// Inclusive range of milliseconds a delay is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// Degenerate range, always yields `ms`.
    pub const fn fixed(ms: u64) -> Self {
        Self::new(ms, ms)
    }

    pub fn min(&self) -> Duration {
        Duration::from_millis(self.min_ms)
    }

    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }
}

/// Tuning for the behavior controller. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    pub tick_ms: u64,
    pub idle_delay: DelayRange,
    pub ambient_delay: DelayRange,
    /// Poll period when a real sensor backs the detector (~20 Hz).
    pub poll_ms_with_sensor: u64,
    /// Poll period in mock/degraded mode (~2 Hz).
    pub poll_ms_without_sensor: u64,
    /// How long a preemptive cue waits for the audio channel.
    pub preempt_wait_ms: u64,
    /// Bound on joining the presence monitor during shutdown.
    pub monitor_join_ms: u64,
    /// Bound on waiting for an in-flight cue to stop during shutdown.
    pub cue_release_ms: u64,
    /// Length of the startle micro-gesture before the freeze lands.
    pub startle_gesture_ms: u64,
    /// Presence must be gone this long before the robot unfreezes. 0 disables.
    pub release_hold_off_ms: u64,
    /// Fixed RNG seed for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            idle_delay: DelayRange::new(3_000, 6_000),
            ambient_delay: DelayRange::new(10_000, 15_000),
            poll_ms_with_sensor: 50,
            poll_ms_without_sensor: 500,
            preempt_wait_ms: 500,
            monitor_join_ms: 2_000,
            cue_release_ms: 1_000,
            startle_gesture_ms: 200,
            release_hold_off_ms: 0,
            seed: None,
        }
    }
}

/// Reads and parses a JSON config file. Validation is left to the caller.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

impl BehaviorConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = load_json(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_ms == 0 {
            return Err(ConfigError::Invalid("tick_ms must be non-zero".to_string()));
        }
        if self.poll_ms_with_sensor == 0 || self.poll_ms_without_sensor == 0 {
            return Err(ConfigError::Invalid("poll periods must be non-zero".to_string()));
        }
        for (name, range) in [("idle_delay", self.idle_delay), ("ambient_delay", self.ambient_delay)] {
            if range.min_ms > range.max_ms {
                return Err(ConfigError::Invalid(format!(
                    "{name}: min_ms {} exceeds max_ms {}",
                    range.min_ms, range.max_ms
                )));
            }
        }
        Ok(())
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn poll_period(&self, has_sensor: bool) -> Duration {
        if has_sensor {
            Duration::from_millis(self.poll_ms_with_sensor)
        } else {
            Duration::from_millis(self.poll_ms_without_sensor)
        }
    }

    pub fn preempt_wait(&self) -> Duration {
        Duration::from_millis(self.preempt_wait_ms)
    }

    pub fn monitor_join(&self) -> Duration {
        Duration::from_millis(self.monitor_join_ms)
    }

    pub fn cue_release(&self) -> Duration {
        Duration::from_millis(self.cue_release_ms)
    }

    pub fn startle_gesture(&self) -> Duration {
        Duration::from_millis(self.startle_gesture_ms)
    }

    pub fn release_hold_off(&self) -> Duration {
        Duration::from_millis(self.release_hold_off_ms)
    }
}
