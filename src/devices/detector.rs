use std::sync::Mutex;

use super::types::PresenceSample;
use crate::kernel::error::SensorError;

/// Face-presence source polled by the presence monitor.
///
/// `sample` is called from a blocking worker, never from the controller loop.
/// It should return within one poll interval.
pub trait Detector: Send + Sync {
    fn sample(&self) -> Result<PresenceSample, SensorError>;

    /// `false` when no real sensor backs this detector. The monitor then
    /// polls at the slow fallback cadence.
    fn has_sensor(&self) -> bool {
        true
    }
}

/// Used when no camera is configured. Never sees anyone.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDetector;

impl Detector for NullDetector {
    fn sample(&self) -> Result<PresenceSample, SensorError> {
        Ok(PresenceSample::ABSENT)
    }

    fn has_sensor(&self) -> bool {
        false
    }
}

/// One scripted reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scripted {
    Present,
    Absent,
    Fault,
}

/// Replays a fixed sequence of readings, then keeps repeating the last one.
pub struct ScriptedDetector {
    script: Vec<Scripted>,
    cursor: Mutex<usize>,
}

impl ScriptedDetector {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script,
            cursor: Mutex::new(0),
        }
    }

    /// Builds a script from a compact string such as `"..FFTT.."`:
    /// `T`/`1` present, `F`/`0`/`.` absent, `!` fault. Other characters are skipped.
    pub fn parse(pattern: &str) -> Self {
        let script = pattern
            .chars()
            .filter_map(|c| match c {
                'T' | 't' | '1' => Some(Scripted::Present),
                'F' | 'f' | '0' | '.' => Some(Scripted::Absent),
                '!' => Some(Scripted::Fault),
                _ => None,
            })
            .collect();
        Self::new(script)
    }
}

impl Detector for ScriptedDetector {
    fn sample(&self) -> Result<PresenceSample, SensorError> {
        let step = {
            let mut cursor = self
                .cursor
                .lock()
                .map_err(|_| SensorError::Fault("script cursor poisoned".to_string()))?;
            let step = self
                .script
                .get(*cursor)
                .or_else(|| self.script.last())
                .copied();
            *cursor += 1;
            step
        };

        match step {
            Some(Scripted::Present) => Ok(PresenceSample::PRESENT),
            Some(Scripted::Absent) => Ok(PresenceSample::ABSENT),
            Some(Scripted::Fault) => Err(SensorError::Fault("scripted fault".to_string())),
            None => Err(SensorError::NoFrame),
        }
    }
}
