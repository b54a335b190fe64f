#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use elf::devices::{Actuator, CueId, Detector, MotionCommand, Pose, PresenceSample, SoundPlayer, StopSignal};
use elf::kernel::error::{ActuatorError, CueError, SensorError};
use elf::{BehaviorConfig, DelayRange};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CurrentPose,
    Hold(Pose),
    Command(MotionCommand),
}

#[derive(Default)]
pub struct RecordingActuator {
    pub calls: Mutex<Vec<Call>>,
    pub pose: Mutex<Pose>,
    pub fail_pose: AtomicBool,
    pub fail_commands: AtomicBool,
}

impl RecordingActuator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn holds(&self) -> usize {
        self.calls().iter().filter(|c| matches!(c, Call::Hold(_))).count()
    }

    pub fn glances(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Command(MotionCommand::Glance { .. })))
            .count()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

impl Actuator for RecordingActuator {
    fn current_pose(&self) -> Result<Pose, ActuatorError> {
        self.calls.lock().unwrap().push(Call::CurrentPose);
        if self.fail_pose.load(Ordering::SeqCst) {
            return Err(ActuatorError::Disconnected);
        }
        Ok(*self.pose.lock().unwrap())
    }

    fn hold(&self, pose: Pose) -> Result<(), ActuatorError> {
        self.calls.lock().unwrap().push(Call::Hold(pose));
        Ok(())
    }

    fn command(&self, motion: MotionCommand) -> Result<(), ActuatorError> {
        self.calls.lock().unwrap().push(Call::Command(motion));
        if self.fail_commands.load(Ordering::SeqCst) {
            return Err(ActuatorError::Fault("stalled".to_string()));
        }
        Ok(())
    }
}

/// Sleeps for `length` per cue (in small chunks, honouring stop) and tracks
/// how many renders overlap.
pub struct CountingPlayer {
    pub length: Duration,
    pub active: AtomicUsize,
    pub max_active: AtomicUsize,
    pub rendered: Mutex<Vec<CueId>>,
    pub stopped_early: AtomicUsize,
    pub fail: AtomicBool,
}

impl CountingPlayer {
    pub fn new(length: Duration) -> Arc<Self> {
        Arc::new(Self {
            length,
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            rendered: Mutex::new(Vec::new()),
            stopped_early: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        })
    }

    pub fn rendered(&self) -> Vec<CueId> {
        self.rendered.lock().unwrap().clone()
    }

    pub fn count(&self, cue: CueId) -> usize {
        self.rendered().into_iter().filter(|c| *c == cue).count()
    }
}

struct Active<'a>(&'a AtomicUsize);

impl Drop for Active<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl SoundPlayer for CountingPlayer {
    fn render(&self, cue: CueId, stop: &StopSignal) -> Result<(), CueError> {
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        let _active = Active(&self.active);
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        self.rendered.lock().unwrap().push(cue);

        if self.fail.load(Ordering::SeqCst) {
            return Err(CueError::Fault("speaker unplugged".to_string()));
        }

        let started = Instant::now();
        while started.elapsed() < self.length {
            if stop.is_stopped() {
                self.stopped_early.fetch_add(1, Ordering::SeqCst);
                return Ok(());
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        Ok(())
    }
}

/// Detector whose answer is flipped by the test.
#[derive(Default)]
pub struct FlagDetector {
    pub present: AtomicBool,
    pub fail: AtomicBool,
    pub samples: AtomicUsize,
    pub no_sensor: bool,
}

impl FlagDetector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, present: bool) {
        self.present.store(present, Ordering::SeqCst);
    }
}

impl Detector for FlagDetector {
    fn sample(&self) -> Result<PresenceSample, SensorError> {
        self.samples.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(SensorError::Fault("lens cap on".to_string()));
        }
        Ok(PresenceSample {
            present: self.present.load(Ordering::SeqCst),
        })
    }

    fn has_sensor(&self) -> bool {
        !self.no_sensor
    }
}

/// Detector that never returns.
pub struct HungDetector;

impl Detector for HungDetector {
    fn sample(&self) -> Result<PresenceSample, SensorError> {
        std::thread::sleep(Duration::from_millis(1500));
        Ok(PresenceSample::ABSENT)
    }
}

/// Fast, deterministic settings for controller tests.
pub fn test_config() -> BehaviorConfig {
    BehaviorConfig {
        tick_ms: 100,
        idle_delay: DelayRange::fixed(100),
        ambient_delay: DelayRange::fixed(10_000),
        poll_ms_with_sensor: 10,
        poll_ms_without_sensor: 50,
        preempt_wait_ms: 200,
        monitor_join_ms: 500,
        cue_release_ms: 500,
        startle_gesture_ms: 0,
        release_hold_off_ms: 0,
        seed: Some(42),
    }
}
