use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::BehaviorConfig;
use super::error::ShutdownTimeout;
use crate::devices::Detector;

/// Last committed presence sample.
///
/// Single writer (the monitor's poll task), any number of readers. Reads never
/// block the writer.
#[derive(Debug, Default)]
pub struct PresenceState {
    detected: AtomicBool,
}

impl PresenceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn detected(&self) -> bool {
        self.detected.load(Ordering::Acquire)
    }

    fn commit(&self, detected: bool) -> bool {
        self.detected.swap(detected, Ordering::AcqRel)
    }
}

/// Change in presence between two consecutive controller ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionEdge {
    pub was_present: bool,
    pub is_present: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Nobody → somebody.
    Rising,
    /// Still watched.
    SustainedPresent,
    /// Somebody → nobody.
    Falling,
    /// Still alone.
    SustainedAbsent,
}

impl DetectionEdge {
    pub fn new(was_present: bool, is_present: bool) -> Self {
        Self {
            was_present,
            is_present,
        }
    }

    pub fn kind(&self) -> EdgeKind {
        match (self.was_present, self.is_present) {
            (false, true) => EdgeKind::Rising,
            (true, true) => EdgeKind::SustainedPresent,
            (true, false) => EdgeKind::Falling,
            (false, false) => EdgeKind::SustainedAbsent,
        }
    }
}

/// Polls a [`Detector`] on a background task and publishes the latest answer.
pub struct PresenceMonitor {
    detector: Arc<dyn Detector>,
    state: Arc<PresenceState>,
    poll: Duration,
    join_bound: Duration,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PresenceMonitor {
    /// `shutdown` is the application-wide stop signal; the monitor listens on a
    /// child of it so it can also be stopped on its own.
    pub fn new(detector: Arc<dyn Detector>, config: &BehaviorConfig, shutdown: &CancellationToken) -> Self {
        let poll = config.poll_period(detector.has_sensor());
        Self {
            detector,
            state: Arc::new(PresenceState::new()),
            poll,
            join_bound: config.monitor_join(),
            cancel: shutdown.child_token(),
            task: None,
        }
    }

    /// Spawns the poll task. Calling it again does nothing; a stopped monitor
    /// stays stopped.
    pub fn start(&mut self) {
        if self.task.is_some() {
            return;
        }
        if self.detector.has_sensor() {
            info!("[Presence] Polling detector every {:?}", self.poll);
        } else {
            info!("[Presence] No sensor configured, polling every {:?} (always absent)", self.poll);
        }

        let detector = Arc::clone(&self.detector);
        let state = Arc::clone(&self.state);
        let cancel = self.cancel.clone();
        let poll = self.poll;
        self.task = Some(tokio::spawn(poll_loop(detector, state, poll, cancel)));
    }

    /// Cancels the poll task and waits for it, at most `monitor_join_ms`.
    pub async fn stop(&mut self) -> Result<(), ShutdownTimeout> {
        self.cancel.cancel();
        let Some(mut task) = self.task.take() else {
            return Ok(());
        };

        match tokio::time::timeout(self.join_bound, &mut task).await {
            Ok(_) => {
                info!("[Presence] Monitor stopped");
                Ok(())
            }
            Err(_) => {
                task.abort();
                let err = ShutdownTimeout {
                    subsystem: "presence monitor",
                    bound: self.join_bound,
                };
                error!("[Presence] {}", err);
                Err(err)
            }
        }
    }

    pub fn is_present(&self) -> bool {
        self.state.detected()
    }

    pub fn state(&self) -> Arc<PresenceState> {
        Arc::clone(&self.state)
    }

    pub fn poll_period(&self) -> Duration {
        self.poll
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

async fn poll_loop(
    detector: Arc<dyn Detector>,
    state: Arc<PresenceState>,
    poll: Duration,
    cancel: CancellationToken,
) {
    let mut cadence = interval(poll);
    cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut health = SensorHealth::default();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = cadence.tick() => {}
        }

        // The sensor call may block; keep it off the async workers and never
        // let it hold up cancellation.
        let worker = Arc::clone(&detector);
        let sample = tokio::select! {
            _ = cancel.cancelled() => break,
            res = tokio::task::spawn_blocking(move || worker.sample()) => res,
        };

        let present = match sample {
            Ok(Ok(sample)) => {
                if health.recovered() {
                    info!("[Presence] Sensor recovered");
                }
                sample.present
            }
            Ok(Err(e)) => {
                health.fault(format_args!("Sensor fault, treating as absent: {}", e));
                false
            }
            Err(e) => {
                health.fault(format_args!("Detector worker failed, treating as absent: {}", e));
                false
            }
        };

        if state.commit(present) != present {
            debug!("[Presence] detected = {}", present);
        }
    }
}

/// Tracks consecutive sensor faults so a dead sensor warns once, not every poll.
#[derive(Debug, Default)]
struct SensorHealth {
    consecutive_faults: u64,
}

impl SensorHealth {
    /// Records a fault. Returns whether this is the first of a run.
    fn fault(&mut self, detail: std::fmt::Arguments<'_>) -> bool {
        self.consecutive_faults += 1;
        let first = self.consecutive_faults == 1;
        if first {
            warn!("[Presence] {}", detail);
        } else {
            debug!("[Presence] {} (x{})", detail, self.consecutive_faults);
        }
        first
    }

    /// Records a good sample. Returns whether it ended a run of faults.
    fn recovered(&mut self) -> bool {
        std::mem::take(&mut self.consecutive_faults) > 0
    }
}
