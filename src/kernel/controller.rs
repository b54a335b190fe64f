use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::config::BehaviorConfig;
use super::cue::{ExclusiveCue, TriggerMode};
use super::error::ConfigError;
use super::motion::{draw_glance, MotionGate, MotionGateState};
use super::presence::{DetectionEdge, EdgeKind, PresenceMonitor};
use super::timers::{seeded_rng, BehaviorTimers, Tick};
use crate::devices::{Actuator, CueId, Detector, SoundPlayer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BehaviorState {
    /// Nobody watching: idle glances and ambient jingles allowed.
    #[default]
    Alive,
    /// Watched: motion suppressed, startle cue fired on entry.
    Frozen,
}

/// What one tick did, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Startle,
    StartleCue { accepted: bool },
    /// Idempotent re-freeze while presence persists.
    HoldFreeze,
    Unfreeze,
    IdleMove { delivered: bool },
    AmbientCue { accepted: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub tick: Tick,
    pub edge: EdgeKind,
    pub state: BehaviorState,
    pub effects: Vec<Effect>,
}

impl TickReport {
    pub fn idle_moves(&self) -> usize {
        self.effects
            .iter()
            .filter(|e| matches!(e, Effect::IdleMove { .. }))
            .count()
    }
}

/// The presence-reactive loop: freezes and startles when a face appears,
/// idles while nobody is watching.
///
/// Only this loop mutates the FSM, the timers and the motion gate, so
/// transitions are ordered by tick.
pub struct BehaviorController {
    config: BehaviorConfig,
    presence: PresenceMonitor,
    cue: ExclusiveCue,
    motion: MotionGate,
    timers: Option<BehaviorTimers>,
    rng: SmallRng,
    state: BehaviorState,
    was_present: bool,
    last_seen: Option<Instant>,
    tick: Tick,
    shutdown: CancellationToken,
    status: watch::Sender<BehaviorState>,
}

impl BehaviorController {
    pub fn new(
        config: BehaviorConfig,
        detector: Arc<dyn Detector>,
        actuator: Arc<dyn Actuator>,
        player: Arc<dyn SoundPlayer>,
        shutdown: CancellationToken,
    ) -> Self {
        let presence = PresenceMonitor::new(detector, &config, &shutdown);
        let cue = ExclusiveCue::new(player, &config);
        let motion = MotionGate::new(actuator, &config);
        let rng = seeded_rng(config.seed);
        let (status, _) = watch::channel(BehaviorState::Alive);

        Self {
            config,
            presence,
            cue,
            motion,
            timers: None,
            rng,
            state: BehaviorState::Alive,
            was_present: false,
            last_seen: None,
            tick: Tick::new(),
            shutdown,
            status,
        }
    }

    /// Validates `config`, then spawns the monitor and the controller loop.
    /// Must be called from within a tokio runtime.
    pub fn start(
        config: BehaviorConfig,
        detector: Arc<dyn Detector>,
        actuator: Arc<dyn Actuator>,
        player: Arc<dyn SoundPlayer>,
    ) -> Result<ControllerHandle, ConfigError> {
        config.validate()?;
        let shutdown = CancellationToken::new();
        let controller = Self::new(config, detector, actuator, player, shutdown.clone());
        let status = controller.status.subscribe();
        let task = tokio::spawn(controller.run());

        Ok(ControllerHandle {
            shutdown,
            task,
            status,
        })
    }

    /// One controller tick against a presence sample taken at `now`.
    ///
    /// Freezing takes precedence: on a tick where presence is observed, no
    /// idle motion or ambient cue is scheduled.
    pub async fn tick_step(&mut self, is_detected: bool, now: Instant) -> TickReport {
        self.tick = self.tick.next();
        let is_present = self.effective_presence(is_detected, now);
        let edge = DetectionEdge::new(self.was_present, is_present);
        self.was_present = is_present;

        let config = &self.config;
        let rng = &mut self.rng;
        let timers = self
            .timers
            .get_or_insert_with(|| BehaviorTimers::new(now, config, rng));

        let mut effects = Vec::new();
        match edge.kind() {
            EdgeKind::Rising => {
                info!("[Behavior] Face detected at tick {}, freezing", self.tick.frame);
                self.motion.express_startle().await;
                effects.push(Effect::Startle);
                let accepted = self.cue.trigger(CueId::Startle, TriggerMode::Preemptive).await;
                effects.push(Effect::StartleCue { accepted });
                self.set_state(BehaviorState::Frozen);
            }
            EdgeKind::SustainedPresent => {
                self.motion.freeze();
                effects.push(Effect::HoldFreeze);
            }
            EdgeKind::Falling => {
                info!("[Behavior] Face gone at tick {}, resuming", self.tick.frame);
                self.motion.unfreeze();
                // Fresh delays so idling doesn't burst right after unfreezing.
                timers.reset(now, &self.config, &mut self.rng);
                effects.push(Effect::Unfreeze);
                self.set_state(BehaviorState::Alive);
            }
            EdgeKind::SustainedAbsent => {
                if timers.idle_due(now) {
                    let glance = draw_glance(&mut self.rng);
                    debug!("[Behavior] Idle glance: {:?}", glance);
                    let delivered = self.motion.issue(glance);
                    timers.idle_fired(now, &self.config, &mut self.rng);
                    effects.push(Effect::IdleMove { delivered });
                }
                if timers.jingle_due(now) {
                    let accepted = self.cue.trigger(CueId::Ambient, TriggerMode::BestEffort).await;
                    debug!("[Behavior] Ambient cue accepted: {}", accepted);
                    timers.jingle_fired(now, &self.config, &mut self.rng);
                    effects.push(Effect::AmbientCue { accepted });
                }
            }
        }

        TickReport {
            tick: self.tick,
            edge: edge.kind(),
            state: self.state,
            effects,
        }
    }

    /// Ticks until the shutdown token fires, then runs the shutdown sequence.
    pub async fn run(mut self) {
        self.presence.start();
        info!("[Behavior] Controller started. Tick: {}ms", self.config.tick_ms);

        let mut cadence = interval(self.config.tick());
        cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = cadence.tick() => {}
            }
            let report = self.tick_step(self.presence.is_present(), Instant::now()).await;
            if !report.effects.is_empty() {
                debug!("[Behavior] {:?}", report);
            }
        }

        self.shutdown_sequence().await;
    }

    /// Unfreeze, stop the monitor, release the audio channel. Every step is
    /// bounded; timeouts are logged by the step itself and do not abort the rest.
    pub async fn shutdown_sequence(&mut self) {
        info!("[Behavior] Shutting down");
        self.shutdown.cancel();
        self.motion.unfreeze();
        let monitor = self.presence.stop().await;
        let audio = self.cue.release().await;
        if monitor.is_ok() && audio.is_ok() {
            info!("[Behavior] Shutdown complete");
        }
    }

    fn effective_presence(&mut self, is_detected: bool, now: Instant) -> bool {
        if is_detected {
            self.last_seen = Some(now);
            return true;
        }
        let hold_off = self.config.release_hold_off();
        if hold_off.is_zero() || !self.was_present {
            return false;
        }
        self.last_seen
            .is_some_and(|seen| now.saturating_duration_since(seen) < hold_off)
    }

    fn set_state(&mut self, next: BehaviorState) {
        if self.state != next {
            self.state = next;
            self.status.send_replace(next);
        }
    }

    pub fn state(&self) -> BehaviorState {
        self.state
    }

    pub fn motion_state(&self) -> &MotionGateState {
        self.motion.state()
    }

    pub fn timers(&self) -> Option<&BehaviorTimers> {
        self.timers.as_ref()
    }

    pub fn cue(&self) -> &ExclusiveCue {
        &self.cue
    }

    pub fn presence(&self) -> &PresenceMonitor {
        &self.presence
    }
}

/// Owned by the surrounding application. Dropping it does not stop the loop;
/// call [`stop`](Self::stop).
pub struct ControllerHandle {
    shutdown: CancellationToken,
    task: JoinHandle<()>,
    status: watch::Receiver<BehaviorState>,
}

impl ControllerHandle {
    pub fn state(&self) -> BehaviorState {
        *self.status.borrow()
    }

    /// The root shutdown signal shared by the loop and the monitor.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Signals shutdown and waits for the loop to finish its shutdown sequence.
    pub async fn stop(self) {
        self.shutdown.cancel();
        if let Err(e) = self.task.await {
            error!("[Behavior] Controller task failed: {}", e);
        }
    }
}
