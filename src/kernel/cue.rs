use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::config::BehaviorConfig;
use super::error::ShutdownTimeout;
use crate::devices::{CueId, SoundPlayer, StopSignal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerMode {
    /// Drop the request if the audio channel is busy.
    BestEffort,
    /// Stop whatever is playing, wait briefly for the channel, then play regardless.
    Preemptive,
}

/// Which cue currently owns the audio channel, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CueLock {
    pub held_by: Option<CueId>,
}

#[derive(Debug)]
struct InFlight {
    id: Uuid,
    cue: CueId,
    stop: StopSignal,
}

/// Serializes cue rendering so at most one cue plays at a time.
///
/// Renders run on blocking workers. Each accepted trigger gets its own
/// [`StopSignal`]; preemption raises it and waits for the channel to free up.
pub struct ExclusiveCue {
    player: Arc<dyn SoundPlayer>,
    channel: Arc<AsyncMutex<()>>,
    in_flight: Arc<Mutex<Option<InFlight>>>,
    renders: Mutex<Vec<JoinHandle<()>>>,
    preempt_wait: Duration,
    release_bound: Duration,
}

impl ExclusiveCue {
    pub fn new(player: Arc<dyn SoundPlayer>, config: &BehaviorConfig) -> Self {
        Self {
            player,
            channel: Arc::new(AsyncMutex::new(())),
            in_flight: Arc::new(Mutex::new(None)),
            renders: Mutex::new(Vec::new()),
            preempt_wait: config.preempt_wait(),
            release_bound: config.cue_release(),
        }
    }

    /// Requests `cue`. Returns whether it was accepted for rendering.
    pub async fn trigger(&self, cue: CueId, mode: TriggerMode) -> bool {
        match mode {
            TriggerMode::BestEffort => {
                // A preemptive render that gave up waiting holds no guard, so
                // the channel can be unlocked while it still plays.
                if let Some(current) = self.lock_state().held_by {
                    debug!("[Sound] {:?} still rendering, dropping {:?}", current, cue);
                    return false;
                }
                match Arc::clone(&self.channel).try_lock_owned() {
                    Ok(guard) => {
                        self.spawn_render(cue, Some(guard));
                        true
                    }
                    Err(_) => {
                        debug!("[Sound] Channel busy, dropping {:?}", cue);
                        false
                    }
                }
            }
            TriggerMode::Preemptive => {
                self.stop_current();
                let acquire = Arc::clone(&self.channel).lock_owned();
                let guard = match tokio::time::timeout(self.preempt_wait, acquire).await {
                    Ok(guard) => Some(guard),
                    Err(_) => {
                        warn!(
                            "[Sound] Channel still busy after {:?}, playing {:?} without exclusivity",
                            self.preempt_wait, cue
                        );
                        None
                    }
                };
                self.spawn_render(cue, guard);
                true
            }
        }
    }

    pub fn lock_state(&self) -> CueLock {
        CueLock {
            held_by: lock(&self.in_flight).as_ref().map(|f| f.cue),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.lock_state().held_by.is_some()
    }

    /// Stops any in-flight cue and waits for every render to finish, at most
    /// `cue_release_ms`. The channel is free afterwards unless this times out.
    pub async fn release(&self) -> Result<(), ShutdownTimeout> {
        self.stop_current();
        let pending: Vec<JoinHandle<()>> = lock(&self.renders).drain(..).collect();
        if pending.is_empty() {
            return Ok(());
        }

        let drain = async {
            for handle in pending {
                if let Err(e) = handle.await {
                    warn!("[Sound] Render worker failed: {}", e);
                }
            }
        };
        match tokio::time::timeout(self.release_bound, drain).await {
            Ok(()) => {
                info!("[Sound] Audio channel released");
                Ok(())
            }
            Err(_) => {
                let err = ShutdownTimeout {
                    subsystem: "cue renderer",
                    bound: self.release_bound,
                };
                error!("[Sound] {}", err);
                Err(err)
            }
        }
    }

    fn stop_current(&self) {
        if let Some(current) = lock(&self.in_flight).as_ref() {
            debug!("[Sound] Stopping {:?} ({})", current.cue, current.id);
            current.stop.stop();
        }
    }

    fn spawn_render(&self, cue: CueId, guard: Option<OwnedMutexGuard<()>>) {
        let id = Uuid::new_v4();
        let stop = StopSignal::new();
        *lock(&self.in_flight) = Some(InFlight {
            id,
            cue,
            stop: stop.clone(),
        });

        let player = Arc::clone(&self.player);
        let in_flight = Arc::clone(&self.in_flight);
        let handle = tokio::task::spawn_blocking(move || {
            // Dropped in reverse order: the in-flight record clears first, then
            // the channel unlocks. Both happen on panic too.
            let _guard = guard;
            let _clear = ClearInFlight { slot: in_flight, id };

            debug!("[Sound] Rendering {:?} ({})", cue, id);
            if let Err(e) = player.render(cue, &stop) {
                warn!("[Sound] {:?} failed: {}", cue, e);
            }
        });

        let mut renders = lock(&self.renders);
        renders.retain(|h| !h.is_finished());
        renders.push(handle);
    }
}

struct ClearInFlight {
    slot: Arc<Mutex<Option<InFlight>>>,
    id: Uuid,
}

impl Drop for ClearInFlight {
    fn drop(&mut self) {
        let mut slot = lock(&self.slot);
        if slot.as_ref().is_some_and(|f| f.id == self.id) {
            *slot = None;
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
