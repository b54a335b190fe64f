use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::time::Instant;

use super::config::{BehaviorConfig, DelayRange};

/// Controller tick counter, used to correlate log lines and tick reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Tick {
    pub frame: u64,
}

impl Tick {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> Self {
        Tick { frame: self.frame + 1 }
    }
}

pub fn seeded_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    }
}

pub fn draw_delay(range: DelayRange, rng: &mut impl Rng) -> Duration {
    if range.min_ms >= range.max_ms {
        return range.min();
    }
    Duration::from_millis(rng.gen_range(range.min_ms..=range.max_ms))
}

/// Idle scheduling state. Owned and mutated by the controller loop only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BehaviorTimers {
    pub last_idle_move: Instant,
    pub next_idle_delay: Duration,
    pub last_jingle: Instant,
    pub next_jingle_delay: Duration,
}

impl BehaviorTimers {
    pub fn new(now: Instant, config: &BehaviorConfig, rng: &mut impl Rng) -> Self {
        Self {
            last_idle_move: now,
            next_idle_delay: draw_delay(config.idle_delay, rng),
            last_jingle: now,
            next_jingle_delay: draw_delay(config.ambient_delay, rng),
        }
    }

    /// Restart both clocks at `now` with fresh delays.
    pub fn reset(&mut self, now: Instant, config: &BehaviorConfig, rng: &mut impl Rng) {
        *self = Self::new(now, config, rng);
    }

    pub fn idle_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_idle_move) > self.next_idle_delay
    }

    pub fn jingle_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_jingle) > self.next_jingle_delay
    }

    pub fn idle_fired(&mut self, now: Instant, config: &BehaviorConfig, rng: &mut impl Rng) {
        self.last_idle_move = now;
        self.next_idle_delay = draw_delay(config.idle_delay, rng);
    }

    pub fn jingle_fired(&mut self, now: Instant, config: &BehaviorConfig, rng: &mut impl Rng) {
        self.last_jingle = now;
        self.next_jingle_delay = draw_delay(config.ambient_delay, rng);
    }
}
