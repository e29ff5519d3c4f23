//! Countdown scheduling toward an absolute server-clock instant.
//!
//! Two cadences:
//! - **Coarse**: more than `fine_threshold_ms` (150 ms by default) left.
//!   Sleep `min(coarse_max_tick_ms, remaining - coarse_margin_ms)` on an
//!   ordinary timer.
//! - **Fine**: at or below the threshold. Re-check every `fine_tick_ms`
//!   until the deadline passes.
//!
//! Coarse timers may overshoot by tens of milliseconds, so the margin keeps
//! every coarse wake-up ahead of the deadline and only the fine phase ever
//! observes `remaining <= 0`.

use std::time::Duration;

use contracts::CountdownConfig;
use tracing::{debug, trace};

/// Generation tag for one armed target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CountdownToken(u64);

/// Scheduling phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Coarse,
    Fine,
}

/// What to do after a poll
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// Deadline reached. Returned once per armed target.
    Fire {
        /// How far past the target this poll landed, ms (≥ 0)
        late_ms: f64,
    },
    /// Poll again after `delay`
    Wait {
        phase: Phase,
        delay: Duration,
        remaining_ms: f64,
    },
    /// Token does not belong to the armed target
    Stale,
}

#[derive(Debug, Clone, Copy)]
struct Armed {
    token: CountdownToken,
    start_at: i64,
}

/// Client-side countdown scheduler
///
/// Holds at most one target. Arming a new one invalidates the previous
/// token, so callbacks scheduled for it come back as [`Step::Stale`].
#[derive(Debug)]
pub struct CountdownScheduler {
    config: CountdownConfig,
    generation: u64,
    armed: Option<Armed>,
}

impl CountdownScheduler {
    pub fn new(config: CountdownConfig) -> Self {
        Self {
            config,
            generation: 0,
            armed: None,
        }
    }

    /// Target `start_at` (server clock, epoch ms), replacing any armed target.
    pub fn arm(&mut self, start_at: i64) -> CountdownToken {
        self.generation += 1;
        let token = CountdownToken(self.generation);
        if let Some(previous) = self.armed.replace(Armed { token, start_at }) {
            debug!(
                previous = previous.start_at,
                start_at, "countdown target replaced"
            );
        }
        token
    }

    /// Stop the armed countdown, if any.
    pub fn cancel(&mut self) {
        if let Some(armed) = self.armed.take() {
            debug!(start_at = armed.start_at, "countdown cancelled");
        }
    }

    /// Currently armed target and its token
    pub fn armed(&self) -> Option<(CountdownToken, i64)> {
        self.armed.map(|armed| (armed.token, armed.start_at))
    }

    /// Phase for a given remaining time
    pub fn phase_for(&self, remaining_ms: f64) -> Phase {
        if remaining_ms > self.config.fine_threshold_ms as f64 {
            Phase::Coarse
        } else {
            Phase::Fine
        }
    }

    /// Evaluate the target for `token` at local time `local_now_ms` with
    /// the current offset estimate.
    pub fn poll(&mut self, token: CountdownToken, local_now_ms: i64, offset_ms: f64) -> Step {
        let Some(armed) = self.armed.filter(|armed| armed.token == token) else {
            return Step::Stale;
        };

        let server_now = local_now_ms as f64 + offset_ms;
        let remaining_ms = armed.start_at as f64 - server_now;

        if remaining_ms <= 0.0 {
            self.armed = None;
            debug!(start_at = armed.start_at, late_ms = -remaining_ms, "countdown fired");
            return Step::Fire {
                late_ms: -remaining_ms,
            };
        }

        let phase = self.phase_for(remaining_ms);
        let delay = match phase {
            Phase::Coarse => {
                let ms = (remaining_ms - self.config.coarse_margin_ms as f64)
                    .min(self.config.coarse_max_tick_ms as f64)
                    .max(1.0);
                Duration::from_secs_f64(ms / 1000.0)
            }
            Phase::Fine => Duration::from_millis(self.config.fine_tick_ms),
        };
        trace!(remaining_ms, ?phase, ?delay, "countdown tick");
        Step::Wait {
            phase,
            delay,
            remaining_ms,
        }
    }
}
