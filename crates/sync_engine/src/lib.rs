//! # Sync Engine
//!
//! Client-side clock synchronization core.
//!
//! Responsibilities:
//! - Offset samples from round-trip probes (`t0`, `t1`, `t2`)
//! - Estimation rounds with minimum-RTT selection
//! - Two-phase countdown toward a server-clock instant
//!
//! Nothing here touches a socket or a timer: callers own both and feed
//! results back, which keeps every stale-callback path testable.
//!
//! ## Usage
//!
//! ```ignore
//! use sync_engine::{ClockOffsetEstimator, CountdownScheduler, NextStep, Step};
//!
//! let mut estimator = ClockOffsetEstimator::new(config.estimator);
//! let round = estimator.begin_round();
//! if let Some(probe) = estimator.issue_probe(round, clock.now_ms()) {
//!     send(ClientMessage::Ping { t0: probe.t0.into() });
//! }
//! // ... on PONG
//! estimator.record_reply(t0, t1, clock.now_ms());
//! // ... after the grace period
//! estimator.finish_round(round);
//!
//! let mut countdown = CountdownScheduler::new(config.countdown);
//! let token = countdown.arm(start_at);
//! match countdown.poll(token, clock.now_ms(), estimator.offset_ms()) {
//!     Step::Fire { .. } => println!("GO!"),
//!     Step::Wait { delay, .. } => { /* sleep(delay) then poll again */ }
//!     Step::Stale => {}
//! }
//! ```

mod countdown;
mod estimator;
mod sample;

pub use contracts::{CountdownConfig, EstimatorConfig};
pub use countdown::{CountdownScheduler, CountdownToken, Phase, Step};
pub use estimator::{
    ClockOffsetEstimator, NextStep, Probe, ReplyOutcome, RoundId, RoundOutcome,
};
pub use sample::{estimate_offset, select_best, OffsetSample};
