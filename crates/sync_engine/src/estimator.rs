//! Clock offset estimation rounds.
//!
//! A round sends `probe_count` probes spaced `probe_spacing_ms` apart, keeps
//! collecting replies for `grace_ms` after the last one, then adopts the
//! offset of the minimum-RTT sample. The estimator only holds state; the
//! caller owns the timers and feeds back what they produce.

use std::collections::HashSet;
use std::time::Duration;

use contracts::EstimatorConfig;
use tracing::{debug, instrument, trace};

use crate::sample::{select_best, OffsetSample};

/// Generation tag for one estimation round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoundId(u64);

/// What the caller should schedule after sending a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// Send another probe after this delay
    Probe(Duration),
    /// Close the round after this delay
    Close(Duration),
}

/// A probe ready to go on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    pub t0: i64,
    pub next: NextStep,
}

/// Result of feeding a reply into the estimator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReplyOutcome {
    /// Matched a pending probe of the active round
    Accepted(OffsetSample),
    /// Unknown, already consumed, or from a superseded round
    Dropped,
}

/// Result of closing a round
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RoundOutcome {
    /// Offset replaced by the best sample of the round
    Updated {
        offset_ms: f64,
        best_rtt_ms: i64,
        samples: usize,
    },
    /// No replies arrived; the previous offset stays
    Retained { offset_ms: f64 },
    /// The round was superseded or aborted before closing
    Stale,
}

#[derive(Debug)]
struct ActiveRound {
    id: RoundId,
    issued: u32,
    last_t0: Option<i64>,
    pending: HashSet<i64>,
    samples: Vec<OffsetSample>,
}

/// Client-side clock offset estimator
#[derive(Debug)]
pub struct ClockOffsetEstimator {
    config: EstimatorConfig,
    /// Current belief of server − local, ms
    offset_ms: f64,
    generation: u64,
    active: Option<ActiveRound>,
    last_best_rtt: Option<i64>,
}

impl ClockOffsetEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self {
            config,
            offset_ms: 0.0,
            generation: 0,
            active: None,
            last_best_rtt: None,
        }
    }

    /// Current offset (server − local), ms
    pub fn offset_ms(&self) -> f64 {
        self.offset_ms
    }

    /// RTT of the sample behind the current offset, if any round succeeded
    pub fn last_best_rtt_ms(&self) -> Option<i64> {
        self.last_best_rtt
    }

    /// Whether a round is collecting probes
    pub fn is_round_active(&self) -> bool {
        self.active.is_some()
    }

    /// Id of the round currently collecting, if any
    pub fn active_round(&self) -> Option<RoundId> {
        self.active.as_ref().map(|round| round.id)
    }

    /// Re-estimation period
    pub fn resync_interval(&self) -> Duration {
        Duration::from_millis(self.config.resync_interval_ms)
    }

    /// Start a new round, superseding any round still in flight.
    pub fn begin_round(&mut self) -> RoundId {
        self.generation += 1;
        let id = RoundId(self.generation);
        if let Some(previous) = self.active.take() {
            debug!(
                round = previous.id.0,
                pending = previous.pending.len(),
                "superseding unfinished estimation round"
            );
        }
        self.active = Some(ActiveRound {
            id,
            issued: 0,
            last_t0: None,
            pending: HashSet::new(),
            samples: Vec::with_capacity(self.config.probe_count as usize),
        });
        id
    }

    /// Register the next probe of `round`, sent at local time `now_ms`.
    ///
    /// Returns `None` if the round is stale or has used its probe budget.
    /// `t0` is unique within the round: a probe issued in the same
    /// millisecond as an earlier one is moved to the next free millisecond.
    pub fn issue_probe(&mut self, round: RoundId, now_ms: i64) -> Option<Probe> {
        let probe_count = self.config.probe_count;
        let spacing = Duration::from_millis(self.config.probe_spacing_ms);
        let grace = Duration::from_millis(self.config.grace_ms);

        let active = self.active.as_mut().filter(|active| active.id == round)?;
        if active.issued >= probe_count {
            return None;
        }

        let t0 = match active.last_t0 {
            Some(last) if now_ms <= last => last + 1,
            _ => now_ms,
        };
        active.last_t0 = Some(t0);
        active.pending.insert(t0);
        active.issued += 1;

        let next = if active.issued < probe_count {
            NextStep::Probe(spacing)
        } else {
            NextStep::Close(grace)
        };
        trace!(round = round.0, t0, issued = active.issued, "probe issued");
        Some(Probe { t0, next })
    }

    /// Feed a `PONG{t0, t1}` received at local time `now_ms`.
    pub fn record_reply(&mut self, t0: i64, t1: i64, now_ms: i64) -> ReplyOutcome {
        let Some(active) = self.active.as_mut() else {
            return ReplyOutcome::Dropped;
        };
        if !active.pending.remove(&t0) {
            trace!(t0, "dropping unknown or duplicate probe reply");
            return ReplyOutcome::Dropped;
        }
        match OffsetSample::new(t0, t1, now_ms) {
            Some(sample) => {
                active.samples.push(sample);
                ReplyOutcome::Accepted(sample)
            }
            None => ReplyOutcome::Dropped,
        }
    }

    /// Close `round` and adopt its best sample.
    ///
    /// Probes still pending are discarded. With zero samples the previous
    /// offset is kept as is.
    #[instrument(name = "estimator_finish_round", level = "debug", skip_all, fields(round = round.0))]
    pub fn finish_round(&mut self, round: RoundId) -> RoundOutcome {
        if self.active_round() != Some(round) {
            return RoundOutcome::Stale;
        }
        let Some(active) = self.active.take() else {
            return RoundOutcome::Stale;
        };

        let outcome = match select_best(&active.samples) {
            Some(best) => {
                self.offset_ms = best.offset;
                self.last_best_rtt = Some(best.rtt);
                RoundOutcome::Updated {
                    offset_ms: best.offset,
                    best_rtt_ms: best.rtt,
                    samples: active.samples.len(),
                }
            }
            None => RoundOutcome::Retained {
                offset_ms: self.offset_ms,
            },
        };

        debug!(
            lost = active.pending.len(),
            samples = active.samples.len(),
            offset_ms = self.offset_ms,
            "estimation round closed"
        );
        observability::metrics::record_round_outcome(
            outcome_label(&outcome),
            self.offset_ms,
            self.last_best_rtt,
        );
        outcome
    }

    /// Drop the active round and its pending probes (connection torn down).
    pub fn abort_round(&mut self) {
        if let Some(active) = self.active.take() {
            debug!(round = active.id.0, "estimation round aborted");
        }
    }
}

fn outcome_label(outcome: &RoundOutcome) -> &'static str {
    match outcome {
        RoundOutcome::Updated { .. } => "updated",
        RoundOutcome::Retained { .. } => "retained",
        RoundOutcome::Stale => "stale",
    }
}
