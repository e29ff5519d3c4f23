//! Relay and client metrics
//!
//! Thin wrappers over the `metrics` facade so metric names live in one
//! place. Without an installed recorder every call is a no-op.

use metrics::{counter, gauge, histogram};

// ===== Relay =====

/// A WebSocket session started
pub fn record_connection_opened() {
    counter!("gosync_connections_total").increment(1);
    gauge!("gosync_connections_active").increment(1.0);
}

/// A WebSocket session ended
pub fn record_connection_closed(duration_secs: f64) {
    gauge!("gosync_connections_active").decrement(1.0);
    histogram!("gosync_connection_duration_seconds").record(duration_secs);
}

/// Upgrade refused by the origin allow-list
pub fn record_origin_rejected() {
    counter!("gosync_origin_rejected_total").increment(1);
}

/// A connection joined a room
pub fn record_join(rooms_active: usize) {
    counter!("gosync_joins_total").increment(1);
    gauge!("gosync_rooms_active").set(rooms_active as f64);
}

/// Room count changed outside a join (disconnect)
pub fn record_rooms_active(rooms_active: usize) {
    gauge!("gosync_rooms_active").set(rooms_active as f64);
}

/// A probe was answered
pub fn record_ping() {
    counter!("gosync_pings_total").increment(1);
}

/// A request was dropped by a rate limiter
pub fn record_rate_limited(kind: &'static str) {
    counter!("gosync_rate_limited_total", "kind" => kind).increment(1);
}

/// A start instant was broadcast
pub fn record_start(lead_ms: u64, recipients: usize) {
    counter!("gosync_starts_total").increment(1);
    histogram!("gosync_lead_time_ms").record(lead_ms as f64);
    histogram!("gosync_start_recipients").record(recipients as f64);
}

// ===== Client =====

/// An estimation round closed
pub fn record_round_outcome(outcome: &'static str, offset_ms: f64, best_rtt_ms: Option<i64>) {
    counter!("gosync_rounds_total", "outcome" => outcome).increment(1);
    gauge!("gosync_offset_ms").set(offset_ms);
    if let Some(rtt) = best_rtt_ms {
        gauge!("gosync_best_rtt_ms").set(rtt as f64);
    }
}

/// A countdown fired
pub fn record_go(late_ms: f64) {
    counter!("gosync_go_total").increment(1);
    histogram!("gosync_go_late_ms").record(late_ms);
}

/// The client scheduled a reconnect
pub fn record_reconnect(attempt: u32) {
    counter!("gosync_reconnects_total").increment(1);
    gauge!("gosync_reconnect_attempt").set(attempt as f64);
}

/// Client session statistics
///
/// Aggregated in memory for the end-of-session summary.
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Rounds that replaced the offset
    pub rounds_updated: u64,

    /// Rounds that kept the previous offset
    pub rounds_retained: u64,

    /// Adopted offsets (ms)
    pub offset_stats: RunningStats,

    /// RTT of adopted samples (ms)
    pub rtt_stats: RunningStats,

    /// Fire lateness (ms)
    pub late_stats: RunningStats,

    /// Reconnect attempts
    pub reconnects: u64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Round replaced the offset
    pub fn record_update(&mut self, offset_ms: f64, rtt_ms: i64) {
        self.rounds_updated += 1;
        self.offset_stats.push(offset_ms);
        self.rtt_stats.push(rtt_ms as f64);
    }

    /// Round closed without samples
    pub fn record_retained(&mut self) {
        self.rounds_retained += 1;
    }

    /// Countdown fired
    pub fn record_go(&mut self, late_ms: f64) {
        self.late_stats.push(late_ms);
    }

    /// Reconnect scheduled
    pub fn record_reconnect(&mut self) {
        self.reconnects += 1;
    }

    /// Freeze into a printable summary
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            rounds_updated: self.rounds_updated,
            rounds_retained: self.rounds_retained,
            offset_ms: StatsSummary::from(&self.offset_stats),
            rtt_ms: StatsSummary::from(&self.rtt_stats),
            go_late_ms: StatsSummary::from(&self.late_stats),
            reconnects: self.reconnects,
        }
    }
}

/// Session summary
#[derive(Debug, Clone, Default)]
pub struct SessionSummary {
    pub rounds_updated: u64,
    pub rounds_retained: u64,
    pub offset_ms: StatsSummary,
    pub rtt_ms: StatsSummary,
    pub go_late_ms: StatsSummary,
    pub reconnects: u64,
}

impl std::fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Sync Session Summary ===")?;
        writeln!(
            f,
            "Estimation rounds: {} updated, {} retained",
            self.rounds_updated, self.rounds_retained
        )?;
        writeln!(f, "Offset (ms): {}", self.offset_ms)?;
        writeln!(f, "Best RTT (ms): {}", self.rtt_ms)?;
        writeln!(f, "GO lateness (ms): {}", self.go_late_ms)?;
        writeln!(f, "Reconnects: {}", self.reconnects)?;
        Ok(())
    }
}

/// Frozen view of a [`RunningStats`]
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online mean/variance (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Add a sample
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// Sample count
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// Standard deviation
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Smallest sample
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Largest sample
    pub fn max(&self) -> f64 {
        self.max
    }
}
