//! Client-side configuration contracts: offset estimation, countdown
//! cadence and reconnect backoff.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Sync client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ClientConfig {
    /// Relay WebSocket URL
    #[validate(length(min = 1))]
    pub server_url: String,

    /// Offset estimation
    #[validate(nested)]
    pub estimator: EstimatorConfig,

    /// Countdown cadence
    #[validate(nested)]
    pub countdown: CountdownConfig,

    /// Reconnect backoff
    #[validate(nested)]
    pub reconnect: ReconnectConfig,

    /// Outbound queue depth for commands issued by the caller
    #[validate(range(min = 1))]
    pub command_queue_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://localhost:8080/ws".to_string(),
            estimator: EstimatorConfig::default(),
            countdown: CountdownConfig::default(),
            reconnect: ReconnectConfig::default(),
            command_queue_capacity: 32,
        }
    }
}

/// Offset estimation round configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Probes sent per round
    #[validate(range(min = 1, max = 256))]
    pub probe_count: u32,

    /// Gap between consecutive probes
    pub probe_spacing_ms: u64,

    /// Wait after the last probe before closing the round
    pub grace_ms: u64,

    /// Re-estimation period
    #[validate(range(min = 1_000))]
    pub resync_interval_ms: u64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            probe_count: 12,
            probe_spacing_ms: 40,
            grace_ms: 500,
            resync_interval_ms: 60_000,
        }
    }
}

/// Two-phase countdown cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_countdown"))]
pub struct CountdownConfig {
    /// Remaining time at or below which the fine phase takes over
    pub fine_threshold_ms: u64,

    /// Longest coarse sleep
    #[validate(range(min = 1))]
    pub coarse_max_tick_ms: u64,

    /// Coarse sleeps stop this far short of the deadline
    pub coarse_margin_ms: u64,

    /// Fine-phase tick
    #[validate(range(min = 1, max = 50))]
    pub fine_tick_ms: u64,
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            fine_threshold_ms: 150,
            coarse_max_tick_ms: 100,
            coarse_margin_ms: 100,
            fine_tick_ms: 1,
        }
    }
}

// A coarse sleep must always be positive and land before the deadline.
fn validate_countdown(config: &CountdownConfig) -> Result<(), ValidationError> {
    if config.coarse_margin_ms >= config.fine_threshold_ms {
        let mut err = ValidationError::new("coarse_margin");
        err.message = Some("coarse_margin_ms must be below fine_threshold_ms".into());
        return Err(err);
    }
    Ok(())
}

/// Linear reconnect backoff: `min(max_ms, base_ms + attempts * step_ms)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ReconnectConfig {
    pub base_ms: u64,
    pub step_ms: u64,
    #[validate(range(min = 1))]
    pub max_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_ms: 500,
            step_ms: 500,
            max_ms: 5_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(ClientConfig::default().validate().is_ok());
    }

    #[test]
    fn test_margin_must_be_below_threshold() {
        let config = CountdownConfig {
            fine_threshold_ms: 100,
            coarse_margin_ms: 100,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nested_errors_surface() {
        let config = ClientConfig {
            estimator: EstimatorConfig {
                probe_count: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
