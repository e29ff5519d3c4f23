//! RelayConfig - relay server settings
//!
//! Every field has a default; a config file only needs to name what it
//! changes.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Upper bound accepted for `max_delay_ms` (one hour)
pub const MAX_DELAY_CEILING_MS: u64 = 3_600_000;

/// Relay server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RelayConfig {
    /// Bind address
    #[validate(length(min = 1))]
    pub host: String,

    /// Listen port (0 = ephemeral)
    pub port: u16,

    /// Floor on the lead time between request and start instant
    #[validate(range(max = 60_000))]
    pub min_lead_ms: u64,

    /// Requested delays are clamped into `[0, max_delay_ms]`
    #[validate(range(min = 1, max = 3_600_000))]
    pub max_delay_ms: u64,

    /// Delay used when a start request carries no usable `delayMs`
    pub default_delay_ms: u64,

    /// Allowed `Origin` header values (empty = allow all)
    pub allowed_origins: Vec<String>,

    /// Text frames above this size close the connection
    #[validate(range(min = 64))]
    pub max_message_bytes: usize,

    /// Outbound queue depth per connection
    #[validate(range(min = 1))]
    pub send_queue_capacity: usize,

    /// `PING` rate limit per connection
    #[validate(nested)]
    pub ping_limit: RateLimitConfig,

    /// `START_REQ` rate limit per connection
    #[validate(nested)]
    pub start_limit: RateLimitConfig,

    /// Prometheus exporter port (None = disabled)
    pub metrics_port: Option<u16>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            min_lead_ms: 200,
            max_delay_ms: 60_000,
            default_delay_ms: 5_000,
            allowed_origins: Vec::new(),
            max_message_bytes: 10_000,
            send_queue_capacity: 64,
            ping_limit: RateLimitConfig::new(10_000, 25),
            start_limit: RateLimitConfig::new(10_000, 5),
            metrics_port: None,
        }
    }
}

impl RelayConfig {
    /// `host:port` string for binding
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Sliding-window rate limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RateLimitConfig {
    /// Window length
    #[validate(range(min = 1))]
    pub window_ms: u64,

    /// Accepted requests per window
    #[validate(range(min = 1))]
    pub max_requests: usize,
}

impl RateLimitConfig {
    pub const fn new(window_ms: u64, max_requests: usize) -> Self {
        Self {
            window_ms,
            max_requests,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_deployment() {
        let config = RelayConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.min_lead_ms, 200);
        assert_eq!(config.max_delay_ms, 60_000);
        assert_eq!(config.ping_limit, RateLimitConfig::new(10_000, 25));
        assert_eq!(config.start_limit, RateLimitConfig::new(10_000, 5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_rate_limit_is_invalid() {
        let config = RelayConfig {
            start_limit: RateLimitConfig::new(10_000, 0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: RelayConfig = serde_json::from_str(r#"{"port": 9001}"#).unwrap();
        assert_eq!(config.port, 9001);
        assert_eq!(config.min_lead_ms, 200);
    }
}
