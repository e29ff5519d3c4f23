//! Environment overrides
//!
//! | variable | field |
//! |---|---|
//! | `PORT` | `relay.port` |
//! | `MIN_LEAD_MS` | `relay.min_lead_ms` |
//! | `ALLOWED_ORIGINS` | `relay.allowed_origins` (comma-separated) |
//! | `GOSYNC_SERVER_URL` | `client.server_url` |
//!
//! A numeric variable that does not parse leaves the field unchanged.

use contracts::GosyncConfig;

pub const PORT: &str = "PORT";
pub const MIN_LEAD_MS: &str = "MIN_LEAD_MS";
pub const ALLOWED_ORIGINS: &str = "ALLOWED_ORIGINS";
pub const SERVER_URL: &str = "GOSYNC_SERVER_URL";

/// Apply overrides read through `lookup`.
pub fn apply_with<F>(config: &mut GosyncConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup(PORT).and_then(|v| v.trim().parse().ok()) {
        config.relay.port = port;
    }
    if let Some(lead) = lookup(MIN_LEAD_MS).and_then(|v| v.trim().parse().ok()) {
        config.relay.min_lead_ms = lead;
    }
    if let Some(origins) = lookup(ALLOWED_ORIGINS) {
        config.relay.allowed_origins = parse_origin_list(&origins);
    }
    if let Some(url) = lookup(SERVER_URL) {
        let url = url.trim();
        if !url.is_empty() {
            config.client.server_url = url.to_string();
        }
    }
}

/// Split a comma-separated origin list, dropping blank entries.
pub fn parse_origin_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn apply(vars: &[(&str, &str)]) -> GosyncConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut config = GosyncConfig::default();
        apply_with(&mut config, |key| vars.get(key).cloned());
        config
    }

    #[test]
    fn test_no_vars_keeps_config() {
        assert_eq!(apply(&[]), GosyncConfig::default());
    }

    #[test]
    fn test_numeric_overrides() {
        let config = apply(&[("PORT", "9090"), ("MIN_LEAD_MS", " 350 ")]);
        assert_eq!(config.relay.port, 9090);
        assert_eq!(config.relay.min_lead_ms, 350);
    }

    #[test]
    fn test_unparseable_numbers_fall_back() {
        let config = apply(&[("PORT", "eighty"), ("MIN_LEAD_MS", "-5")]);
        assert_eq!(config.relay.port, 8080);
        assert_eq!(config.relay.min_lead_ms, 200);
    }

    #[test]
    fn test_origin_list_trimmed_and_filtered() {
        let config = apply(&[("ALLOWED_ORIGINS", " https://a.example , ,https://b.example,")]);
        assert_eq!(
            config.relay.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn test_empty_origin_var_allows_all() {
        let mut config = GosyncConfig::default();
        config.relay.allowed_origins = vec!["https://a.example".into()];
        apply_with(&mut config, |key| (key == ALLOWED_ORIGINS).then(String::new));
        assert!(config.relay.allowed_origins.is_empty());
    }

    #[test]
    fn test_server_url_override() {
        let config = apply(&[("GOSYNC_SERVER_URL", "wss://relay.example/ws")]);
        assert_eq!(config.client.server_url, "wss://relay.example/ws");

        let config = apply(&[("GOSYNC_SERVER_URL", "  ")]);
        assert_eq!(config.client.server_url, "ws://localhost:8080/ws");
    }
}
