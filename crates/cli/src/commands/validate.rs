//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::GosyncConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Below this the relay leaves clients little room to arm a countdown
const LOW_LEAD_WARN_MS: u64 = 100;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    bind: String,
    min_lead_ms: u64,
    max_delay_ms: u64,
    allowed_origins: usize,
    server_url: String,
    probe_count: u32,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    bind: config.relay.bind_addr(),
                    min_lead_ms: config.relay.min_lead_ms,
                    max_delay_ms: config.relay.max_delay_ms,
                    allowed_origins: config.relay.allowed_origins.len(),
                    server_url: config.client.server_url.clone(),
                    probe_count: config.client.estimator.probe_count,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &GosyncConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    let relay = &config.relay;

    if relay.allowed_origins.is_empty() {
        warnings.push("relay.allowed_origins is empty - every origin is accepted".to_string());
    }

    if relay.min_lead_ms < LOW_LEAD_WARN_MS {
        warnings.push(format!(
            "relay.min_lead_ms is {} - clients may receive START after the instant has passed",
            relay.min_lead_ms
        ));
    }

    if relay.metrics_port.is_some_and(|port| port == relay.port) {
        warnings.push(format!(
            "relay.metrics_port equals relay.port ({}) - one of them will fail to bind",
            relay.port
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Relay bind: {}", summary.bind);
            println!("  Min lead: {} ms", summary.min_lead_ms);
            println!("  Max delay: {} ms", summary.max_delay_ms);
            println!("  Allowed origins: {}", summary.allowed_origins);
            println!("  Server URL: {}", summary.server_url);
            println!("  Probes per round: {}", summary.probe_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn validate_file(contents: &str) -> ValidationResult {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        };
        validate_config(&args)
    }

    #[test]
    fn test_missing_file_is_invalid() {
        let args = ValidateArgs {
            config: PathBuf::from("/nonexistent/gosync.toml"),
            json: true,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }

    #[test]
    fn test_valid_file_reports_summary_and_warnings() {
        let result = validate_file(
            r#"
            [relay]
            port = 9001
            min_lead_ms = 50
            "#,
        );
        assert!(result.valid, "{:?}", result.error);
        let summary = result.summary.unwrap();
        assert_eq!(summary.bind, "0.0.0.0:9001");
        assert_eq!(summary.min_lead_ms, 50);

        let warnings = result.warnings.unwrap();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("allowed_origins"));
        assert!(warnings[1].contains("min_lead_ms"));
    }

    #[test]
    fn test_restricted_origins_have_no_warnings() {
        let result = validate_file(
            r#"
            [relay]
            allowed_origins = ["https://show.example"]
            "#,
        );
        assert!(result.valid);
        assert!(result.warnings.is_none());
    }

    #[test]
    fn test_invalid_values_fail() {
        let result = validate_file(
            r#"
            [relay]
            default_delay_ms = 90000
            max_delay_ms = 1000
            "#,
        );
        assert!(!result.valid);
        assert!(result.summary.is_none());
    }
}
