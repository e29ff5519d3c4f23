//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files into [`GosyncConfig`]
//! - Apply environment overrides (`PORT`, `MIN_LEAD_MS`, `ALLOWED_ORIGINS`,
//!   `GOSYNC_SERVER_URL`)
//! - Validate configuration legality
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::resolve(Some(Path::new("gosync.toml"))).unwrap();
//! println!("relay port: {}", config.relay.port);
//! ```

pub mod env;
mod parser;
mod validator;

pub use contracts::GosyncConfig;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files, strings or
/// the environment.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<GosyncConfig, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<GosyncConfig, ContractError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }

    /// Defaults plus process environment overrides, validated.
    pub fn from_env() -> Result<GosyncConfig, ContractError> {
        Self::resolve(None)
    }

    /// File (or defaults when `path` is None), then environment
    /// overrides, then validation.
    pub fn resolve(path: Option<&Path>) -> Result<GosyncConfig, ContractError> {
        let mut config = match path {
            Some(path) => {
                let format = Self::detect_format(path)?;
                parser::parse(&Self::read_file(path)?, format)?
            }
            None => GosyncConfig::default(),
        };
        Self::apply_env_overrides(&mut config);
        validator::validate(&config)?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(config: &mut GosyncConfig) {
        env::apply_with(config, |key| std::env::var(key).ok());
    }

    /// Validate an already-assembled configuration
    pub fn validate(config: &GosyncConfig) -> Result<(), ContractError> {
        validator::validate(config)
    }

    /// Serialize to TOML string
    pub fn to_toml(config: &GosyncConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize to JSON string
    pub fn to_json(config: &GosyncConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const RELAY_TOML: &str = r#"
[relay]
host = "127.0.0.1"
port = 9100
min_lead_ms = 300
allowed_origins = ["https://stage.example"]
"#;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_from_str_toml() {
        let config = ConfigLoader::load_from_str(RELAY_TOML, ConfigFormat::Toml).unwrap();
        assert_eq!(config.relay.bind_addr(), "127.0.0.1:9100");
        assert_eq!(config.relay.min_lead_ms, 300);
    }

    #[test]
    fn test_load_from_path_detects_format() {
        let file = write_temp(".toml", RELAY_TOML);
        let config = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(config.relay.port, 9100);

        let file = write_temp(".json", r#"{"client": {"server_url": "ws://10.0.0.2:8080/ws"}}"#);
        let config = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(config.client.server_url, "ws://10.0.0.2:8080/ws");
    }

    #[test]
    fn test_unsupported_extension() {
        let file = write_temp(".yaml", "relay: {}");
        let err = ConfigLoader::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigLoader::load_from_path(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ContractError::Io(_)));
    }

    #[test]
    fn test_round_trip_toml() {
        let config = ConfigLoader::load_from_str(RELAY_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&config).unwrap();
        let reloaded = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(config, reloaded);
    }

    #[test]
    fn test_round_trip_json() {
        let config = ConfigLoader::load_from_str(RELAY_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&config).unwrap();
        let reloaded = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(config, reloaded);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = "[relay]\nmin_lead_ms = 90000\n";
        let err = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap_err();
        assert!(err.to_string().contains("relay.min_lead_ms"), "got: {err}");
    }
}
