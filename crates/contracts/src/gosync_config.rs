//! GosyncConfig - top-level config file layout
//!
//! ```toml
//! [relay]
//! port = 8080
//! allowed_origins = ["https://example.com"]
//!
//! [client]
//! server_url = "ws://localhost:8080/ws"
//! ```

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{ClientConfig, RelayConfig};

/// Config file root
///
/// Both sections are optional; the relay reads `[relay]` and the client
/// reads `[client]`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct GosyncConfig {
    #[validate(nested)]
    pub relay: RelayConfig,

    #[validate(nested)]
    pub client: ClientConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_all_defaults() {
        let config: GosyncConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, GosyncConfig::default());
        assert!(config.validate().is_ok());
    }
}
