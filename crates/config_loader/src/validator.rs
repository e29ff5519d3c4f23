//! Config validation
//!
//! Rules:
//! - field ranges declared with `#[validate]` on the contract structs
//! - `default_delay_ms <= max_delay_ms`
//! - origin entries non-empty and without surrounding whitespace
//! - `server_url` is a `ws://` or `wss://` URL

use contracts::{ClientConfig, ContractError, GosyncConfig, RelayConfig};
use url::Url;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

/// Validate a full config document
///
/// Returns the first error found, or Ok(()).
pub fn validate(config: &GosyncConfig) -> Result<(), ContractError> {
    if let Err(errors) = config.validate() {
        return Err(to_contract_error(&errors));
    }
    validate_relay(&config.relay)?;
    validate_client(&config.client)?;
    Ok(())
}

/// Relay checks beyond field ranges
fn validate_relay(relay: &RelayConfig) -> Result<(), ContractError> {
    if relay.default_delay_ms > relay.max_delay_ms {
        return Err(ContractError::config_validation(
            "relay.default_delay_ms",
            format!(
                "default_delay_ms ({}) must be <= max_delay_ms ({})",
                relay.default_delay_ms, relay.max_delay_ms
            ),
        ));
    }

    for (idx, origin) in relay.allowed_origins.iter().enumerate() {
        if origin.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("relay.allowed_origins[{idx}]"),
                "origin cannot be empty",
            ));
        }
        if origin.trim() != origin {
            return Err(ContractError::config_validation(
                format!("relay.allowed_origins[{idx}]"),
                format!("origin '{origin}' has surrounding whitespace"),
            ));
        }
    }
    Ok(())
}

/// Client checks beyond field ranges
fn validate_client(client: &ClientConfig) -> Result<(), ContractError> {
    let url = Url::parse(&client.server_url).map_err(|e| {
        ContractError::config_validation(
            "client.server_url",
            format!("invalid url '{}': {e}", client.server_url),
        )
    })?;

    match url.scheme() {
        "ws" | "wss" => Ok(()),
        other => Err(ContractError::config_validation(
            "client.server_url",
            format!("scheme must be ws or wss, got '{other}'"),
        )),
    }
}

/// Flatten derive errors into the first `(path, message)` pair.
fn to_contract_error(errors: &ValidationErrors) -> ContractError {
    match first_error(errors, "") {
        Some((field, message)) => ContractError::config_validation(field, message),
        None => ContractError::config_validation("<root>", errors.to_string()),
    }
}

fn first_error(errors: &ValidationErrors, prefix: &str) -> Option<(String, String)> {
    // sorted for stable messages
    let mut entries: Vec<_> = errors.errors().iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    for (field, kind) in entries {
        let field: &str = field;
        let path = match (prefix.is_empty(), field) {
            (true, _) => field.to_string(),
            // struct-level (schema) errors
            (false, "__all__") => prefix.to_string(),
            (false, _) => format!("{prefix}.{field}"),
        };

        let found = match kind {
            ValidationErrorsKind::Field(list) => list.first().map(|e| (path, describe(e))),
            ValidationErrorsKind::Struct(inner) => first_error(inner, &path),
            ValidationErrorsKind::List(items) => items
                .iter()
                .find_map(|(idx, inner)| first_error(inner, &format!("{path}[{idx}]"))),
        };
        if found.is_some() {
            return found;
        }
    }
    None
}

fn describe(error: &ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }
    let bound = |key: &str| error.params.get(key).map(|v| v.to_string());
    match (bound("min"), bound("max")) {
        (Some(min), Some(max)) => format!("must be between {min} and {max}"),
        (Some(min), None) => format!("must be >= {min}"),
        (None, Some(max)) => format!("must be <= {max}"),
        (None, None) => format!("failed '{}' check", error.code),
    }
}
