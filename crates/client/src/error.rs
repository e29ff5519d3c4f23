//! Client error type

use thiserror::Error;

use contracts::ContractError;

/// Sync client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// `server_url` is not a usable WebSocket URL
    #[error("invalid server url '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// The event loop is gone
    #[error("client stopped")]
    Stopped,

    #[error("client task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;
