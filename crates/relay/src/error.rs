//! Relay error type

use thiserror::Error;

use contracts::ContractError;

/// Relay server errors
#[derive(Debug, Error)]
pub enum RelayError {
    /// Contract-level failure (bind, config, encoding)
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// The accept loop stopped with an IO error
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RelayError>;
