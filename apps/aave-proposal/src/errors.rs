use alloy::primitives::U256;
use std::time::Duration;
use thiserror::Error;

/// The user input did not contain a proposal ID.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("could not extract proposal ID from: {0}")]
    NotAnIdentifier(String),
}

/// A network call against one of the data sources failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("query returned errors: {}", .0.join("; "))]
    Query(Vec<String>),
    #[error("no proposal found with ID: {0}")]
    NotFound(String),
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(timeout)
        } else if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// An on-chain response arrived but cannot be trusted for this proposal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("proposal ID mismatch: requested {requested}, got {returned} (wrong chain?)")]
    IdMismatch { requested: U256, returned: U256 },
    #[error("proposal has zero timestamps (start {start}, end {end}); voting may not have started")]
    ZeroTimestamps { start: u64, end: u64 },
}

/// Failures that end a run.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}
