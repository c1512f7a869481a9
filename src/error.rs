use std::time::Duration;

use thiserror::Error;

/// Failure talking to one of the upstream providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} returned {status}")]
    Status { endpoint: String, status: u16 },

    #[error("{endpoint} timed out after {after:?}")]
    Timeout { endpoint: String, after: Duration },

    #[error("{0} not available yet")]
    Unavailable(&'static str),
}

/// Failures that abort a whole stats run. Per-chat failures never end up here.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("chat snapshot unavailable: {0}")]
    Snapshot(#[source] ProviderError),

    #[error("deposit aggregate unavailable: {0}")]
    Deposits(#[source] ProviderError),
}
