//! Error types for fleetpulse-core

use thiserror::Error;

/// Result type for reconciliation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during a reconciliation run.
///
/// `Config` is fatal before any network call; the transport variants are
/// fatal for the run (no partial update is ever submitted). Per-device
/// data-quality problems are not errors at all — they degrade the device
/// to unhealthy and surface through the run event stream instead.
#[derive(Error, Debug)]
pub enum Error {
    /// A required credential or option is missing
    #[error("missing required configuration: {0}")]
    Config(String),

    /// The HTTP request itself failed (connect, timeout, decode)
    #[error("{service} request failed: {source}")]
    Http {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-2xx status
    #[error("{service} returned unexpected status {status}")]
    UnexpectedStatus {
        service: &'static str,
        status: reqwest::StatusCode,
    },
}

impl Error {
    /// Wrap a reqwest error, tagging it with the originating service.
    pub fn http(service: &'static str, source: reqwest::Error) -> Self {
        Error::Http { service, source }
    }
}
