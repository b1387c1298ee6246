//! Error types for calconduit-sync.
//!
//! Per-calendar failures ([`FetchError`], [`PublishError`]) are recorded in the
//! run report and never abort a run. [`SyncError`] covers the log sink and
//! [`EventError`] single-event submission.

use std::path::PathBuf;

use thiserror::Error;

use calconduit_core::ConfigError;

/// Retrieving a source feed failed.
#[derive(Debug, Error)]
#[error("failed to fetch {url}: {cause}")]
pub struct FetchError {
    pub url: String,
    #[source]
    pub cause: FetchCause,
}

#[derive(Debug, Error)]
pub enum FetchCause {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("unsupported URL scheme '{0}'")]
    UnsupportedScheme(String),

    /// DNS, connect, TLS or timeout failure.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("source returned HTTP {0}")]
    Status(u16),

    #[error("failed to read response body: {0}")]
    Io(#[from] std::io::Error),

    #[error("response body is not valid UTF-8: {0}")]
    Decode(#[from] std::string::FromUtf8Error),
}

/// The service replied, but not with the expected import response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unexpected import response (HTTP {status}): {reason}")]
pub struct ResponseParseError {
    pub status: u16,
    pub reason: String,
    pub body: String,
}

/// Publishing a payload to the calendar service failed.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Connection-level failure: DNS, TLS, timeout, socket.
    #[error("transport error publishing to {endpoint}: {cause}")]
    Transport { endpoint: String, cause: String },

    #[error(transparent)]
    ResponseParse(#[from] ResponseParseError),
}

/// A single-event submission could not be built or published.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("event is missing required property {0}")]
    MissingProperty(&'static str),

    #[error("invalid property name '{0}'; expected letters, digits and '-'")]
    InvalidPropertyName(String),

    #[error("value of {0} must not contain line breaks")]
    InvalidValue(String),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Errors writing or reading the sync log.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("sync log JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
