//! Error types for calconduit-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from loading the calendar registry or settings.
///
/// Any of these is fatal for a sync run: without definitions there is nothing to do.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse error on load, with file path and serde_yaml's line context.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Legacy XML registry could not be parsed.
    #[error("failed to parse XML registry at {path}: {source}")]
    Xml {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    /// A registry entry is missing a required field.
    #[error("{path}: calendar #{index} is missing <{field}>")]
    MissingField {
        path: PathBuf,
        index: usize,
        field: &'static str,
    },

    /// A registry entry is present but unusable.
    #[error("{path}: {reason}")]
    Invalid { path: PathBuf, reason: String },

    /// The registry file extension is neither YAML nor XML.
    #[error("unsupported registry format at {path}; expected .yaml, .yml or .xml")]
    UnsupportedFormat { path: PathBuf },

    /// The registry file did not exist at the expected path.
    #[error("registry not found at {path}")]
    NotFound { path: PathBuf },

    /// A sync was scoped to a calendar the registry does not define.
    #[error("no calendar named '{0}' in the registry")]
    CalendarNotFound(String),

    /// Publishing was requested without account credentials.
    #[error("calendar service credentials are not configured; set CALCONDUIT_ACCOUNT and CALCONDUIT_PASSWORD or add them to settings.yaml")]
    MissingCredentials,

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}
