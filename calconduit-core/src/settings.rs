//! Service settings: endpoint base, credentials, timeouts, schedule.
//!
//! Loaded from `~/.calconduit/settings.yaml` (every key optional), then
//! overridden from the environment:
//!
//! | variable | field |
//! |---|---|
//! | `CALCONDUIT_ACCOUNT` | `account` |
//! | `CALCONDUIT_PASSWORD` | `password` |
//! | `CALCONDUIT_SERVICE_BASE` | `service_base` |

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::paths;

pub const DEFAULT_SERVICE_BASE: &str = "https://www.trumba.com/service";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_PUBLISH_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_INTERVAL_SECS: u64 = 3600;

pub const ENV_ACCOUNT: &str = "CALCONDUIT_ACCOUNT";
pub const ENV_PASSWORD: &str = "CALCONDUIT_PASSWORD";
pub const ENV_SERVICE_BASE: &str = "CALCONDUIT_SERVICE_BASE";

/// Static basic-auth credentials for the calendar service.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub account: String,
    pub password: String,
}

impl Credentials {
    pub fn new(account: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account", &self.account)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub service_base: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub fetch_timeout_secs: u64,
    pub publish_timeout_secs: u64,
    /// Seconds between daemon runs.
    pub interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_base: DEFAULT_SERVICE_BASE.to_string(),
            account: None,
            password: None,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            publish_timeout_secs: DEFAULT_PUBLISH_TIMEOUT_SECS,
            interval_secs: DEFAULT_INTERVAL_SECS,
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("service_base", &self.service_base)
            .field("account", &self.account)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("publish_timeout_secs", &self.publish_timeout_secs)
            .field("interval_secs", &self.interval_secs)
            .finish()
    }
}

impl Settings {
    /// Load `<home>/.calconduit/settings.yaml` and apply process environment overrides.
    ///
    /// A missing file yields defaults; a malformed one is a `ConfigError::Parse`.
    pub fn load_at(home: &Path) -> Result<Self, ConfigError> {
        let mut settings = Self::load_file(&paths::settings_path(home))?;
        settings.apply_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// `load_at` convenience wrapper.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_at(&paths::home()?)
    }

    /// Parse a settings file without touching the environment.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Apply overrides from `lookup` (normally `std::env::var`). Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(account) = get(ENV_ACCOUNT) {
            self.account = Some(account);
        }
        if let Some(password) = get(ENV_PASSWORD) {
            self.password = Some(password);
        }
        if let Some(base) = get(ENV_SERVICE_BASE) {
            self.service_base = base;
        }
    }

    /// Credentials for publishing; both account and password must be set.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        match (&self.account, &self.password) {
            (Some(account), Some(password)) => Ok(Credentials::new(account, password)),
            _ => Err(ConfigError::MissingCredentials),
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_secs(self.publish_timeout_secs.max(1))
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}
