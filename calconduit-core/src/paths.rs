//! Filesystem layout under `~/.calconduit/`.
//!
//! ```text
//! ~/.calconduit/
//!   calendars.yaml   (registry, mode 0600)
//!   settings.yaml    (service base, credentials, timeouts, mode 0600)
//!   logs/
//!     sync.log       (append-only JSON lines, rotated at 10 MiB)
//! ```

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const REGISTRY_FILE: &str = "calendars.yaml";
pub const SETTINGS_FILE: &str = "settings.yaml";
pub const SYNC_LOG: &str = "sync.log";

pub fn calconduit_root(home: &Path) -> PathBuf {
    home.join(".calconduit")
}

pub fn registry_path(home: &Path) -> PathBuf {
    calconduit_root(home).join(REGISTRY_FILE)
}

pub fn settings_path(home: &Path) -> PathBuf {
    calconduit_root(home).join(SETTINGS_FILE)
}

pub fn logs_dir(home: &Path) -> PathBuf {
    calconduit_root(home).join("logs")
}

pub fn sync_log_path(home: &Path) -> PathBuf {
    logs_dir(home).join(SYNC_LOG)
}

pub fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_rooted_in_dot_calconduit() {
        let home = Path::new("/home/u");
        assert_eq!(registry_path(home), PathBuf::from("/home/u/.calconduit/calendars.yaml"));
        assert_eq!(settings_path(home), PathBuf::from("/home/u/.calconduit/settings.yaml"));
        assert_eq!(sync_log_path(home), PathBuf::from("/home/u/.calconduit/logs/sync.log"));
    }
}
