//! Calendar registry: the ordered list of sync definitions.
//!
//! # Storage layout
//!
//! ```text
//! ~/.calconduit/
//!   calendars.yaml   (default registry, mode 0600)
//! ```
//!
//! A registry may also be a legacy XML file:
//!
//! ```xml
//! <Calendars>
//!   <Calendar>
//!     <name>Seminars</name>
//!     <url>https://example.edu/seminars.ics</url>
//!     <delta>false</delta>
//!     <webname>uw_seminars</webname>
//!   </Calendar>
//! </Calendars>
//! ```
//!
//! # API pattern
//!
//! Path-deriving functions have two forms:
//! - `fn_at(home: &Path, …)` — explicit home; used in tests with `TempDir`
//! - `fn(…)` — derives home from `dirs::home_dir()`, delegates to `_at`

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::paths;
use crate::types::{parse_delta, CalendarName, CalendarSyncDefinition, RegistryFile, Webname};

// ---------------------------------------------------------------------------
// 1. Registry contract
// ---------------------------------------------------------------------------

/// Supplies calendar definitions in sync order.
///
/// The order must be stable across calls.
pub trait CalendarRegistry {
    fn list_definitions(&self) -> Result<Vec<CalendarSyncDefinition>, ConfigError>;
}

/// Registry backed by a YAML or XML file, re-read on every call.
#[derive(Debug, Clone)]
pub struct FileRegistry {
    path: PathBuf,
}

impl FileRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<home>/.calconduit/calendars.yaml`
    pub fn at_home(home: &Path) -> Self {
        Self::new(paths::registry_path(home))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CalendarRegistry for FileRegistry {
    fn list_definitions(&self) -> Result<Vec<CalendarSyncDefinition>, ConfigError> {
        load_definitions(&self.path)
    }
}

/// In-memory registry.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    definitions: Vec<CalendarSyncDefinition>,
}

impl StaticRegistry {
    pub fn new(definitions: Vec<CalendarSyncDefinition>) -> Self {
        Self { definitions }
    }
}

impl CalendarRegistry for StaticRegistry {
    fn list_definitions(&self) -> Result<Vec<CalendarSyncDefinition>, ConfigError> {
        Ok(self.definitions.clone())
    }
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load and validate definitions from `path`, dispatching on file extension.
///
/// Returns `ConfigError::NotFound` if absent, `Parse` / `Xml` (with path) if
/// malformed, `MissingField` / `Invalid` if an entry is unusable.
pub fn load_definitions(path: &Path) -> Result<Vec<CalendarSyncDefinition>, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let contents = std::fs::read_to_string(path)?;
    let definitions = match ext.as_deref() {
        Some("yaml") | Some("yml") => parse_yaml(path, &contents)?,
        Some("xml") => parse_xml(path, &contents)?,
        _ => {
            return Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
    };
    validate(path, &definitions)?;
    Ok(definitions)
}

/// Load `<home>/.calconduit/calendars.yaml`.
pub fn load_definitions_at(home: &Path) -> Result<Vec<CalendarSyncDefinition>, ConfigError> {
    load_definitions(&paths::registry_path(home))
}

/// `load_definitions_at` convenience wrapper.
pub fn list_definitions() -> Result<Vec<CalendarSyncDefinition>, ConfigError> {
    load_definitions_at(&paths::home()?)
}

fn parse_yaml(path: &Path, contents: &str) -> Result<Vec<CalendarSyncDefinition>, ConfigError> {
    if contents.trim().is_empty() {
        return Ok(vec![]);
    }
    let file: RegistryFile = serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(file.calendars)
}

fn parse_xml(path: &Path, contents: &str) -> Result<Vec<CalendarSyncDefinition>, ConfigError> {
    let doc = roxmltree::Document::parse(contents).map_err(|e| ConfigError::Xml {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut definitions = Vec::new();
    let calendars = doc
        .root_element()
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "Calendar");

    for (i, node) in calendars.enumerate() {
        let index = i + 1;
        let field = |name: &'static str| -> Result<String, ConfigError> {
            node.children()
                .find(|c| c.is_element() && c.tag_name().name() == name)
                .map(|c| c.text().unwrap_or("").trim().to_string())
                .ok_or_else(|| ConfigError::MissingField {
                    path: path.to_path_buf(),
                    index,
                    field: name,
                })
        };

        let raw_delta = field("delta")?;
        let delta = parse_delta(&raw_delta).ok_or_else(|| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason: format!(
                "calendar #{index} has invalid delta '{raw_delta}'; expected true or false"
            ),
        })?;

        definitions.push(CalendarSyncDefinition {
            name: CalendarName(field("name")?),
            url: field("url")?,
            delta,
            webname: Webname(field("webname")?),
        });
    }
    Ok(definitions)
}

fn validate(path: &Path, definitions: &[CalendarSyncDefinition]) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        path: path.to_path_buf(),
        reason,
    };

    let mut seen = HashSet::new();
    for (i, def) in definitions.iter().enumerate() {
        let index = i + 1;
        if def.name.0.trim().is_empty() {
            return Err(invalid(format!("calendar #{index} has an empty name")));
        }
        if def.url.trim().is_empty() {
            return Err(invalid(format!("calendar '{}' has an empty url", def.name)));
        }
        if let Some(reason) = def.webname.validate() {
            return Err(invalid(format!("calendar '{}': {reason}", def.name)));
        }
        if !seen.insert(def.webname.0.as_str()) {
            return Err(invalid(format!(
                "webname '{}' is used by more than one calendar",
                def.webname
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// 3. Init
// ---------------------------------------------------------------------------

const REGISTRY_TEMPLATE: &str = "\
# calconduit calendar registry
#
# Each entry pulls `url` and publishes it to the calendar service as `webname`.
#   delta: false  full feed; events missing from the feed are deleted
#   delta: true   incremental; only events sent with METHOD:CANCEL are deleted
calendars: []
#  - name: Seminars
#    url: https://example.edu/seminars.ics
#    delta: false
#    webname: uw_seminars
";

const SETTINGS_TEMPLATE: &str = "\
# calconduit settings (every key is optional)
#
# service_base: https://www.trumba.com/service
# account: events@example.edu        # or CALCONDUIT_ACCOUNT
# password: ...                      # or CALCONDUIT_PASSWORD
# fetch_timeout_secs: 60
# publish_timeout_secs: 120
# interval_secs: 3600
";

/// Files touched by [`init_at`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InitReport {
    pub created: Vec<PathBuf>,
    pub existing: Vec<PathBuf>,
}

/// Scaffold `<home>/.calconduit/` with an example registry and settings file.
///
/// Idempotent: existing files are left unchanged.
pub fn init_at(home: &Path) -> Result<InitReport, ConfigError> {
    let root = paths::calconduit_root(home);
    if !root.exists() {
        std::fs::create_dir_all(&root)?;
        set_dir_permissions(&root)?;
    }

    let mut report = InitReport::default();
    for (path, template) in [
        (paths::registry_path(home), REGISTRY_TEMPLATE),
        (paths::settings_path(home), SETTINGS_TEMPLATE),
    ] {
        if path.exists() {
            report.existing.push(path);
        } else {
            write_atomic(&path, template)?;
            report.created.push(path);
        }
    }
    Ok(report)
}

/// `init_at` convenience wrapper.
pub fn init() -> Result<InitReport, ConfigError> {
    init_at(&paths::home()?)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn write_atomic(path: &Path, contents: &str) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "registry".to_string());
    let tmp_path = path.with_file_name(format!("{file_name}.tmp"));

    std::fs::write(&tmp_path, contents)?;
    set_file_permissions(&tmp_path)?;
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(())
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
