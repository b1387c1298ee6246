//! Domain types for calendar sync definitions.
//!
//! A [`CalendarSyncDefinition`] is loaded once per run and never mutated.
//! All types are serializable/deserializable via serde + serde_yaml.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Human-readable display name of a calendar (`name` in the registry).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CalendarName(pub String);

impl fmt::Display for CalendarName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for CalendarName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CalendarName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Destination identifier on the calendar service (`webname` in the registry).
///
/// Becomes the `{webname}.ics` path segment of the import endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Webname(pub String);

impl Webname {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `None` when the webname is usable as a single URL path segment,
    /// otherwise a short reason.
    pub fn validate(&self) -> Option<&'static str> {
        if self.0.is_empty() {
            return Some("webname must not be empty");
        }
        if self
            .0
            .chars()
            .any(|c| matches!(c, '/' | '?' | '#') || c.is_whitespace())
        {
            return Some("webname must not contain '/', '?', '#' or whitespace");
        }
        None
    }
}

impl fmt::Display for Webname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Webname {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Webname {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Delta flag
// ---------------------------------------------------------------------------

/// Parse a textual delta flag. Accepts `true` / `false` in any case,
/// surrounding whitespace ignored.
pub fn parse_delta(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Render the delta flag exactly as the import endpoint expects it.
pub fn delta_query_value(delta: bool) -> &'static str {
    if delta {
        "true"
    } else {
        "false"
    }
}

fn deserialize_delta<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDelta {
        Bool(bool),
        Text(String),
    }

    match RawDelta::deserialize(deserializer)? {
        RawDelta::Bool(b) => Ok(b),
        RawDelta::Text(s) => parse_delta(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid delta value '{s}'; expected true or false"
            ))
        }),
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// One calendar to pull from `url` and publish to `webname`.
///
/// `delta = false`: the payload is the full authoritative feed and the service
/// deletes events absent from it. `delta = true`: the payload is incremental and
/// only events carrying an explicit `CANCEL` method are deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarSyncDefinition {
    pub name: CalendarName,
    pub url: String,
    #[serde(deserialize_with = "deserialize_delta")]
    pub delta: bool,
    pub webname: Webname,
}

impl CalendarSyncDefinition {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        delta: bool,
        webname: impl Into<String>,
    ) -> Self {
        Self {
            name: CalendarName(name.into()),
            url: url.into(),
            delta,
            webname: Webname(webname.into()),
        }
    }

    /// True when `selector` names this calendar by webname or display name.
    pub fn matches(&self, selector: &str) -> bool {
        self.webname.0 == selector || self.name.0 == selector
    }
}

/// Root of the YAML registry file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RegistryFile {
    #[serde(default)]
    pub calendars: Vec<CalendarSyncDefinition>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newtype_display() {
        assert_eq!(CalendarName::from("Seminars").to_string(), "Seminars");
        assert_eq!(Webname::from("uw_seminars").to_string(), "uw_seminars");
    }

    #[test]
    fn parse_delta_accepts_case_and_whitespace() {
        assert_eq!(parse_delta("true"), Some(true));
        assert_eq!(parse_delta(" FALSE\n"), Some(false));
        assert_eq!(parse_delta("True"), Some(true));
        assert_eq!(parse_delta("yes"), None);
        assert_eq!(parse_delta(""), None);
    }

    #[test]
    fn delta_query_value_is_never_inverted() {
        assert_eq!(delta_query_value(true), "true");
        assert_eq!(delta_query_value(false), "false");
    }

    #[test]
    fn definition_accepts_string_delta() {
        let yaml = "name: Seminars\nurl: https://src/cal.ics\ndelta: \"false\"\nwebname: uw_seminars\n";
        let def: CalendarSyncDefinition = serde_yaml::from_str(yaml).expect("parse");
        assert!(!def.delta);
        assert_eq!(def.webname, Webname::from("uw_seminars"));
    }

    #[test]
    fn definition_accepts_bool_delta() {
        let yaml = "name: Talks\nurl: https://src/talks.ics\ndelta: true\nwebname: talks\n";
        let def: CalendarSyncDefinition = serde_yaml::from_str(yaml).expect("parse");
        assert!(def.delta);
    }

    #[test]
    fn definition_rejects_unknown_delta_text() {
        let yaml = "name: Talks\nurl: https://src/talks.ics\ndelta: maybe\nwebname: talks\n";
        let err = serde_yaml::from_str::<CalendarSyncDefinition>(yaml).unwrap_err();
        assert!(err.to_string().contains("invalid delta value"));
    }

    #[test]
    fn webname_validation() {
        assert!(Webname::from("uw_seminars").validate().is_none());
        assert!(Webname::from("").validate().is_some());
        assert!(Webname::from("a/b").validate().is_some());
        assert!(Webname::from("a b").validate().is_some());
        assert!(Webname::from("a?delta=true").validate().is_some());
    }

    #[test]
    fn matches_by_webname_or_name() {
        let def = CalendarSyncDefinition::new("Seminars", "https://src/cal.ics", false, "uw_seminars");
        assert!(def.matches("uw_seminars"));
        assert!(def.matches("Seminars"));
        assert!(!def.matches("seminars"));
    }
}
