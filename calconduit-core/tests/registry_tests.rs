//! Registry loading, error-message, legacy XML and init integration tests.

use assert_fs::prelude::*;
use calconduit_core::{
    paths, registry,
    registry::{CalendarRegistry, FileRegistry},
    CalendarSyncDefinition, ConfigError,
};
use predicates::prelude::predicate;
use rstest::rstest;
use std::fs;

const YAML_REGISTRY: &str = "\
calendars:
  - name: Seminars
    url: https://src/cal.ics
    delta: \"false\"
    webname: uw_seminars
  - name: Athletics
    url: https://src/athletics.ics
    delta: true
    webname: uw_athletics
  - name: Arts
    url: webcal://src/arts.ics
    delta: false
    webname: uw_arts
";

const XML_REGISTRY: &str = "\
<?xml version=\"1.0\" encoding=\"utf-8\"?>
<Calendars>
  <Calendar>
    <name>Seminars</name>
    <url>https://src/cal.ics</url>
    <delta>false</delta>
    <webname>uw_seminars</webname>
  </Calendar>
  <Calendar>
    <name>Athletics</name>
    <url>https://src/athletics.ics</url>
    <delta>True</delta>
    <webname>uw_athletics</webname>
  </Calendar>
  <Calendar>
    <name> Arts </name>
    <url>webcal://src/arts.ics</url>
    <delta> false </delta>
    <webname>uw_arts</webname>
  </Calendar>
</Calendars>
";

fn expected() -> Vec<CalendarSyncDefinition> {
    vec![
        CalendarSyncDefinition::new("Seminars", "https://src/cal.ics", false, "uw_seminars"),
        CalendarSyncDefinition::new("Athletics", "https://src/athletics.ics", true, "uw_athletics"),
        CalendarSyncDefinition::new("Arts", "webcal://src/arts.ics", false, "uw_arts"),
    ]
}

// ---------------------------------------------------------------------------
// 1. Formats and ordering
// ---------------------------------------------------------------------------

#[test]
fn yaml_registry_preserves_file_order() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("calendars.yaml");
    file.write_str(YAML_REGISTRY).expect("write");

    let defs = registry::load_definitions(file.path()).expect("load");
    assert_eq!(defs, expected());
}

#[test]
fn legacy_xml_registry_matches_yaml() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("CalendarURLs.xml");
    file.write_str(XML_REGISTRY).expect("write");

    let defs = registry::load_definitions(file.path()).expect("load");
    assert_eq!(defs, expected());
}

#[test]
fn file_registry_is_stable_across_calls() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("calendars.yml");
    file.write_str(YAML_REGISTRY).expect("write");

    let registry = FileRegistry::new(file.path());
    let first = registry.list_definitions().expect("first");
    let second = registry.list_definitions().expect("second");
    assert_eq!(first, second);
}

#[rstest]
#[case("true", true)]
#[case("false", false)]
#[case("TRUE", true)]
#[case("False", false)]
#[case("  true\n", true)]
fn xml_delta_text_is_parsed_verbatim(#[case] raw: &str, #[case] want: bool) {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("calendars.xml");
    file.write_str(&format!(
        "<Calendars><Calendar><name>A</name><url>https://src/a.ics</url>\
         <delta>{raw}</delta><webname>a</webname></Calendar></Calendars>"
    ))
    .expect("write");

    let defs = registry::load_definitions(file.path()).expect("load");
    assert_eq!(defs[0].delta, want);
}

// ---------------------------------------------------------------------------
// 2. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn missing_registry_names_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let err = registry::load_definitions_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("registry not found"));
    assert!(err.to_string().contains("calendars.yaml"));
}

#[test]
fn corrupt_yaml_returns_parse_error_with_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("calendars.yaml");
    file.write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed").expect("write");

    let err = registry::load_definitions(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("calendars.yaml"));
}

#[test]
fn yaml_entry_missing_webname_is_parse_error() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("calendars.yaml");
    file.write_str("calendars:\n  - name: A\n    url: https://src/a.ics\n    delta: false\n")
        .expect("write");

    let err = registry::load_definitions(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("webname"), "got: {err}");
}

#[test]
fn xml_entry_missing_field_names_index_and_field() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("calendars.xml");
    file.write_str(
        "<Calendars>\
           <Calendar><name>A</name><url>https://a</url><delta>true</delta><webname>a</webname></Calendar>\
           <Calendar><name>B</name><delta>true</delta><webname>b</webname></Calendar>\
         </Calendars>",
    )
    .expect("write");

    let err = registry::load_definitions(file.path()).unwrap_err();
    match &err {
        ConfigError::MissingField { index, field, .. } => {
            assert_eq!(*index, 2);
            assert_eq!(*field, "url");
        }
        other => panic!("expected MissingField, got: {other}"),
    }
}

#[test]
fn xml_invalid_delta_is_rejected() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("calendars.xml");
    file.write_str(
        "<Calendars><Calendar><name>A</name><url>https://a</url>\
         <delta>sometimes</delta><webname>a</webname></Calendar></Calendars>",
    )
    .expect("write");

    let err = registry::load_definitions(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { .. }), "got: {err}");
    assert!(err.to_string().contains("sometimes"));
}

#[test]
fn malformed_xml_is_xml_error() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("calendars.xml");
    file.write_str("<Calendars><Calendar>").expect("write");

    let err = registry::load_definitions(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Xml { .. }), "got: {err}");
}

#[test]
fn webname_with_path_separator_is_rejected() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("calendars.yaml");
    file.write_str(
        "calendars:\n  - name: A\n    url: https://src/a.ics\n    delta: false\n    webname: a/b\n",
    )
    .expect("write");

    let err = registry::load_definitions(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { .. }), "got: {err}");
}

// ---------------------------------------------------------------------------
// 3. Init
// ---------------------------------------------------------------------------

#[test]
fn init_scaffolds_registry_and_settings() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let report = registry::init_at(home.path()).expect("init");
    assert_eq!(report.created.len(), 2);

    home.child(".calconduit/calendars.yaml").assert(predicate::path::exists());
    home.child(".calconduit/settings.yaml").assert(predicate::path::exists());
    home.child(".calconduit/calendars.yaml")
        .assert(predicate::str::contains("delta: false"));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let path = paths::registry_path(home.path());
        let mode = fs::metadata(&path).expect("meta").permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "expected 0600, got {mode:o}");
    }
}

#[test]
fn init_does_not_overwrite_existing_registry() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let path = paths::registry_path(home.path());
    fs::create_dir_all(path.parent().unwrap()).expect("mkdir");
    fs::write(&path, YAML_REGISTRY).expect("write");

    let report = registry::init_at(home.path()).expect("init");
    assert!(report.existing.contains(&path));
    assert_eq!(registry::load_definitions_at(home.path()).expect("load"), expected());
}
