//! Shared sync pipeline entrypoint used by CLI and daemon.
//!
//! For each definition, in registry order and one at a time:
//! fetch → publish → classify → log. A failure for one calendar is recorded
//! and the run moves on; only an unreadable registry aborts the run.

use std::path::Path;
use std::time::Instant;

use chrono::Utc;

use calconduit_core::{
    CalendarRegistry, CalendarSyncDefinition, ConfigError, Credentials, FileRegistry, Settings,
};

use crate::fetcher::{FeedFetcher, HttpFeedFetcher};
use crate::publisher::{CalendarPublisher, HttpCalendarPublisher};
use crate::report::{Classification, PayloadStats, RunReport, SyncOutcome, SyncResult};
use crate::sync_log::{JsonlSyncLog, SyncLog};

/// Scope for a sync pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncScope {
    /// Sync every registered calendar.
    #[default]
    All,
    /// Sync the calendar whose webname or display name matches.
    Calendar(String),
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub scope: SyncScope,
    /// Fetch feeds but do not publish them.
    pub dry_run: bool,
}

/// Run the sync pipeline.
///
/// Emits exactly one record to `log` per selected definition. A failure
/// writing the log is reported via tracing and does not stop the run.
pub fn run<R, F, P, L>(
    registry: &R,
    fetcher: &F,
    publisher: &P,
    log: &mut L,
    options: &RunOptions,
) -> Result<RunReport, ConfigError>
where
    R: CalendarRegistry + ?Sized,
    F: FeedFetcher + ?Sized,
    P: CalendarPublisher + ?Sized,
    L: SyncLog + ?Sized,
{
    let started_at = Utc::now();
    let clock = Instant::now();
    let definitions = select(registry.list_definitions()?, &options.scope)?;

    tracing::info!(
        calendars = definitions.len(),
        dry_run = options.dry_run,
        "sync run started"
    );

    let mut results = Vec::with_capacity(definitions.len());
    for definition in definitions {
        let result = sync_one(definition, fetcher, publisher, options.dry_run);
        emit(&result);
        if let Err(err) = log.record(&result.to_record()) {
            tracing::error!(
                calendar = %result.definition.name,
                error = %err,
                "failed to write sync log record"
            );
        }
        results.push(result);
    }

    let report = RunReport {
        started_at,
        duration: clock.elapsed(),
        results,
    };
    tracing::info!(
        information = report.information(),
        notable = report.notable(),
        failed = report.failed(),
        duration_ms = report.duration.as_millis() as u64,
        "sync run finished"
    );
    Ok(report)
}

/// Run against the file-backed registry and settings under `home`.
///
/// `registry` overrides `<home>/.calconduit/calendars.yaml`. Records go to
/// `<home>/.calconduit/logs/sync.log`. Credentials are required unless
/// `options.dry_run` is set.
pub fn run_at(
    home: &Path,
    registry: Option<&Path>,
    options: &RunOptions,
) -> Result<RunReport, ConfigError> {
    let settings = Settings::load_at(home)?;
    let credentials = match settings.credentials() {
        Ok(credentials) => credentials,
        Err(ConfigError::MissingCredentials) if options.dry_run => Credentials::new("", ""),
        Err(err) => return Err(err),
    };

    let registry = match registry {
        Some(path) => FileRegistry::new(path),
        None => FileRegistry::at_home(home),
    };
    let fetcher = HttpFeedFetcher::from_settings(&settings);
    let publisher = HttpCalendarPublisher::new(
        settings.service_base.clone(),
        credentials,
        settings.publish_timeout(),
    );
    let mut log = JsonlSyncLog::at_home(home);
    run(&registry, &fetcher, &publisher, &mut log, options)
}

fn select(
    definitions: Vec<CalendarSyncDefinition>,
    scope: &SyncScope,
) -> Result<Vec<CalendarSyncDefinition>, ConfigError> {
    match scope {
        SyncScope::All => Ok(definitions),
        SyncScope::Calendar(selector) => {
            let selected: Vec<_> = definitions
                .into_iter()
                .filter(|d| d.matches(selector))
                .collect();
            if selected.is_empty() {
                return Err(ConfigError::CalendarNotFound(selector.clone()));
            }
            Ok(selected)
        }
    }
}

fn sync_one<F, P>(
    definition: CalendarSyncDefinition,
    fetcher: &F,
    publisher: &P,
    dry_run: bool,
) -> SyncResult
where
    F: FeedFetcher + ?Sized,
    P: CalendarPublisher + ?Sized,
{
    let payload = match fetcher.fetch(&definition.url) {
        Ok(payload) => payload,
        Err(err) => {
            return SyncResult {
                definition,
                timestamp: Utc::now(),
                payload: None,
                outcome: SyncOutcome::FetchFailed(err),
            }
        }
    };
    let stats = PayloadStats::of(&payload);

    let outcome = if dry_run {
        SyncOutcome::DryRun {
            endpoint: publisher.endpoint(&definition.webname, definition.delta),
        }
    } else {
        match publisher.publish(&definition.webname, definition.delta, &payload) {
            Ok(outcome) => SyncOutcome::Published(outcome),
            Err(err) => SyncOutcome::PublishFailed(err),
        }
    };

    SyncResult {
        definition,
        timestamp: Utc::now(),
        payload: Some(stats),
        outcome,
    }
}

fn emit(result: &SyncResult) {
    let def = &result.definition;
    match (&result.outcome, result.classification()) {
        (SyncOutcome::Published(o), Classification::Information) => tracing::info!(
            calendar = %def.name,
            webname = %def.webname,
            delta = def.delta,
            status = o.status,
            code = %o.code,
            level = %o.level,
            "calendar published"
        ),
        (SyncOutcome::Published(o), _) => tracing::error!(
            calendar = %def.name,
            webname = %def.webname,
            delta = def.delta,
            status = o.status,
            code = %o.code,
            level = %o.level,
            description = %o.description,
            "calendar service reported a non-information response"
        ),
        (SyncOutcome::DryRun { endpoint }, _) => tracing::info!(
            calendar = %def.name,
            %endpoint,
            bytes = result.payload.map(|p| p.bytes).unwrap_or_default(),
            "[dry-run] would publish"
        ),
        (SyncOutcome::FetchFailed(err), _) => tracing::error!(
            calendar = %def.name,
            url = %def.url,
            error = %err,
            "feed fetch failed"
        ),
        (SyncOutcome::PublishFailed(err), _) => tracing::error!(
            calendar = %def.name,
            webname = %def.webname,
            error = %err,
            "calendar publish failed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use calconduit_core::StaticRegistry;

    use super::*;
    use crate::fakes::{FakeFeed, FakeFetcher, FakePublisher, FakeResponse};
    use crate::sync_log::MemorySyncLog;

    fn defs() -> Vec<CalendarSyncDefinition> {
        vec![
            CalendarSyncDefinition::new("A", "https://src/a.ics", false, "a"),
            CalendarSyncDefinition::new("B", "https://src/b.ics", true, "b"),
        ]
    }

    #[test]
    fn empty_registry_returns_empty_report() {
        let mut log = MemorySyncLog::new();
        let report = run(
            &StaticRegistry::default(),
            &FakeFetcher::new(),
            &FakePublisher::new(),
            &mut log,
            &RunOptions::default(),
        )
        .expect("run");
        assert!(report.results.is_empty());
        assert!(log.records.is_empty());
        assert!(report.is_clean());
    }

    #[test]
    fn scoped_run_selects_by_webname_or_name() {
        let fetcher = FakeFetcher::new()
            .with_feed("https://src/a.ics", FakeFeed::calendar(1))
            .with_feed("https://src/b.ics", FakeFeed::calendar(1));
        let publisher = FakePublisher::new();
        let mut log = MemorySyncLog::new();
        let registry = StaticRegistry::new(defs());

        let options = RunOptions {
            scope: SyncScope::Calendar("B".into()),
            dry_run: false,
        };
        let report = run(&registry, &fetcher, &publisher, &mut log, &options).expect("run");
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].definition.webname.as_str(), "b");
        assert_eq!(publisher.calls().len(), 1);
    }

    #[test]
    fn unknown_scope_is_config_error() {
        let mut log = MemorySyncLog::new();
        let options = RunOptions {
            scope: SyncScope::Calendar("nope".into()),
            dry_run: false,
        };
        let err = run(
            &StaticRegistry::new(defs()),
            &FakeFetcher::new(),
            &FakePublisher::new(),
            &mut log,
            &options,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::CalendarNotFound(name) if name == "nope"));
        assert!(log.records.is_empty());
    }

    #[test]
    fn dry_run_fetches_but_never_publishes() {
        let fetcher = FakeFetcher::new()
            .with_feed("https://src/a.ics", FakeFeed::calendar(2))
            .with_feed("https://src/b.ics", FakeFeed::calendar(0));
        let publisher = FakePublisher::new();
        let mut log = MemorySyncLog::new();
        let options = RunOptions {
            scope: SyncScope::All,
            dry_run: true,
        };

        let report =
            run(&StaticRegistry::new(defs()), &fetcher, &publisher, &mut log, &options).expect("run");
        assert!(publisher.calls().is_empty());
        assert_eq!(fetcher.calls().len(), 2);
        assert!(report
            .results
            .iter()
            .all(|r| r.classification() == Classification::DryRun));
        assert_eq!(
            log.records[1].endpoint.as_deref(),
            Some("https://calendar.test/service/b.ics?delta=true")
        );
        assert_eq!(log.records[0].events, Some(2));
    }

    #[test]
    fn registry_failure_aborts_before_any_record() {
        struct Broken;
        impl CalendarRegistry for Broken {
            fn list_definitions(&self) -> Result<Vec<CalendarSyncDefinition>, ConfigError> {
                Err(ConfigError::NotFound {
                    path: "/nowhere/calendars.yaml".into(),
                })
            }
        }
        let mut log = MemorySyncLog::new();
        let fetcher = FakeFetcher::new();
        let err = run(
            &Broken,
            &fetcher,
            &FakePublisher::new(),
            &mut log,
            &RunOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
        assert!(fetcher.calls().is_empty());
        assert!(log.records.is_empty());
    }

    #[test]
    fn log_sink_failure_does_not_stop_run() {
        struct FailingLog(usize);
        impl SyncLog for FailingLog {
            fn record(
                &mut self,
                _record: &crate::report::SyncRecord,
            ) -> Result<(), crate::error::SyncError> {
                self.0 += 1;
                Err(crate::error::SyncError::Io {
                    path: "/read-only/sync.log".into(),
                    source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
                })
            }
        }

        let fetcher = FakeFetcher::new()
            .with_feed("https://src/a.ics", FakeFeed::calendar(1))
            .with_feed("https://src/b.ics", FakeFeed::calendar(1));
        let publisher = FakePublisher::new().with_response("a", FakeResponse::level("Warning"));
        let mut log = FailingLog(0);
        let report = run(
            &StaticRegistry::new(defs()),
            &fetcher,
            &publisher,
            &mut log,
            &RunOptions::default(),
        )
        .expect("run");
        assert_eq!(log.0, 2);
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.notable(), 1);
        assert_eq!(report.information(), 1);
    }
}
