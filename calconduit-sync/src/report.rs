//! Per-calendar sync results and the serialized log record.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use calconduit_core::CalendarSyncDefinition;

use crate::error::{FetchError, PublishError};
use crate::fetcher::FeedPayload;
use crate::response::PublishOutcome;

/// How a sync attempt is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Published; the service answered with level `Information`.
    Information,
    /// Published, but the service answered with any other level.
    Notable,
    /// Fetch, transport or response-parse failure.
    Failed,
    /// Fetched only; nothing was published.
    DryRun,
}

impl Classification {
    /// Notable and failed attempts are logged at error level.
    pub fn is_prominent(self) -> bool {
        matches!(self, Classification::Notable | Classification::Failed)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Classification::Information => "information",
            Classification::Notable => "notable",
            Classification::Failed => "failed",
            Classification::DryRun => "dry-run",
        };
        f.write_str(s)
    }
}

/// Size of the fetched payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadStats {
    pub bytes: usize,
    pub events: usize,
}

impl PayloadStats {
    pub fn of(payload: &FeedPayload) -> Self {
        Self {
            bytes: payload.len(),
            events: payload.event_count(),
        }
    }
}

#[derive(Debug)]
pub enum SyncOutcome {
    Published(PublishOutcome),
    DryRun { endpoint: String },
    FetchFailed(FetchError),
    PublishFailed(PublishError),
}

/// Outcome of syncing a single calendar definition.
#[derive(Debug)]
pub struct SyncResult {
    pub definition: CalendarSyncDefinition,
    pub timestamp: DateTime<Utc>,
    pub payload: Option<PayloadStats>,
    pub outcome: SyncOutcome,
}

impl SyncResult {
    pub fn classification(&self) -> Classification {
        match &self.outcome {
            SyncOutcome::Published(outcome) if outcome.is_information() => {
                Classification::Information
            }
            SyncOutcome::Published(_) => Classification::Notable,
            SyncOutcome::DryRun { .. } => Classification::DryRun,
            SyncOutcome::FetchFailed(_) | SyncOutcome::PublishFailed(_) => Classification::Failed,
        }
    }

    /// One-line human summary used by the CLI.
    pub fn summary(&self) -> String {
        match &self.outcome {
            SyncOutcome::Published(o) => {
                format!("HTTP {} {} {}: {}", o.status, o.level, o.code, o.description)
            }
            SyncOutcome::DryRun { endpoint } => {
                let bytes = self.payload.map(|p| p.bytes).unwrap_or_default();
                format!("would PUT {bytes} bytes to {endpoint}")
            }
            SyncOutcome::FetchFailed(err) => err.to_string(),
            SyncOutcome::PublishFailed(err) => err.to_string(),
        }
    }

    pub fn to_record(&self) -> SyncRecord {
        let def = &self.definition;
        let mut record = SyncRecord {
            timestamp: self.timestamp,
            name: def.name.0.clone(),
            webname: def.webname.0.clone(),
            url: def.url.clone(),
            delta: def.delta,
            classification: self.classification(),
            bytes: self.payload.map(|p| p.bytes),
            events: self.payload.map(|p| p.events),
            status: None,
            code: None,
            description: None,
            level: None,
            endpoint: None,
            error: None,
        };
        match &self.outcome {
            SyncOutcome::Published(o) => {
                record.status = Some(o.status);
                record.code = Some(o.code.clone());
                record.description = Some(o.description.clone());
                record.level = Some(o.level.clone());
            }
            SyncOutcome::DryRun { endpoint } => record.endpoint = Some(endpoint.clone()),
            SyncOutcome::FetchFailed(err) => record.error = Some(err.to_string()),
            SyncOutcome::PublishFailed(err) => {
                if let PublishError::ResponseParse(parse) = err {
                    record.status = Some(parse.status);
                }
                record.error = Some(err.to_string());
            }
        }
        record
    }
}

/// One line of the append-only sync log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRecord {
    pub timestamp: DateTime<Utc>,
    pub name: String,
    pub webname: String,
    pub url: String,
    pub delta: bool,
    pub classification: Classification,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything one pipeline run produced, in registry order.
#[derive(Debug)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub results: Vec<SyncResult>,
}

impl RunReport {
    fn count(&self, class: Classification) -> usize {
        self.results
            .iter()
            .filter(|r| r.classification() == class)
            .count()
    }

    pub fn information(&self) -> usize {
        self.count(Classification::Information)
    }

    pub fn notable(&self) -> usize {
        self.count(Classification::Notable)
    }

    pub fn failed(&self) -> usize {
        self.count(Classification::Failed)
    }

    /// No calendar failed and none produced a non-information response.
    pub fn is_clean(&self) -> bool {
        self.results.iter().all(|r| !r.classification().is_prominent())
    }
}
