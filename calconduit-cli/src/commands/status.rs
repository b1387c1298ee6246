//! `calconduit status` — latest sync result per calendar, from sync.log.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use calconduit_core::paths;
use calconduit_sync::{read_records, Classification, SyncRecord};

use super::home_dir;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct StatusJson<'a> {
    attempts: usize,
    calendars: Vec<&'a SyncRecord>,
}

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "calendar")]
    name: String,
    #[tabled(rename = "webname")]
    webname: String,
    #[tabled(rename = "result")]
    result: String,
    #[tabled(rename = "detail")]
    detail: String,
    #[tabled(rename = "last attempt")]
    age: String,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let home = home_dir()?;
        let log_path = paths::sync_log_path(&home);
        let records = read_records(&log_path)
            .with_context(|| format!("failed to read {}", log_path.display()))?;
        let latest = latest_per_calendar(&records);

        if self.json {
            let payload = StatusJson {
                attempts: records.len(),
                calendars: latest,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
            );
            return Ok(());
        }

        if latest.is_empty() {
            println!("No sync attempts recorded yet. Run `calconduit sync --all`.");
            return Ok(());
        }

        let now = Utc::now();
        let needs_attention = latest
            .iter()
            .filter(|r| r.classification.is_prominent())
            .count();
        println!(
            "calconduit v{} | {} calendars | {} need attention",
            env!("CARGO_PKG_VERSION"),
            latest.len(),
            needs_attention
        );
        let rows: Vec<StatusRow> = latest
            .into_iter()
            .map(|r| StatusRow {
                name: r.name.clone(),
                webname: r.webname.clone(),
                result: label(r.classification),
                detail: detail(r),
                age: format_age(r.timestamp, now),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}

/// Last record for each webname, ordered by first appearance.
fn latest_per_calendar(records: &[SyncRecord]) -> Vec<&SyncRecord> {
    let mut index = HashMap::<&str, usize>::new();
    let mut latest: Vec<&SyncRecord> = Vec::new();
    for record in records {
        match index.get(record.webname.as_str()) {
            Some(&i) => latest[i] = record,
            None => {
                index.insert(record.webname.as_str(), latest.len());
                latest.push(record);
            }
        }
    }
    latest
}

fn label(class: Classification) -> String {
    match class {
        Classification::Information => "OK".green().bold().to_string(),
        Classification::DryRun => "DRY RUN".cyan().to_string(),
        Classification::Notable => "NOTABLE".yellow().bold().to_string(),
        Classification::Failed => "FAILED".red().bold().to_string(),
    }
}

fn detail(record: &SyncRecord) -> String {
    if let Some(error) = &record.error {
        return error.clone();
    }
    match (&record.level, &record.code, &record.description) {
        (Some(level), Some(code), Some(description)) => format!("{level} {code}: {description}"),
        _ => record.endpoint.clone().unwrap_or_default(),
    }
}

fn format_age(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - at).num_seconds().max(0);
    match secs {
        0..=59 => format!("{secs}s ago"),
        60..=3599 => format!("{}m ago", secs / 60),
        3600..=86_399 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86_400),
    }
}
