//! `calconduit sync` — fetch and publish calendars once.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use calconduit_sync::{pipeline, Classification, RunOptions, RunReport, SyncResult, SyncScope};

use super::home_dir;

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Webname or display name of the calendar to sync (omit when using `--all`).
    pub calendar: Option<String>,

    /// Sync every registered calendar.
    #[arg(long, conflicts_with = "calendar")]
    pub all: bool,

    /// Fetch feeds and show what would be published without publishing.
    #[arg(long)]
    pub dry_run: bool,

    /// Registry file to read instead of ~/.calconduit/calendars.yaml (.yaml or .xml).
    #[arg(long, value_name = "PATH")]
    pub registry: Option<PathBuf>,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let home = home_dir()?;
        let scope = match (self.all, self.calendar) {
            (true, _) => SyncScope::All,
            (false, Some(name)) => SyncScope::Calendar(name),
            (false, None) => bail!("provide a calendar name or use --all"),
        };
        let options = RunOptions {
            scope,
            dry_run: self.dry_run,
        };

        let report =
            pipeline::run_at(&home, self.registry.as_deref(), &options).context("sync failed")?;
        print_report(&report, self.dry_run);

        if !report.is_clean() {
            bail!(
                "{} calendar(s) failed, {} reported a non-information response",
                report.failed(),
                report.notable()
            );
        }
        Ok(())
    }
}

fn print_report(report: &RunReport, dry_run: bool) {
    if report.results.is_empty() {
        println!("No calendars registered. Run `calconduit init` and edit calendars.yaml.");
        return;
    }

    let prefix = if dry_run { "[dry-run] " } else { "" };
    for result in &report.results {
        println!("{prefix}{} {}", indicator(result), line(result));
    }
    println!(
        "{prefix}{} calendars in {:.1}s: {} ok, {} notable, {} failed",
        report.results.len(),
        report.duration.as_secs_f64(),
        report.information(),
        report.notable(),
        report.failed()
    );
}

fn indicator(result: &SyncResult) -> String {
    match result.classification() {
        Classification::Information => "✓".green().bold().to_string(),
        Classification::DryRun => "~".cyan().bold().to_string(),
        Classification::Notable => "!".yellow().bold().to_string(),
        Classification::Failed => "✗".red().bold().to_string(),
    }
}

fn line(result: &SyncResult) -> String {
    let def = &result.definition;
    format!("'{}' ({}): {}", def.name, def.webname, result.summary())
}
