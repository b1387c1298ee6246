//! `calconduit calendars` — list registered calendars.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use calconduit_core::{CalendarRegistry, FileRegistry, Settings};
use calconduit_sync::import_endpoint;

use super::home_dir;

#[derive(Args, Debug)]
pub struct CalendarsArgs {
    /// Registry file to read instead of ~/.calconduit/calendars.yaml (.yaml or .xml).
    #[arg(long, value_name = "PATH")]
    pub registry: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct CalendarJson {
    name: String,
    webname: String,
    url: String,
    delta: bool,
    endpoint: String,
}

#[derive(Tabled)]
struct CalendarRow {
    #[tabled(rename = "calendar")]
    name: String,
    #[tabled(rename = "webname")]
    webname: String,
    #[tabled(rename = "delta")]
    delta: bool,
    #[tabled(rename = "source")]
    url: String,
}

impl CalendarsArgs {
    pub fn run(self) -> Result<()> {
        let home = home_dir()?;
        let settings = Settings::load_at(&home).context("failed to load settings")?;
        let registry = match &self.registry {
            Some(path) => FileRegistry::new(path),
            None => FileRegistry::at_home(&home),
        };
        let definitions = registry
            .list_definitions()
            .with_context(|| format!("failed to load {}", registry.path().display()))?;

        if self.json {
            let payload: Vec<CalendarJson> = definitions
                .iter()
                .map(|d| CalendarJson {
                    name: d.name.0.clone(),
                    webname: d.webname.0.clone(),
                    url: d.url.clone(),
                    delta: d.delta,
                    endpoint: import_endpoint(&settings.service_base, &d.webname, d.delta),
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize calendars")?
            );
            return Ok(());
        }

        if definitions.is_empty() {
            println!("No calendars registered in {}.", registry.path().display());
            return Ok(());
        }

        println!(
            "{} calendars → {}",
            definitions.len(),
            settings.service_base.trim_end_matches('/')
        );
        let rows: Vec<CalendarRow> = definitions
            .into_iter()
            .map(|d| CalendarRow {
                name: d.name.0,
                webname: d.webname.0,
                delta: d.delta,
                url: d.url,
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}
