//! `calconduit init`

use anyhow::{Context, Result};
use clap::Args;

use calconduit_core::registry;

use super::home_dir;

#[derive(Args, Debug)]
pub struct InitArgs {}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let home = home_dir()?;
        let report = registry::init_at(&home).context("failed to scaffold ~/.calconduit")?;

        for path in &report.created {
            println!("✓ created {}", path.display());
        }
        for path in &report.existing {
            println!("· kept existing {}", path.display());
        }
        if !report.created.is_empty() {
            println!("Add calendars to the registry, then run `calconduit sync --all --dry-run`.");
        }
        Ok(())
    }
}
