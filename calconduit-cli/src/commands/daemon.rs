//! `calconduit daemon` — scheduled sync in the foreground, and its log.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use calconduit_core::paths;
use calconduit_daemon::{start_blocking, DaemonOptions};

use super::home_dir;

#[derive(Subcommand, Debug)]
pub enum DaemonCommand {
    /// Run the scheduler in the foreground until ctrl-c.
    Start(DaemonStartArgs),
    /// Print recent sync log lines.
    Logs(DaemonLogsArgs),
}

#[derive(Args, Debug)]
pub struct DaemonStartArgs {
    /// Seconds between runs (defaults to `interval_secs` in settings.yaml).
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,

    /// Registry file to read instead of ~/.calconduit/calendars.yaml (.yaml or .xml).
    #[arg(long, value_name = "PATH")]
    pub registry: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DaemonLogsArgs {
    /// Number of trailing lines to show.
    #[arg(long, default_value_t = 100)]
    pub lines: usize,
}

pub fn run(command: DaemonCommand) -> Result<()> {
    let home = home_dir()?;

    match command {
        DaemonCommand::Start(args) => {
            let options = DaemonOptions {
                interval: args.interval.map(Duration::from_secs),
                registry: args.registry,
            };
            start_blocking(&home, options).context("daemon exited with error")?;
        }
        DaemonCommand::Logs(args) => {
            print_tail(&paths::sync_log_path(&home), args.lines)
                .context("failed to read sync log")?;
        }
    }

    Ok(())
}

fn print_tail(path: &Path, lines: usize) -> Result<()> {
    if !path.exists() {
        println!("log file not found: {}", path.display());
        return Ok(());
    }

    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut tail = VecDeque::<String>::with_capacity(lines);
    for line in BufReader::new(file).lines() {
        let line = line.with_context(|| format!("read {}", path.display()))?;
        if lines == 0 {
            continue;
        }
        if tail.len() == lines {
            tail.pop_front();
        }
        tail.push_back(line);
    }

    println!("==> {} <==", path.display());
    for line in tail {
        println!("{line}");
    }
    Ok(())
}
