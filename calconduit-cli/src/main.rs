//! calconduit — publish iCalendar feeds to a hosted calendar service.
//!
//! # Usage
//!
//! ```text
//! calconduit init
//! calconduit calendars [--registry <path>] [--json]
//! calconduit sync <name> [--dry-run] [--registry <path>]
//! calconduit sync --all [--dry-run] [--registry <path>]
//! calconduit status [--json]
//! calconduit publish-event <webname> --uid <uid> --dtstart <t> --summary <s> [--dry-run]
//! calconduit cancel-event <webname> --uid <uid> --dtstart <t> --summary <s> [--dry-run]
//! calconduit daemon start [--interval <secs>] [--registry <path>]
//! calconduit daemon logs [--lines <n>]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use calconduit_sync::EventMethod;
use commands::{
    calendars::CalendarsArgs, daemon::DaemonCommand, event::EventArgs, init::InitArgs,
    status::StatusArgs, sync::SyncArgs,
};

#[derive(Parser, Debug)]
#[command(
    name = "calconduit",
    version,
    about = "Fetch calendar feeds and publish them to a hosted calendar service",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scaffold ~/.calconduit with an empty registry and settings file.
    Init(InitArgs),

    /// List registered calendars and their import endpoints.
    Calendars(CalendarsArgs),

    /// Fetch and publish calendars once.
    Sync(SyncArgs),

    /// Show the latest sync result for each calendar.
    Status(StatusArgs),

    /// Publish a single event (METHOD:PUBLISH, delta=true).
    PublishEvent(EventArgs),

    /// Cancel a previously published event (METHOD:CANCEL, delta=true).
    CancelEvent(EventArgs),

    /// Run the scheduled sync daemon or inspect its log.
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Calendars(args) => args.run(),
        Commands::Sync(args) => {
            calconduit_daemon::init_tracing("warn");
            args.run()
        }
        Commands::Status(args) => args.run(),
        Commands::PublishEvent(args) => {
            calconduit_daemon::init_tracing("warn");
            commands::event::run(args, EventMethod::Publish)
        }
        Commands::CancelEvent(args) => {
            calconduit_daemon::init_tracing("warn");
            commands::event::run(args, EventMethod::Cancel)
        }
        Commands::Daemon { command } => commands::daemon::run(command),
    }
}
