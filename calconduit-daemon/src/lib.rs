//! Scheduled sync daemon: periodic runs, sync log rotation, signal shutdown.

mod error;
pub mod log_rotation;
mod runtime;

pub use error::DaemonError;
pub use runtime::{init_tracing, run, start_blocking, DaemonOptions, ENV_LOG_FORMAT};
