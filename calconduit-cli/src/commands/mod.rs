pub mod calendars;
pub mod daemon;
pub mod event;
pub mod init;
pub mod status;
pub mod sync;

use std::path::PathBuf;

use anyhow::{Context, Result};

pub(crate) fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}
