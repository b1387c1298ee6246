//! calconduit core library — sync definitions, registry, settings, errors.
//!
//! - [`types`] — newtypes and [`CalendarSyncDefinition`]
//! - [`error`] — [`ConfigError`]
//! - [`registry`] — [`CalendarRegistry`] contract, file-backed load / save / init
//! - [`settings`] — service endpoint, credentials, timeouts
//! - [`paths`] — `~/.calconduit/` layout

pub mod error;
pub mod paths;
pub mod registry;
pub mod settings;
pub mod types;

pub use error::ConfigError;
pub use registry::{CalendarRegistry, FileRegistry, StaticRegistry};
pub use settings::{Credentials, Settings};
pub use types::{CalendarName, CalendarSyncDefinition, Webname};
