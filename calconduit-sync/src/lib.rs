//! # calconduit-sync
//!
//! Fetch iCalendar feeds and publish them to the calendar service.
//!
//! Call [`pipeline::run`] with a registry, a [`FeedFetcher`], a
//! [`CalendarPublisher`] and a [`SyncLog`]. The CLI and daemon both go
//! through it. [`event::submit_event`] publishes one hand-built event.

pub mod error;
pub mod event;
pub mod fakes;
pub mod fetcher;
pub mod pipeline;
pub mod publisher;
pub mod report;
pub mod response;
pub mod sync_log;

pub use error::{
    EventError, FetchCause, FetchError, PublishError, ResponseParseError, SyncError,
};
pub use event::{submit_event, EventMethod, EventSubmission};
pub use fetcher::{FeedFetcher, FeedPayload, HttpFeedFetcher};
pub use pipeline::{run, run_at, RunOptions, SyncScope};
pub use publisher::{import_endpoint, CalendarPublisher, HttpCalendarPublisher};
pub use report::{Classification, RunReport, SyncOutcome, SyncRecord, SyncResult};
pub use response::{parse_import_response, PublishOutcome};
pub use sync_log::{read_records, JsonlSyncLog, MemorySyncLog, SyncLog};
