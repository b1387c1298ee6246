//! In-memory fakes for the fetch and publish traits (testing only)
//!
//! `FakeFetcher` serves canned feeds by URL and `FakePublisher` answers with
//! canned import responses by webname. Both record every call.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use calconduit_core::Webname;

use crate::error::{FetchCause, FetchError, PublishError};
use crate::fetcher::{FeedFetcher, FeedPayload};
use crate::publisher::{import_endpoint, CalendarPublisher};
use crate::response::{parse_import_response, PublishOutcome};

pub const FAKE_SERVICE_BASE: &str = "https://calendar.test/service";

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// FakeFetcher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum FakeFeed {
    Body(String),
    /// Source answers with this non-2xx status.
    Status(u16),
    Unreachable,
}

impl FakeFeed {
    /// A minimal VCALENDAR with `events` VEVENT blocks.
    pub fn calendar(events: usize) -> Self {
        let mut body = String::from("BEGIN:VCALENDAR\r\nVERSION:2.0\r\n");
        for i in 0..events {
            body.push_str(&format!(
                "BEGIN:VEVENT\r\nUID:event-{i}\r\nSUMMARY:Event {i}\r\nEND:VEVENT\r\n"
            ));
        }
        body.push_str("END:VCALENDAR\r\n");
        FakeFeed::Body(body)
    }
}

/// Unknown URLs are unreachable.
#[derive(Debug, Default)]
pub struct FakeFetcher {
    feeds: HashMap<String, FakeFeed>,
    calls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(mut self, url: impl Into<String>, feed: FakeFeed) -> Self {
        self.feeds.insert(url.into(), feed);
        self
    }

    /// URLs fetched so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }
}

impl FeedFetcher for FakeFetcher {
    fn fetch(&self, url: &str) -> Result<FeedPayload, FetchError> {
        lock(&self.calls).push(url.to_string());
        let fail = |cause| FetchError {
            url: url.to_string(),
            cause,
        };
        match self.feeds.get(url) {
            Some(FakeFeed::Body(body)) => Ok(FeedPayload::from_text(body.clone())),
            Some(FakeFeed::Status(code)) => Err(fail(FetchCause::Status(*code))),
            Some(FakeFeed::Unreachable) | None => Err(fail(FetchCause::Transport(format!(
                "{url}: connection refused"
            )))),
        }
    }
}

// ---------------------------------------------------------------------------
// FakePublisher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum FakeResponse {
    /// Well-formed import response with HTTP status and level.
    Level { status: u16, level: String },
    Transport,
    /// Reply body that is not an import response.
    Malformed { status: u16, body: String },
}

impl FakeResponse {
    pub fn level(level: impl Into<String>) -> Self {
        FakeResponse::Level {
            status: 200,
            level: level.into(),
        }
    }

    pub fn malformed(body: impl Into<String>) -> Self {
        FakeResponse::Malformed {
            status: 200,
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishCall {
    pub webname: String,
    pub delta: bool,
    pub endpoint: String,
    pub body: Vec<u8>,
}

/// Answers `Information` for webnames without a configured response.
#[derive(Debug, Default)]
pub struct FakePublisher {
    responses: HashMap<String, FakeResponse>,
    calls: Mutex<Vec<PublishCall>>,
}

impl FakePublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, webname: impl Into<String>, response: FakeResponse) -> Self {
        self.responses.insert(webname.into(), response);
        self
    }

    pub fn calls(&self) -> Vec<PublishCall> {
        lock(&self.calls).clone()
    }
}

impl CalendarPublisher for FakePublisher {
    fn endpoint(&self, webname: &Webname, delta: bool) -> String {
        import_endpoint(FAKE_SERVICE_BASE, webname, delta)
    }

    fn publish(
        &self,
        webname: &Webname,
        delta: bool,
        payload: &FeedPayload,
    ) -> Result<PublishOutcome, PublishError> {
        let endpoint = self.endpoint(webname, delta);
        lock(&self.calls).push(PublishCall {
            webname: webname.as_str().to_string(),
            delta,
            endpoint: endpoint.clone(),
            body: payload.as_bytes().to_vec(),
        });

        let response = self
            .responses
            .get(webname.as_str())
            .cloned()
            .unwrap_or_else(|| FakeResponse::level("Information"));
        match response {
            FakeResponse::Level { status, level } => {
                let body = format!(
                    r#"<ImportResponse><ResponseMessage Code="120" Description="{} events imported" Level="{level}"/></ImportResponse>"#,
                    payload.event_count()
                );
                Ok(parse_import_response(status, &body)?)
            }
            FakeResponse::Transport => Err(PublishError::Transport {
                endpoint,
                cause: "connection reset".to_string(),
            }),
            FakeResponse::Malformed { status, body } => Ok(parse_import_response(status, &body)?),
        }
    }
}
