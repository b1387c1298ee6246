//! Source feed retrieval.

use std::io::Read;
use std::time::Duration;

use calconduit_core::Settings;

use crate::error::{FetchCause, FetchError};

pub(crate) const USER_AGENT: &str = concat!("calconduit/", env!("CARGO_PKG_VERSION"));

/// A complete calendar document.
///
/// The fetcher only drops a leading byte order mark; the publisher forwards
/// these bytes as they are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedPayload {
    bytes: Vec<u8>,
}

impl FeedPayload {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            bytes: text.into().into_bytes(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of `BEGIN:VEVENT` lines. Informational only; nothing is parsed.
    pub fn event_count(&self) -> usize {
        String::from_utf8_lossy(&self.bytes)
            .lines()
            .filter(|line| line.trim().eq_ignore_ascii_case("BEGIN:VEVENT"))
            .count()
    }
}

/// Retrieves raw calendar data from a source URL.
pub trait FeedFetcher {
    fn fetch(&self, url: &str) -> Result<FeedPayload, FetchError>;
}

/// Blocking HTTP GET fetcher. One attempt per call, no size cap.
#[derive(Debug, Clone)]
pub struct HttpFeedFetcher {
    agent: ureq::Agent,
}

impl HttpFeedFetcher {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build();
        Self { agent }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.fetch_timeout())
    }
}

impl FeedFetcher for HttpFeedFetcher {
    fn fetch(&self, url: &str) -> Result<FeedPayload, FetchError> {
        let fail = |cause: FetchCause| FetchError {
            url: url.to_string(),
            cause,
        };

        let target = normalize_url(url).map_err(fail)?;
        let response = match self.agent.get(target.as_str()).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(code, _)) => return Err(fail(FetchCause::Status(code))),
            Err(ureq::Error::Transport(t)) => {
                return Err(fail(FetchCause::Transport(t.to_string())))
            }
        };
        // ureq hands back 1xx/3xx replies it did not follow (304, 302 without Location).
        let status = response.status();
        if !(200..300).contains(&status) {
            return Err(fail(FetchCause::Status(status)));
        }

        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| fail(FetchCause::Io(e)))?;
        let text = String::from_utf8(bytes).map_err(|e| fail(FetchCause::Decode(e)))?;

        let text = strip_bom(text);
        tracing::debug!(url, bytes = text.len(), "fetched feed");
        Ok(FeedPayload::from_text(text))
    }
}

/// Drop a leading UTF-8 byte order mark. The rest of the text is untouched.
fn strip_bom(text: String) -> String {
    match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}

/// Parse `raw` and map `webcal://` to `https://`. Only http(s) is fetched.
pub(crate) fn normalize_url(raw: &str) -> Result<url::Url, FetchCause> {
    let trimmed = raw.trim();
    let parsed = url::Url::parse(trimmed)?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        "webcal" | "webcals" => {
            let rest = &trimmed[parsed.scheme().len()..];
            Ok(url::Url::parse(&format!("https{rest}"))?)
        }
        other => Err(FetchCause::UnsupportedScheme(other.to_string())),
    }
}
