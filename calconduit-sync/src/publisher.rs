//! Publishing payloads to the calendar service import endpoint.
//!
//! `PUT {service_base}/{webname}.ics?delta={true|false}` with basic auth.
//!
//! - `delta=false`: the payload is the full feed; the service deletes any
//!   event for this webname that is absent from it.
//! - `delta=true`: the payload is incremental; only events sent with an
//!   explicit `CANCEL` method are deleted.
//!
//! The publisher never computes deltas. It forwards the caller's flag.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use calconduit_core::{settings::Credentials, types::delta_query_value, Webname};

use crate::error::PublishError;
use crate::fetcher::{FeedPayload, USER_AGENT};
use crate::response::{parse_import_response, PublishOutcome};

pub const CONTENT_TYPE_CALENDAR: &str = "text/calendar";

/// Publishes a payload for one destination and reports the service's verdict.
pub trait CalendarPublisher {
    /// The import endpoint `publish` would target.
    fn endpoint(&self, webname: &Webname, delta: bool) -> String;

    /// Returns the parsed outcome for any well-formed reply, whatever its level
    /// or HTTP status. Classification is left to the caller.
    fn publish(
        &self,
        webname: &Webname,
        delta: bool,
        payload: &FeedPayload,
    ) -> Result<PublishOutcome, PublishError>;
}

/// `{base}/{webname}.ics?delta={delta}`; a trailing `/` on `base` is ignored.
pub fn import_endpoint(service_base: &str, webname: &Webname, delta: bool) -> String {
    format!(
        "{}/{}.ics?delta={}",
        service_base.trim_end_matches('/'),
        webname.as_str(),
        delta_query_value(delta)
    )
}

/// Blocking HTTP publisher.
///
/// The `Authorization` header is sent on the first request (no 401 round-trip).
/// Redirects are not followed, so credentials only ever reach the import endpoint.
#[derive(Clone)]
pub struct HttpCalendarPublisher {
    agent: ureq::Agent,
    service_base: String,
    authorization: String,
}

impl std::fmt::Debug for HttpCalendarPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCalendarPublisher")
            .field("service_base", &self.service_base)
            .finish_non_exhaustive()
    }
}

impl HttpCalendarPublisher {
    pub fn new(service_base: impl Into<String>, credentials: Credentials, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout(timeout)
            .redirects(0)
            .user_agent(USER_AGENT)
            .build();
        Self {
            agent,
            service_base: service_base.into(),
            authorization: basic_authorization(&credentials),
        }
    }
}

impl CalendarPublisher for HttpCalendarPublisher {
    fn endpoint(&self, webname: &Webname, delta: bool) -> String {
        import_endpoint(&self.service_base, webname, delta)
    }

    fn publish(
        &self,
        webname: &Webname,
        delta: bool,
        payload: &FeedPayload,
    ) -> Result<PublishOutcome, PublishError> {
        let endpoint = self.endpoint(webname, delta);
        let transport = |cause: String| PublishError::Transport {
            endpoint: endpoint.clone(),
            cause,
        };

        // send_bytes sets Content-Length to the exact payload size.
        let result = self
            .agent
            .put(&endpoint)
            .set("Authorization", &self.authorization)
            .set("Content-Type", CONTENT_TYPE_CALENDAR)
            .set("Accept", "application/xml")
            .send_bytes(payload.as_bytes());

        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(t)) => return Err(transport(t.to_string())),
        };

        let status = response.status();
        let body = response
            .into_string()
            .map_err(|e| transport(format!("failed to read response body: {e}")))?;

        tracing::debug!(%endpoint, status, bytes = payload.len(), "import response received");
        Ok(parse_import_response(status, &body)?)
    }
}

fn basic_authorization(credentials: &Credentials) -> String {
    let token = STANDARD.encode(format!("{}:{}", credentials.account, credentials.password));
    format!("Basic {token}")
}
