//! Single-event submission.
//!
//! One VEVENT is wrapped in a VCALENDAR that carries a `METHOD` line and is
//! published with `delta=true`, so the service leaves every other event for
//! the webname alone. `METHOD:CANCEL` deletes the event with the same UID.
//!
//! Property values are written as given (already iCalendar-encoded); only
//! line breaks are rejected. `DTSTART` and `DTEND` get a `TZID` parameter
//! unless the value is UTC (`...Z`) or no timezone is set.

use std::fmt;

use calconduit_core::Webname;

use crate::error::EventError;
use crate::fetcher::FeedPayload;
use crate::publisher::CalendarPublisher;
use crate::response::PublishOutcome;

pub const REQUIRED_PROPERTIES: [&str; 3] = ["UID", "DTSTART", "SUMMARY"];
const ZONED_PROPERTIES: [&str; 2] = ["DTSTART", "DTEND"];
/// Properties the builder writes itself.
const STRUCTURAL_PROPERTIES: [&str; 5] = ["BEGIN", "END", "METHOD", "VERSION", "PRODID"];

pub const DEFAULT_TIMEZONE: &str = "America/Los_Angeles";
pub const DEFAULT_PRODID: &str = "-//calconduit//Event Submission//EN";

const MAX_LINE_OCTETS: usize = 75;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventMethod {
    /// Create or update the event.
    #[default]
    Publish,
    /// Delete the event with this UID.
    Cancel,
}

impl EventMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            EventMethod::Publish => "PUBLISH",
            EventMethod::Cancel => "CANCEL",
        }
    }
}

impl fmt::Display for EventMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered property list for one event. Names are stored upper-case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSubmission {
    properties: Vec<(String, String)>,
    timezone: Option<String>,
    prodid: String,
}

impl Default for EventSubmission {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSubmission {
    pub fn new() -> Self {
        Self {
            properties: Vec::new(),
            timezone: Some(DEFAULT_TIMEZONE.to_string()),
            prodid: DEFAULT_PRODID.to_string(),
        }
    }

    pub fn from_properties<I, K, V>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        properties
            .into_iter()
            .fold(Self::new(), |event, (name, value)| event.with(name, value))
    }

    /// Set `name`, replacing an earlier value in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let name = name.into().trim().to_ascii_uppercase();
        let value = value.into();
        match self.properties.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.properties.push((name, value)),
        }
        self
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// `None` writes floating DTSTART/DTEND values.
    pub fn with_timezone(mut self, timezone: Option<String>) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn with_prodid(mut self, prodid: impl Into<String>) -> Self {
        self.prodid = prodid.into();
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn uid(&self) -> Option<&str> {
        self.get("UID")
    }

    pub fn validate(&self) -> Result<(), EventError> {
        for required in REQUIRED_PROPERTIES {
            if self.get(required).map_or(true, |v| v.trim().is_empty()) {
                return Err(EventError::MissingProperty(required));
            }
        }
        for (name, value) in &self.properties {
            let well_formed = !name.is_empty()
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
            if !well_formed || STRUCTURAL_PROPERTIES.contains(&name.as_str()) {
                return Err(EventError::InvalidPropertyName(name.clone()));
            }
            if value.contains(['\r', '\n']) {
                return Err(EventError::InvalidValue(name.clone()));
            }
        }
        if let Some(tz) = &self.timezone {
            if tz.trim().is_empty() || tz.contains(['\r', '\n', ';', ':']) {
                return Err(EventError::InvalidValue("TZID".to_string()));
            }
        }
        Ok(())
    }

    /// Render the VCALENDAR document with CRLF line endings and folded lines.
    pub fn to_calendar(&self, method: EventMethod) -> Result<FeedPayload, EventError> {
        self.validate()?;

        let mut doc = String::new();
        let mut line = |text: String| {
            doc.push_str(&fold(&text));
            doc.push_str("\r\n");
        };
        line("BEGIN:VCALENDAR".to_string());
        line(format!("METHOD:{method}"));
        line("VERSION:2.0".to_string());
        line(format!("PRODID:{}", self.prodid));
        line("BEGIN:VEVENT".to_string());
        for (name, value) in &self.properties {
            match &self.timezone {
                Some(tz) if ZONED_PROPERTIES.contains(&name.as_str()) && !value.ends_with('Z') => {
                    line(format!("{name};TZID={tz}:{value}"))
                }
                _ => line(format!("{name}:{value}")),
            }
        }
        line("END:VEVENT".to_string());
        line("END:VCALENDAR".to_string());
        Ok(FeedPayload::from_text(doc))
    }
}

/// Publish one event with `delta=true`.
///
/// The outcome is returned whatever its level; the caller classifies it.
pub fn submit_event<P>(
    publisher: &P,
    webname: &Webname,
    event: &EventSubmission,
    method: EventMethod,
) -> Result<PublishOutcome, EventError>
where
    P: CalendarPublisher + ?Sized,
{
    let payload = event.to_calendar(method)?;
    let outcome = publisher.publish(webname, true, &payload)?;
    if outcome.is_information() {
        tracing::info!(
            %webname,
            uid = event.uid().unwrap_or_default(),
            %method,
            code = %outcome.code,
            "event submitted"
        );
    } else {
        tracing::error!(
            %webname,
            uid = event.uid().unwrap_or_default(),
            %method,
            status = outcome.status,
            code = %outcome.code,
            level = %outcome.level,
            description = %outcome.description,
            "calendar service reported a non-information response for event"
        );
    }
    Ok(outcome)
}

/// Split a content line into 75-octet chunks joined by CRLF + space.
fn fold(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut width = 0;
    for c in line.chars() {
        let len = c.len_utf8();
        if width + len > MAX_LINE_OCTETS {
            out.push_str("\r\n ");
            width = 1;
        }
        out.push(c);
        width += len;
    }
    out
}
