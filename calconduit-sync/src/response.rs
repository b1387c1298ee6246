//! Import response parsing.
//!
//! The service answers every import with an XML document carrying a
//! `ResponseMessage` element:
//!
//! ```xml
//! <ImportResponse xmlns="http://schemas.trumba.com/2007/ImportResponse">
//!   <ResponseMessage Code="120" Description="The import completed." Level="Information" />
//! </ImportResponse>
//! ```
//!
//! The HTTP status and `Level` are independent signals: a 2xx reply may carry a
//! warning or error level.

use serde::{Deserialize, Serialize};

use crate::error::ResponseParseError;

pub const RESPONSE_MESSAGE: &str = "ResponseMessage";
pub const LEVEL_INFORMATION: &str = "Information";

/// Result of one publish attempt as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishOutcome {
    pub status: u16,
    pub code: String,
    pub description: String,
    pub level: String,
    pub raw_body: String,
}

impl PublishOutcome {
    /// The only level treated as a clean import.
    pub fn is_information(&self) -> bool {
        self.level == LEVEL_INFORMATION
    }
}

/// Extract `Code`, `Description` and `Level` from the first `ResponseMessage`
/// element (any namespace).
///
/// Fails closed: an empty body, invalid XML, a missing element or a missing
/// attribute is a [`ResponseParseError`].
pub fn parse_import_response(status: u16, body: &str) -> Result<PublishOutcome, ResponseParseError> {
    let fail = |reason: String| ResponseParseError {
        status,
        reason,
        body: body.to_string(),
    };

    if body.trim().is_empty() {
        return Err(fail("empty response body".to_string()));
    }

    let doc = roxmltree::Document::parse(body).map_err(|e| fail(format!("invalid XML: {e}")))?;
    let message = doc
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == RESPONSE_MESSAGE)
        .ok_or_else(|| fail(format!("no <{RESPONSE_MESSAGE}> element")))?;

    let attr = |name: &str| {
        message
            .attribute(name)
            .map(str::to_string)
            .ok_or_else(|| fail(format!("<{RESPONSE_MESSAGE}> has no {name} attribute")))
    };

    Ok(PublishOutcome {
        status,
        code: attr("Code")?,
        description: attr("Description")?,
        level: attr("Level")?,
        raw_body: body.to_string(),
    })
}
