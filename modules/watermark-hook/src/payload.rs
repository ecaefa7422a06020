//! Decoding of the inbound webhook event.
//!
//! The body arrives base64-encoded. A body that is absent or cannot be decoded
//! yields `None` rather than an error; the handler decides what "no record"
//! means further down.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);

/// Standard alphabet, padding optional.
const BODY_ENGINE: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);

/// URL-safe alphabet (`-`, `_`), padding optional.
const URL_SAFE_BODY_ENGINE: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

/// The Lambda invocation payload. Only `body` is read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub body: Option<String>,
}

impl WebhookEvent {
    /// Read `body` from any invocation payload. Non-object payloads and
    /// non-string bodies give an event without a body.
    pub fn from_payload(payload: &Value) -> Self {
        Self {
            body: payload
                .get("body")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}

/// The record posted by the Contentful webhook.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingRequest {
    /// Scheme-relative image URL, e.g. `//images.ctfassets.net/...`.
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    pub content_type: String,
    /// Passed through untouched; any JSON value is accepted.
    #[serde(default)]
    pub width: Option<Value>,
    #[serde(default)]
    pub height: Option<Value>,
}

impl IncomingRequest {
    pub fn from_record(record: &Value) -> Result<Self> {
        Ok(Self::deserialize(record)?)
    }
}

/// Decode a base64 JSON body. Never fails: bad input is `None`.
pub fn decode_event_body(body: Option<&str>) -> Option<Value> {
    let body = body.filter(|b| !b.is_empty())?;

    // Line-wrapped bodies (e.g. at 76 columns) are common.
    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    let decoded = BODY_ENGINE
        .decode(&compact)
        .or_else(|_| URL_SAFE_BODY_ENGINE.decode(&compact));
    let bytes = match decoded {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, "Event body is not valid base64");
            return None;
        }
    };

    let text = String::from_utf8_lossy(&bytes);
    match serde_json::from_str(&text) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(error = %e, "Event body is not valid JSON");
            None
        }
    }
}

/// Read `fileName` straight off the decoded record, before any typed parsing.
pub fn file_name_of(record: &Value) -> Option<&str> {
    record.get("fileName").and_then(Value::as_str)
}
