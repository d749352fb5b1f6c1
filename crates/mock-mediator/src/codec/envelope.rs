//! Message envelopes exchanged with the interception layer.
//!
//! Inbound decoding is two-pass: the raw text is parsed as generic JSON, then
//! the empty-string pass drops every `""` field and a typed projection builds
//! the request from the known field names.

use super::headers::HeaderList;
use super::request::{project_request, InterceptedRequest};
use crate::error::{ErrorReport, MediatorError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Inbound tag for request delivery.
pub const REQUEST_TAG: &str = "REQUEST";

/// A decoded inbound envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// A `REQUEST` envelope carrying an intercepted request.
    Request(InterceptedRequest),
    /// Any other traffic sharing the transport. `None` when the tag was absent.
    Other(Option<String>),
}

impl Envelope {
    pub fn tag(&self) -> Option<&str> {
        match self {
            Envelope::Request(_) => Some(REQUEST_TAG),
            Envelope::Other(tag) => tag.as_deref(),
        }
    }
}

/// A mocked response produced by a handler.
///
/// Serializes directly to the `MOCK_SUCCESS` payload shape, with headers as
/// ordered `[name, value]` pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockedResponse {
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(default)]
    pub headers: HeaderList,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

fn default_status() -> u16 {
    200
}

impl Default for MockedResponse {
    fn default() -> Self {
        Self {
            status: default_status(),
            headers: HeaderList::new(),
            body: None,
        }
    }
}

impl MockedResponse {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: [("content-type", "application/json")].into_iter().collect(),
            body: Some(body),
        }
    }
}

/// Payload of an `INTERNAL_ERROR` verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalErrorPayload {
    pub status: u16,
    /// JSON text of an [`ErrorReport`].
    pub body: String,
}

impl InternalErrorPayload {
    pub fn from_report(report: &ErrorReport) -> Self {
        // A struct of three strings always serializes.
        let body = serde_json::to_string(report).unwrap_or_default();
        Self { status: 500, body }
    }

    pub fn report(&self) -> Option<ErrorReport> {
        serde_json::from_str(&self.body).ok()
    }
}

/// Outbound verdict envelope: `{ "type": ..., "payload": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum OutboundMessage {
    #[serde(rename = "MOCK_SUCCESS")]
    MockSuccess(MockedResponse),
    #[serde(rename = "MOCK_NOT_FOUND")]
    MockNotFound,
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError(InternalErrorPayload),
}

impl OutboundMessage {
    /// Wire tag, also used as the verdict metrics label.
    pub fn tag(&self) -> &'static str {
        match self {
            OutboundMessage::MockSuccess(_) => "MOCK_SUCCESS",
            OutboundMessage::MockNotFound => "MOCK_NOT_FOUND",
            OutboundMessage::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn internal_error(err: &MediatorError) -> Self {
        OutboundMessage::InternalError(InternalErrorPayload::from_report(&err.report()))
    }
}

/// Drop every object field whose value is exactly the empty string, at any depth.
///
/// The transport serializes unset fields as `""`, so `""` always means "absent".
/// Array elements keep their positions; only objects nested inside them are pruned.
fn drop_empty_strings(map: &mut Map<String, Value>) {
    map.retain(|_, value| !matches!(value, Value::String(s) if s.is_empty()));
    for value in map.values_mut() {
        prune_nested(value);
    }
}

fn prune_nested(value: &mut Value) {
    match value {
        Value::Object(map) => drop_empty_strings(map),
        Value::Array(items) => items.iter_mut().for_each(prune_nested),
        _ => {}
    }
}

/// Decode a raw wire message.
///
/// Only the envelope tag is inspected for non-`REQUEST` traffic; its payload is
/// left alone so unrelated messages can never fail this decoder.
pub fn decode(raw: &str) -> Result<Envelope, MediatorError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| MediatorError::envelope("/", format!("invalid JSON: {e}")))?;

    let Value::Object(mut envelope) = value else {
        return Err(MediatorError::envelope("/", "expected a JSON object"));
    };
    envelope.retain(|_, value| !matches!(value, Value::String(s) if s.is_empty()));

    // Anything but a string tag is unrelated traffic, never a failure.
    let tag = match envelope.remove("type") {
        Some(Value::String(tag)) => Some(tag),
        None | Some(Value::Null) => None,
        Some(other) => {
            debug!("Ignoring envelope with non-string type {}", other);
            None
        }
    };

    if tag.as_deref() != Some(REQUEST_TAG) {
        return Ok(Envelope::Other(tag));
    }

    let mut payload = match envelope.remove("payload") {
        Some(Value::Object(payload)) => payload,
        Some(other) => {
            return Err(MediatorError::envelope(
                "/payload",
                format!("expected an object, got {other}"),
            ))
        }
        None => return Err(MediatorError::envelope("/payload", "missing field")),
    };
    drop_empty_strings(&mut payload);

    project_request(payload).map(Envelope::Request)
}

/// Encode a verdict for the wire.
pub fn encode(message: &OutboundMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(message)
}
