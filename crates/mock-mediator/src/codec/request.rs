//! Typed intercepted request and the projection from its wire form.

use super::headers::HeaderList;
use crate::error::MediatorError;
use serde::Serialize;
use serde_json::{Map, Value};
use url::Url;

/// Request body after decoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RequestBody {
    /// Raw text as it arrived on the wire.
    Text(String),
    /// Structured JSON, either sent structured or parsed by the body normalizer.
    Json(Value),
}

impl RequestBody {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RequestBody::Text(s) => Some(s),
            RequestBody::Json(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            RequestBody::Json(v) => Some(v),
            RequestBody::Text(_) => None,
        }
    }
}

/// A network call captured by the interception layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterceptedRequest {
    pub method: String,
    pub url: Url,
    pub headers: HeaderList,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<RequestBody>,
    /// Remaining payload fields (credentials, mode, referrer...), passed through to handlers.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InterceptedRequest {
    /// Build a request with no headers and no body.
    pub fn new(method: impl Into<String>, url: Url) -> Self {
        Self {
            method: method.into(),
            url,
            headers: HeaderList::new(),
            body: None,
            extra: Map::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }
}

/// Project a `REQUEST` payload object into an [`InterceptedRequest`].
///
/// The payload has already been through the empty-string pass, so an unset
/// body arrives here as a missing key.
pub(crate) fn project_request(
    mut payload: Map<String, Value>,
) -> Result<InterceptedRequest, MediatorError> {
    let method = match payload.remove("method") {
        Some(Value::String(method)) => method,
        Some(other) => {
            return Err(MediatorError::envelope(
                "/payload/method",
                format!("expected a string, got {other}"),
            ))
        }
        None => return Err(MediatorError::envelope("/payload/method", "missing field")),
    };

    let url = match payload.remove("url") {
        Some(Value::String(raw)) => Url::parse(&raw).map_err(|source| MediatorError::MalformedUrl {
            url: raw,
            pointer: "/payload/url".to_string(),
            source,
        })?,
        Some(other) => {
            return Err(MediatorError::envelope(
                "/payload/url",
                format!("expected a string, got {other}"),
            ))
        }
        None => return Err(MediatorError::envelope("/payload/url", "missing field")),
    };

    let headers = match payload.remove("headers") {
        Some(raw) => serde_json::from_value::<HeaderList>(raw)
            .map_err(|e| MediatorError::envelope("/payload/headers", e.to_string()))?,
        None => HeaderList::new(),
    };

    let body = match payload.remove("body") {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(RequestBody::Text(text)),
        Some(structured) => Some(RequestBody::Json(structured)),
    };

    Ok(InterceptedRequest {
        method,
        url,
        headers,
        body,
        extra: payload,
    })
}
