//! Failure taxonomy for the mediation pipeline.
//!
//! Every variant is caught once at the mediator boundary and converted into an
//! `INTERNAL_ERROR` verdict through [`MediatorError::report`]. A handler that
//! claims a request but returns no response is not an error and has no variant
//! here; it degrades to `MOCK_NOT_FOUND`.

use serde::{Deserialize, Serialize};

/// Errors raised while decoding, normalizing or resolving an intercepted request.
#[derive(Debug, thiserror::Error)]
pub enum MediatorError {
    /// The wire payload is not structured data, or a required field is missing or mistyped.
    #[error("Malformed envelope at {pointer}: {reason}")]
    MalformedEnvelope { pointer: String, reason: String },

    /// The `url` field could not be parsed into an absolute URL.
    #[error("Invalid request URL {url:?}: {source}")]
    MalformedUrl {
        url: String,
        pointer: String,
        #[source]
        source: url::ParseError,
    },

    /// The body was declared as JSON but failed to parse.
    #[error("Failed to parse JSON request body: {source}")]
    MalformedBody {
        #[source]
        source: serde_json::Error,
    },

    /// A handler raised while resolving the request.
    #[error("Handler '{handler}' failed: {source}")]
    HandlerResolutionFailure {
        handler: String,
        #[source]
        source: anyhow::Error,
    },
}

/// The three wire fields describing a failure inside an `INTERNAL_ERROR` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub error_type: String,
    pub message: String,
    pub location: String,
}

impl MediatorError {
    pub(crate) fn envelope(pointer: impl Into<String>, reason: impl Into<String>) -> Self {
        MediatorError::MalformedEnvelope {
            pointer: pointer.into(),
            reason: reason.into(),
        }
    }

    /// Stable kind name, used as `errorType` on the wire and as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            MediatorError::MalformedEnvelope { .. } => "MalformedEnvelope",
            MediatorError::MalformedUrl { .. } => "MalformedUrl",
            MediatorError::MalformedBody { .. } => "MalformedBody",
            MediatorError::HandlerResolutionFailure { .. } => "HandlerResolutionFailure",
        }
    }

    /// Human readable message. For handler failures this is the handler's own
    /// message, untouched, so callers see exactly what the resolver raised.
    pub fn message(&self) -> String {
        match self {
            MediatorError::MalformedEnvelope { reason, .. } => reason.clone(),
            MediatorError::MalformedUrl { url, source, .. } => format!("{source}: {url:?}"),
            MediatorError::MalformedBody { source } => source.to_string(),
            MediatorError::HandlerResolutionFailure { source, .. } => source.to_string(),
        }
    }

    /// Diagnostic trace describing where the failure happened.
    pub fn location(&self) -> String {
        match self {
            MediatorError::MalformedEnvelope { pointer, .. } => pointer.clone(),
            MediatorError::MalformedUrl { pointer, .. } => pointer.clone(),
            MediatorError::MalformedBody { source } => format!(
                "/payload/body (line {}, column {})",
                source.line(),
                source.column()
            ),
            MediatorError::HandlerResolutionFailure { handler, source } => {
                format!("at handler {handler}\n{source:?}")
            }
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            error_type: self.kind().to_string(),
            message: self.message(),
            location: self.location(),
        }
    }
}
