//! Request body normalization.
//!
//! A body declared as JSON through `content-type` is parsed into a structured
//! value before it reaches the handlers. Everything else passes through.

use crate::codec::{HeaderList, InterceptedRequest, RequestBody};
use crate::error::MediatorError;

/// Whether the request declares a JSON body (`application/json`, `application/problem+json`, ...).
pub fn is_json_content_type(headers: &HeaderList) -> bool {
    headers
        .get("content-type")
        .map(|value| value.to_ascii_lowercase().contains("json"))
        .unwrap_or(false)
}

/// Parse a JSON-declared raw body. Idempotent: structured bodies are left as-is.
pub fn normalize(mut request: InterceptedRequest) -> Result<InterceptedRequest, MediatorError> {
    if request.body.is_none() || !is_json_content_type(&request.headers) {
        return Ok(request);
    }

    if let Some(RequestBody::Text(text)) = &request.body {
        let parsed =
            serde_json::from_str(text).map_err(|source| MediatorError::MalformedBody { source })?;
        request.body = Some(RequestBody::Json(parsed));
    }
    Ok(request)
}
