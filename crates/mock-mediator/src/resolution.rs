//! First-match resolution over the ordered handler list.

use crate::codec::{InterceptedRequest, MockedResponse};
use crate::error::MediatorError;
use crate::handler::{HandlerOutcome, RequestHandler};
use crate::metrics;
use anyhow::anyhow;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Result of resolving one request.
///
/// `Unhandled` and `Declined` currently produce the same verdict, but they are
/// kept apart so the warning (and any future policy) can tell them apart.
pub enum Resolution {
    /// No handler claimed the request.
    Unhandled,
    /// A handler claimed the request but its resolver produced no response.
    Declined { handler: Arc<dyn RequestHandler> },
    /// A handler claimed the request and produced a response.
    Mocked {
        handler: Arc<dyn RequestHandler>,
        response: MockedResponse,
    },
}

impl Resolution {
    pub fn handler(&self) -> Option<&Arc<dyn RequestHandler>> {
        match self {
            Resolution::Unhandled => None,
            Resolution::Declined { handler } | Resolution::Mocked { handler, .. } => Some(handler),
        }
    }

    pub fn response(&self) -> Option<&MockedResponse> {
        match self {
            Resolution::Mocked { response, .. } => Some(response),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::Unhandled => f.write_str("Unhandled"),
            Resolution::Declined { handler } => f
                .debug_struct("Declined")
                .field("handler", &handler.description())
                .finish(),
            Resolution::Mocked { handler, response } => f
                .debug_struct("Mocked")
                .field("handler", &handler.description())
                .field("response", response)
                .finish(),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

/// Walk `handlers` in order and stop at the first one that claims the request.
///
/// A handler error or panic stops the walk and is returned as
/// [`MediatorError::HandlerResolutionFailure`]; it is never read as "no match".
pub async fn resolve(
    request: &InterceptedRequest,
    handlers: &[Arc<dyn RequestHandler>],
) -> Result<Resolution, MediatorError> {
    let start = Instant::now();

    for handler in handlers {
        let outcome = AssertUnwindSafe(handler.try_resolve(request))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(anyhow!("handler panicked: {}", panic_message(&*panic))))
            .map_err(|source| MediatorError::HandlerResolutionFailure {
                handler: handler.description(),
                source,
            });

        let resolution = match outcome {
            Ok(HandlerOutcome::Skipped) => continue,
            Ok(HandlerOutcome::Claimed(None)) => Resolution::Declined {
                handler: Arc::clone(handler),
            },
            Ok(HandlerOutcome::Claimed(Some(response))) => Resolution::Mocked {
                handler: Arc::clone(handler),
                response,
            },
            Err(err) => {
                metrics::record_resolution_duration("error", start.elapsed());
                return Err(err);
            }
        };

        debug!(
            "Request {} {} claimed by {}",
            request.method,
            request.url,
            handler.description()
        );
        metrics::record_resolution_duration("matched", start.elapsed());
        return Ok(resolution);
    }

    metrics::record_resolution_duration("unhandled", start.elapsed());
    Ok(Resolution::Unhandled)
}
