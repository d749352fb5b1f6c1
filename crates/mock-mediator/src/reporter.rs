//! Turns a resolution into exactly one verdict on the reply channel.

use crate::channel::ReplyChannel;
use crate::codec::{InterceptedRequest, OutboundMessage};
use crate::config::MediatorConfig;
use crate::error::MediatorError;
use crate::logging::ExchangeLogger;
use crate::metrics;
use crate::resolution::Resolution;
use tracing::error;

/// Decide the verdict for a resolution and run its logging side effects.
///
/// Both misses warn, quiet or not: an unmatched request, and a handler that
/// claims the request without a response. Each degrades to `MOCK_NOT_FOUND`.
pub fn verdict_for(
    request: &InterceptedRequest,
    resolution: Resolution,
    config: &MediatorConfig,
    logger: &dyn ExchangeLogger,
) -> OutboundMessage {
    match resolution {
        Resolution::Unhandled => {
            logger.warn_unhandled(request);
            OutboundMessage::MockNotFound
        }
        Resolution::Declined { handler } => {
            logger.warn_missing_response(request, handler.as_ref());
            OutboundMessage::MockNotFound
        }
        Resolution::Mocked { handler, response } => {
            if !config.quiet {
                logger.log_exchange(request, &response, handler.as_ref());
            }
            OutboundMessage::MockSuccess(response)
        }
    }
}

/// Emit the verdict for `resolution` and release the channel.
pub fn report(
    channel: ReplyChannel,
    request: &InterceptedRequest,
    resolution: Resolution,
    config: &MediatorConfig,
    logger: &dyn ExchangeLogger,
) -> bool {
    channel.send(verdict_for(request, resolution, config, logger))
}

/// Emit an `INTERNAL_ERROR` verdict for a failure caught at the boundary.
pub fn report_error(channel: ReplyChannel, err: &MediatorError) -> bool {
    error!(
        correlation_id = %channel.correlation_id(),
        error_type = err.kind(),
        "Failed to handle intercepted request: {}",
        err
    );
    metrics::record_internal_error(err.kind());
    channel.send(OutboundMessage::internal_error(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::MockedResponse;
    use crate::handler::{handler_fn, HandlerOutcome, RequestHandler};
    use parking_lot::Mutex;
    use std::sync::Arc;
    use url::Url;

    #[derive(Default)]
    struct RecordingLogger {
        exchanges: Mutex<Vec<String>>,
        warnings: Mutex<Vec<String>>,
        unhandled: Mutex<Vec<String>>,
    }

    impl ExchangeLogger for RecordingLogger {
        fn log_exchange(
            &self,
            _request: &InterceptedRequest,
            response: &MockedResponse,
            handler: &dyn RequestHandler,
        ) {
            self.exchanges
                .lock()
                .push(format!("{} -> {}", handler.description(), response.status));
        }

        fn warn_missing_response(&self, _request: &InterceptedRequest, handler: &dyn RequestHandler) {
            self.warnings.lock().push(handler.description());
        }

        fn warn_unhandled(&self, request: &InterceptedRequest) {
            self.unhandled
                .lock()
                .push(format!("{} {}", request.method, request.url));
        }
    }

    fn handler(label: &'static str) -> Arc<dyn RequestHandler> {
        Arc::new(handler_fn(label, |_req| async { Ok(HandlerOutcome::Skipped) }))
    }

    fn request() -> InterceptedRequest {
        InterceptedRequest::new("GET", Url::parse("https://example.com/user").unwrap())
    }

    #[test]
    fn test_unhandled_warns_and_is_not_found() {
        let logger = RecordingLogger::default();
        let verdict = verdict_for(
            &request(),
            Resolution::Unhandled,
            &MediatorConfig { quiet: true },
            &logger,
        );
        assert_eq!(verdict, OutboundMessage::MockNotFound);
        assert_eq!(
            *logger.unhandled.lock(),
            vec!["GET https://example.com/user".to_string()]
        );
        assert!(logger.warnings.lock().is_empty());
        assert!(logger.exchanges.lock().is_empty());
    }

    #[test]
    fn test_declined_warns_even_when_quiet() {
        let logger = RecordingLogger::default();
        let verdict = verdict_for(
            &request(),
            Resolution::Declined {
                handler: handler("GET /user"),
            },
            &MediatorConfig { quiet: true },
            &logger,
        );
        assert_eq!(verdict, OutboundMessage::MockNotFound);
        assert_eq!(*logger.warnings.lock(), vec!["GET /user".to_string()]);
    }

    #[test]
    fn test_mocked_logs_unless_quiet() {
        let response = MockedResponse::json(200, serde_json::json!({"firstName": "John"}));

        let logger = RecordingLogger::default();
        let verdict = verdict_for(
            &request(),
            Resolution::Mocked {
                handler: handler("GET /user"),
                response: response.clone(),
            },
            &MediatorConfig::default(),
            &logger,
        );
        assert_eq!(verdict, OutboundMessage::MockSuccess(response.clone()));
        assert_eq!(*logger.exchanges.lock(), vec!["GET /user -> 200".to_string()]);

        let quiet_logger = RecordingLogger::default();
        let quiet_verdict = verdict_for(
            &request(),
            Resolution::Mocked {
                handler: handler("GET /user"),
                response: response.clone(),
            },
            &MediatorConfig { quiet: true },
            &quiet_logger,
        );
        assert_eq!(quiet_verdict, verdict);
        assert!(quiet_logger.exchanges.lock().is_empty());
    }
}
