//! Diagnostic output for resolved exchanges.
//!
//! The mediator reports through [`ExchangeLogger`] so the console formatting
//! stays outside the pipeline. [`TracingLogger`] is the default and writes
//! through `tracing`; [`init_tracing`] installs the subscriber for the binary.

use crate::codec::{InterceptedRequest, MockedResponse};
use crate::handler::RequestHandler;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub trait ExchangeLogger: Send + Sync {
    /// A handler produced a mocked response. Skipped entirely in quiet mode.
    fn log_exchange(
        &self,
        request: &InterceptedRequest,
        response: &MockedResponse,
        handler: &dyn RequestHandler,
    );

    /// A handler claimed the request but its resolver returned nothing.
    /// Emitted regardless of quiet mode.
    fn warn_missing_response(&self, request: &InterceptedRequest, handler: &dyn RequestHandler);

    /// No handler matched the request. Emitted regardless of quiet mode.
    fn warn_unhandled(&self, request: &InterceptedRequest);
}

/// Logs exchanges as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

/// One-line summary: `HH:MM:SS METHOD URL (STATUS)`.
pub fn exchange_summary(request: &InterceptedRequest, response: &MockedResponse) -> String {
    format!(
        "{} {} {} ({})",
        chrono::Local::now().format("%H:%M:%S"),
        request.method,
        request.url,
        response.status
    )
}

/// Warning text for a request no handler matched.
pub fn unhandled_warning(request: &InterceptedRequest) -> String {
    format!(
        "Warning: intercepted a request without a matching request handler:\n\n  \u{2022} {} {}\n\n\
         If you still wish to intercept this unhandled request, please create a request handler for it.",
        request.method, request.url
    )
}

impl ExchangeLogger for TracingLogger {
    fn log_exchange(
        &self,
        request: &InterceptedRequest,
        response: &MockedResponse,
        handler: &dyn RequestHandler,
    ) {
        let request_json = serde_json::to_string(request).unwrap_or_default();
        let response_json = serde_json::to_string(response).unwrap_or_default();
        info!(
            handler = %handler.description(),
            request = %request_json,
            response = %response_json,
            "{}",
            exchange_summary(request, response)
        );
    }

    fn warn_missing_response(&self, request: &InterceptedRequest, handler: &dyn RequestHandler) {
        warn!(
            handler = %handler.description(),
            "Expected a mocking resolver to return a mocked response for {} {}, but got: None. \
             The original response is going to be used instead.",
            request.method,
            request.url
        );
    }

    fn warn_unhandled(&self, request: &InterceptedRequest) {
        warn!("{}", unhandled_warning(request));
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Install the global subscriber. `RUST_LOG` wins over the default `info` filter.
pub fn init_tracing(format: LogFormat) {
    let fmt_layer = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed(),
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .ok();
}
