//! Per-event orchestration: decode, normalize, resolve, report.
//!
//! Each event gets its own reply channel, opened before anything can fail so
//! the error boundary always has somewhere to send the `INTERNAL_ERROR`.

use crate::body;
use crate::channel::ReplyHub;
use crate::codec::{self, Envelope, InterceptedRequest};
use crate::config::MediatorConfig;
use crate::error::MediatorError;
use crate::handler::{HandlerList, RequestHandler};
use crate::logging::{ExchangeLogger, TracingLogger};
use crate::reporter;
use crate::resolution::{self, Resolution};
use crate::transport::{self, InterceptClient, TransportEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, debug_span, error, Instrument};

/// Mediates intercepted requests against an ordered, read-only handler list.
pub struct Mediator {
    handlers: HandlerList,
    config: MediatorConfig,
    hub: Arc<ReplyHub>,
    logger: Arc<dyn ExchangeLogger>,
}

impl Mediator {
    pub fn new(handlers: Vec<Arc<dyn RequestHandler>>, config: MediatorConfig) -> Self {
        Self {
            handlers: handlers.into(),
            config,
            hub: Arc::new(ReplyHub::new()),
            logger: Arc::new(TracingLogger),
        }
    }

    /// Share an existing reply hub with a transport.
    pub fn with_hub(mut self, hub: Arc<ReplyHub>) -> Self {
        self.hub = hub;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn ExchangeLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn hub(&self) -> Arc<ReplyHub> {
        Arc::clone(&self.hub)
    }

    pub fn config(&self) -> &MediatorConfig {
        &self.config
    }

    pub fn handlers(&self) -> &[Arc<dyn RequestHandler>] {
        &self.handlers
    }

    /// In-memory transport wired to this mediator's hub.
    pub fn in_memory_transport(
        &self,
        buffer: usize,
    ) -> (InterceptClient, mpsc::Receiver<TransportEvent>) {
        transport::in_memory(self.hub(), buffer)
    }

    /// Handle one transport event. Never fails: every error is converted
    /// into an `INTERNAL_ERROR` verdict on the event's reply channel.
    pub async fn handle_event(&self, event: TransportEvent) {
        let channel = self.hub.open(&event.correlation_id);
        let span = debug_span!("intercept", correlation_id = %event.correlation_id);

        match self.process(&event.data).instrument(span).await {
            Ok(Some((request, resolution))) => {
                reporter::report(
                    channel,
                    &request,
                    resolution,
                    &self.config,
                    self.logger.as_ref(),
                );
            }
            Ok(None) => drop(channel),
            Err(err) => {
                reporter::report_error(channel, &err);
            }
        }
    }

    /// Decode, normalize and resolve. `Ok(None)` for envelopes this mediator ignores.
    async fn process(
        &self,
        raw: &str,
    ) -> Result<Option<(InterceptedRequest, Resolution)>, MediatorError> {
        let request = match codec::decode(raw)? {
            Envelope::Request(request) => request,
            Envelope::Other(tag) => {
                debug!("Ignoring {:?} message", tag);
                return Ok(None);
            }
        };

        let request = body::normalize(request)?;
        debug!("Resolving {} {}", request.method, request.url);

        let resolution = resolution::resolve(&request, &self.handlers).await?;
        Ok(Some((request, resolution)))
    }

    /// Consume events until the sender side closes, one task per event.
    /// Returns once every in-flight invocation has replied.
    pub async fn serve(self: Arc<Self>, mut events: mpsc::Receiver<TransportEvent>) {
        let mut tasks = JoinSet::new();

        while let Some(event) = events.recv().await {
            let mediator = Arc::clone(&self);
            tasks.spawn(async move { mediator.handle_event(event).await });

            while let Some(result) = tasks.try_join_next() {
                if let Err(e) = result {
                    error!("Mediator task failed: {}", e);
                }
            }
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!("Mediator task failed: {}", e);
            }
        }
        debug!("Mediator event stream closed");
    }
}
