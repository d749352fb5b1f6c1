//! Request handler seam.
//!
//! The mediator treats handlers as an opaque ordered list. Each exposes one
//! asynchronous operation, [`RequestHandler::try_resolve`], which may decline
//! the request, claim it without producing a response, or claim it with one.

mod route;

pub use route::{RouteDelay, RouteError, RouteHandler, RouteHandlerConfig};

use crate::codec::{InterceptedRequest, MockedResponse};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// What a single handler did with a request.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerOutcome {
    /// The handler does not match this request; try the next one.
    Skipped,
    /// The handler matched. `None` when its resolver produced no response.
    Claimed(Option<MockedResponse>),
}

/// Shared, read-only list of handlers in match order.
pub type HandlerList = Arc<[Arc<dyn RequestHandler>]>;

#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Short label used in logs and error locations, e.g. `GET /user/{id}`.
    fn description(&self) -> String;

    /// Attempt to resolve a response. An `Err` is a handler failure and is
    /// never treated as a non-match.
    async fn try_resolve(&self, request: &InterceptedRequest) -> anyhow::Result<HandlerOutcome>;
}

/// Handler backed by an async closure.
pub struct FnHandler<F> {
    description: String,
    resolver: F,
}

/// Build a handler from an async closure receiving an owned copy of the request.
pub fn handler_fn<F, Fut>(description: impl Into<String>, resolver: F) -> FnHandler<F>
where
    F: Fn(InterceptedRequest) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<HandlerOutcome>> + Send + 'static,
{
    FnHandler {
        description: description.into(),
        resolver,
    }
}

#[async_trait]
impl<F, Fut> RequestHandler for FnHandler<F>
where
    F: Fn(InterceptedRequest) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<HandlerOutcome>> + Send + 'static,
{
    fn description(&self) -> String {
        self.description.clone()
    }

    async fn try_resolve(&self, request: &InterceptedRequest) -> anyhow::Result<HandlerOutcome> {
        (self.resolver)(request.clone()).await
    }
}
