//! Transports delivering intercepted-request events to the mediator.
//!
//! Every transport follows the same contract: register a reply slot in the
//! [`ReplyHub`] under the event's correlation id, then hand the event to the
//! mediator. The reply comes back through the slot.

pub mod stdio;

use crate::channel::{ChannelError, CorrelationId, ReplyHub};
use crate::codec::OutboundMessage;
use std::sync::Arc;
use tokio::sync::mpsc;

/// One raw inbound message and the token its reply is keyed by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    pub correlation_id: CorrelationId,
    pub data: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Mediator is no longer accepting events")]
    Closed,
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Client half of the in-memory transport, used by embedders and tests to
/// play the part of the interception layer.
#[derive(Clone)]
pub struct InterceptClient {
    hub: Arc<ReplyHub>,
    events: mpsc::Sender<TransportEvent>,
}

impl InterceptClient {
    /// Send a raw wire message and wait for its verdict.
    ///
    /// Returns `Ok(None)` when the mediator released the channel without a
    /// verdict, which only happens for envelopes it ignores.
    pub async fn intercept(
        &self,
        data: impl Into<String>,
    ) -> Result<Option<OutboundMessage>, TransportError> {
        let correlation_id = CorrelationId::new();
        let reply = self.hub.register(correlation_id.clone())?;

        let event = TransportEvent {
            correlation_id: correlation_id.clone(),
            data: data.into(),
        };
        if self.events.send(event).await.is_err() {
            self.hub.cancel(&correlation_id);
            return Err(TransportError::Closed);
        }

        Ok(reply.await.ok())
    }
}

/// Create an in-memory transport bound to `hub`.
pub fn in_memory(
    hub: Arc<ReplyHub>,
    buffer: usize,
) -> (InterceptClient, mpsc::Receiver<TransportEvent>) {
    let (events, receiver) = mpsc::channel(buffer);
    (InterceptClient { hub, events }, receiver)
}
