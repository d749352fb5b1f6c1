//! Correlation-keyed one-shot reply channels.
//!
//! The transport registers a slot per inbound event before dispatching it. The
//! mediator opens the slot, which removes it from the hub, and sends at most
//! one verdict through it. Dropping an unsent [`ReplyChannel`] closes the slot,
//! so the waiting caller always observes either one verdict or "no reply".

use crate::codec::OutboundMessage;
use crate::metrics;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::oneshot;
use tracing::debug;

/// Token binding an inbound event to its reply.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("A reply is already pending for correlation id {0}")]
    AlreadyPending(CorrelationId),
}

/// Registry of pending reply slots.
#[derive(Default)]
pub struct ReplyHub {
    pending: Mutex<HashMap<CorrelationId, oneshot::Sender<OutboundMessage>>>,
}

impl ReplyHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a slot for `id` and return the receiving half.
    ///
    /// An id that is still pending is rejected; the existing slot is left untouched.
    pub fn register(
        &self,
        id: CorrelationId,
    ) -> Result<oneshot::Receiver<OutboundMessage>, ChannelError> {
        match self.pending.lock().entry(id) {
            Entry::Occupied(entry) => Err(ChannelError::AlreadyPending(entry.key().clone())),
            Entry::Vacant(entry) => {
                let (tx, rx) = oneshot::channel();
                entry.insert(tx);
                Ok(rx)
            }
        }
    }

    /// Take exclusive ownership of the slot for `id`.
    pub fn open(&self, id: &CorrelationId) -> ReplyChannel {
        let sender = self.pending.lock().remove(id);
        if sender.is_none() {
            debug!("No pending reply slot for {}", id);
        }
        ReplyChannel {
            correlation_id: id.clone(),
            sender,
        }
    }

    /// Drop a slot that was registered but never dispatched.
    pub fn cancel(&self, id: &CorrelationId) {
        self.pending.lock().remove(id);
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }
}

/// One-shot reply handle owned by a single mediator invocation.
pub struct ReplyChannel {
    correlation_id: CorrelationId,
    sender: Option<oneshot::Sender<OutboundMessage>>,
}

impl ReplyChannel {
    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    /// Send the verdict, consuming the channel. Returns whether the caller was
    /// still waiting for it. Only delivered verdicts are counted.
    pub fn send(mut self, message: OutboundMessage) -> bool {
        let Some(sender) = self.sender.take() else {
            debug!(
                "Dropping {} for {}: no caller waiting",
                message.tag(),
                self.correlation_id
            );
            return false;
        };
        let tag = message.tag();
        if sender.send(message).is_err() {
            debug!("Caller for {} went away before {}", self.correlation_id, tag);
            return false;
        }
        metrics::record_verdict(tag);
        true
    }
}

impl Drop for ReplyChannel {
    fn drop(&mut self) {
        if self.sender.is_some() {
            debug!("Reply channel {} released without a verdict", self.correlation_id);
        }
    }
}
