//! Mediation core between a request interception layer and mock handlers.
//!
//! An intercepted request arrives as a raw wire message on a transport. The
//! [`Mediator`] decodes it, normalizes its body, walks the ordered handler list
//! and sends back exactly one verdict (`MOCK_SUCCESS`, `MOCK_NOT_FOUND` or
//! `INTERNAL_ERROR`) on a reply channel keyed by the event's correlation id.

pub mod body;
pub mod channel;
pub mod codec;
pub mod config;
pub mod error;
pub mod handler;
pub mod logging;
pub mod mediator;
pub mod metrics;
pub mod reporter;
pub mod resolution;
pub mod transport;

pub use channel::{ChannelError, CorrelationId, ReplyChannel, ReplyHub};
pub use codec::{HeaderList, InterceptedRequest, MockedResponse, OutboundMessage, RequestBody};
pub use config::{MediatorConfig, MediatorFile};
pub use error::{ErrorReport, MediatorError};
pub use handler::{handler_fn, HandlerOutcome, RequestHandler, RouteHandler};
pub use mediator::Mediator;
pub use resolution::Resolution;
pub use transport::{InterceptClient, TransportEvent};
