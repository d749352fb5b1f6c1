//! Wire codec for the interception protocol.
//!
//! - `envelope`: inbound decoding and outbound verdict messages
//! - `request`: the typed intercepted request and its projection from wire form
//! - `headers`: ordered header multi-map

mod envelope;
mod headers;
mod request;

pub use envelope::{
    decode, encode, Envelope, InternalErrorPayload, MockedResponse, OutboundMessage, REQUEST_TAG,
};
pub use headers::HeaderList;
pub use request::{InterceptedRequest, RequestBody};
