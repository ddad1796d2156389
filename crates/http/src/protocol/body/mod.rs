//! Streaming request bodies.
//!
//! A body is split into two halves that talk over channels:
//!
//! - [`ReqBody`]: the consumer, an `http_body::Body` handed to the request handler
//! - [`BodySender`]: the producer, owned by the connection, pulling payload items off the wire
//!
//! The producer only reads a chunk when the consumer asks for one, so a slow handler
//! applies backpressure to the socket. Whatever the handler leaves unread is drained
//! afterwards to keep the connection usable for the next request.

mod req_body;

pub use req_body::BodySender;
pub use req_body::ReqBody;
pub use req_body::body_channel;
