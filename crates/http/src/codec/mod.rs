//! HTTP/1.1 codecs for `tokio_util::codec` framed IO.
//!
//! - [`RequestDecoder`]: request head, then body chunks and the end signal
//!   (`Content-Length` or chunked framing)
//! - [`ResponseEncoder`]: response head, then body with the announced framing
//!
//! ```
//! use bytes::BytesMut;
//! use ingest_http::codec::RequestDecoder;
//! use ingest_http::protocol::Message;
//! use tokio_util::codec::Decoder;
//!
//! let mut decoder = RequestDecoder::new();
//! let mut buffer = BytesMut::from("GET /user/123 HTTP/1.1\r\nHost: localhost\r\n\r\n");
//! let message = decoder.decode(&mut buffer).unwrap();
//! assert!(matches!(message, Some(Message::Header(_))));
//! ```

mod body;
mod header;
mod request_decoder;
mod response_encoder;

pub use request_decoder::RequestDecoder;
pub use response_encoder::ResponseEncoder;
