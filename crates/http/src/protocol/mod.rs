//! Protocol types shared by the codec, the connection and handlers.
//!
//! - [`Message`], [`PayloadItem`], [`PayloadSize`]: the header-then-chunks-then-eof item stream
//! - [`RequestHeader`] / [`ResponseHead`]: message heads
//! - [`body`]: the streaming request body handed to handlers
//! - [`HttpError`], [`ParseError`], [`SendError`]: wire-level errors

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod request;
pub use request::RequestHeader;

mod response;
pub use response::ResponseHead;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;

pub mod body;
