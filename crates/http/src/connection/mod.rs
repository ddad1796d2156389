//! The per-connection request loop.
//!
//! [`HttpConnection`] reads requests one after another from a byte stream, runs the
//! handler for each while streaming its body, and writes the responses back. It honors
//! keep-alive, answers `Expect: 100-continue`, drains unread bodies, and gives up on a
//! request quietly when the peer disconnects in the middle of its body.

mod http_connection;

pub use http_connection::HttpConnection;
