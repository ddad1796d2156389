//! Errors raised while turning a request into handler arguments.

use http::StatusCode;
use ingest_http::protocol::ParseError;
use std::io;
use thiserror::Error;

/// Why a request body, query string or other request part could not be extracted.
///
/// Every variant maps to the status code the client is answered with, see
/// [`ExtractError::status_code`].
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The peer disconnected before the end of the request body.
    #[error("connection aborted after {received} bytes of the request body")]
    ConnectionAborted { received: u64 },

    #[error("request body exceeds the limit of {limit} bytes")]
    LimitExceeded { limit: usize },

    #[error("malformed json body: {source}")]
    MalformedJson {
        #[source]
        source: serde_json::Error,
    },

    /// Valid JSON whose top-level value strict mode does not accept.
    #[error("json body must be an object or an array, found {found}")]
    UnsupportedJsonRoot { found: &'static str },

    #[error("request body is not valid utf-8")]
    InvalidUtf8,

    #[error("malformed form body: {reason}")]
    MalformedForm { reason: String },

    #[error("form body has more than {limit} parameters")]
    TooManyParameters { limit: usize },

    #[error("unsupported charset: {charset}")]
    UnsupportedCharset { charset: String },

    #[error("unsupported content encoding: {encoding}")]
    UnsupportedEncoding { encoding: String },

    /// The compressed body could not be inflated.
    #[error("malformed {encoding} body: {source}")]
    MalformedEncoding {
        encoding: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("unsupported media type, expect {expected}")]
    UnsupportedMediaType { expected: &'static str },

    #[error("request body is empty")]
    EmptyBody,

    #[error("invalid query string: {reason}")]
    InvalidQuery { reason: String },

    #[error("request body has been consumed")]
    BodyConsumed,

    #[error("failed to read request body: {source}")]
    Transport {
        #[source]
        source: ParseError,
    },
}

impl ExtractError {
    pub fn limit_exceeded(limit: usize) -> Self {
        Self::LimitExceeded { limit }
    }

    pub fn malformed_form<S: ToString>(reason: S) -> Self {
        Self::MalformedForm { reason: reason.to_string() }
    }

    pub fn invalid_query<S: ToString>(reason: S) -> Self {
        Self::InvalidQuery { reason: reason.to_string() }
    }

    #[inline]
    pub fn is_connection_aborted(&self) -> bool {
        matches!(self, Self::ConnectionAborted { .. })
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ConnectionAborted { .. }
            | Self::MalformedJson { .. }
            | Self::UnsupportedJsonRoot { .. }
            | Self::InvalidUtf8
            | Self::MalformedForm { .. }
            | Self::MalformedEncoding { .. }
            | Self::EmptyBody
            | Self::InvalidQuery { .. }
            | Self::Transport { .. } => StatusCode::BAD_REQUEST,
            Self::LimitExceeded { .. } | Self::TooManyParameters { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedCharset { .. } | Self::UnsupportedEncoding { .. } | Self::UnsupportedMediaType { .. } => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            Self::BodyConsumed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ParseError> for ExtractError {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::ConnectionAborted { received } => Self::ConnectionAborted { received },
            source => Self::Transport { source },
        }
    }
}
