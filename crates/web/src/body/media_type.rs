//! Picks the decoding strategy of a body from its `Content-Type`.

use crate::ExtractError;
use http::HeaderValue;
use mime::Mime;

/// The decoding strategy selected for a body.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BodyKind {
    Json,
    Form,
    Raw,
}

/// The parts of a `Content-Type` header that matter for decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    kind: BodyKind,
    charset: Option<String>,
}

impl MediaType {
    /// Classifies a `Content-Type` value; a missing or unparsable header means raw bytes.
    ///
    /// ```
    /// use http::HeaderValue;
    /// use ingest_web::body::{BodyKind, MediaType};
    ///
    /// let value = HeaderValue::from_static("application/json; charset=utf-8");
    /// assert_eq!(MediaType::from_header(Some(&value)).kind(), BodyKind::Json);
    /// assert_eq!(MediaType::from_header(None).kind(), BodyKind::Raw);
    /// ```
    pub fn from_header(content_type: Option<&HeaderValue>) -> Self {
        let Some(mime) = content_type.and_then(|value| value.to_str().ok()).and_then(|s| s.parse::<Mime>().ok()) else {
            return Self::raw();
        };

        let kind = if mime.type_() != mime::APPLICATION {
            BodyKind::Raw
        } else if mime.subtype() == mime::JSON {
            BodyKind::Json
        } else if mime.subtype() == mime::WWW_FORM_URLENCODED {
            BodyKind::Form
        } else {
            BodyKind::Raw
        };
        let charset = mime.get_param(mime::CHARSET).map(|charset| charset.as_str().to_ascii_lowercase());

        Self { kind, charset }
    }

    pub fn raw() -> Self {
        Self { kind: BodyKind::Raw, charset: None }
    }

    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    /// Text bodies are only decoded as UTF-8; a missing charset is taken as UTF-8.
    pub fn ensure_utf8(&self) -> Result<(), ExtractError> {
        match self.charset() {
            None | Some("utf-8" | "utf8") => Ok(()),
            Some(charset) => Err(ExtractError::UnsupportedCharset { charset: charset.to_string() }),
        }
    }
}
