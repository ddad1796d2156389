//! Request bodies in, response bodies out.
//!
//! A request body travels through these steps before a handler sees it:
//!
//! 1. [`ChunkAccumulator`]: chunks are buffered in arrival order up to [`BodyConfig::limit`]
//! 2. [`ContentEncoding`]: gzip, deflate and br bodies are inflated
//! 3. [`MediaType`]: the `Content-Type` selects JSON, form or raw decoding
//! 4. [`BodyDecoder`]: the complete body becomes a [`ParsedBody`]

mod accumulator;
mod config;
mod decoder;
mod inflate;
mod media_type;

pub use accumulator::{ChunkAccumulator, accumulate};
pub use config::{BodyConfig, BodyConfigBuilder, FormMode};
pub use decoder::{BodyDecoder, ParsedBody};
pub use inflate::ContentEncoding;
pub use media_type::{BodyKind, MediaType};

use crate::{ExtractError, RequestContext};
use bytes::Bytes;
use http_body::Body as HttpBody;
use http_body::{Frame, SizeHint};
use http_body_util::combinators::UnsyncBoxBody;
use ingest_http::protocol::HttpError;
use ingest_http::protocol::body::ReqBody;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::Mutex;

/// The request body shared by all extractors of one request; only one of them can take it.
#[derive(Debug, Clone)]
pub struct OptionReqBody {
    inner: Arc<Mutex<Option<ReqBody>>>,
}

impl From<ReqBody> for OptionReqBody {
    fn from(body: ReqBody) -> Self {
        OptionReqBody { inner: Arc::new(Mutex::new(Some(body))) }
    }
}

impl OptionReqBody {
    pub async fn can_consume(&self) -> bool {
        let guard = self.inner.lock().await;
        guard.is_some()
    }

    pub async fn take(&self) -> Result<ReqBody, ExtractError> {
        self.inner.lock().await.take().ok_or(ExtractError::BodyConsumed)
    }
}

/// Reads the whole body of a request: accumulated within the limit, then inflated.
pub(crate) async fn read_body(req: &RequestContext<'_>, body: OptionReqBody) -> Result<Bytes, ExtractError> {
    let config = req.body_config();
    let encoding = ContentEncoding::from_headers(req.headers(), config.inflate())?;

    let req_body = body.take().await?;
    let bytes = accumulate(req_body, config.limit()).await?;

    encoding.inflate(bytes, config.limit())
}

/// Reads to the end a body no extractor took, so a handler never runs on an incomplete request.
///
/// The body still counts against [`BodyConfig::limit`]; an aborted body is an error.
pub(crate) async fn finish_body(req: &RequestContext<'_>, body: &OptionReqBody) -> Result<(), ExtractError> {
    let req_body = match body.take().await {
        Ok(req_body) => req_body,
        Err(ExtractError::BodyConsumed) => return Ok(()),
        Err(e) => return Err(e),
    };

    accumulate(req_body, req.body_config().limit()).await.map(|_unread| ())
}

/// The body of a response, either one buffer or a boxed stream of chunks.
#[derive(Debug)]
pub struct ResponseBody {
    inner: Kind,
}

#[derive(Debug)]
enum Kind {
    Once(Option<Bytes>),
    Stream(UnsyncBoxBody<Bytes, HttpError>),
}

impl ResponseBody {
    pub fn empty() -> Self {
        Self { inner: Kind::Once(None) }
    }

    pub fn once(bytes: Bytes) -> Self {
        if bytes.is_empty() { Self::empty() } else { Self { inner: Kind::Once(Some(bytes)) } }
    }

    pub fn stream<B>(body: B) -> Self
    where
        B: HttpBody<Data = Bytes, Error = HttpError> + Send + 'static,
    {
        Self { inner: Kind::Stream(UnsyncBoxBody::new(body)) }
    }
}

impl From<String> for ResponseBody {
    fn from(value: String) -> Self {
        Self::once(Bytes::from(value))
    }
}

impl From<Vec<u8>> for ResponseBody {
    fn from(value: Vec<u8>) -> Self {
        Self::once(Bytes::from(value))
    }
}

impl From<Bytes> for ResponseBody {
    fn from(value: Bytes) -> Self {
        Self::once(value)
    }
}

impl From<()> for ResponseBody {
    fn from((): ()) -> Self {
        Self::empty()
    }
}

impl From<Option<Bytes>> for ResponseBody {
    fn from(option: Option<Bytes>) -> Self {
        match option {
            Some(bytes) => Self::once(bytes),
            None => Self::empty(),
        }
    }
}

impl From<&'static str> for ResponseBody {
    fn from(value: &'static str) -> Self {
        Self::once(Bytes::from_static(value.as_bytes()))
    }
}

impl HttpBody for ResponseBody {
    type Data = Bytes;
    type Error = HttpError;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match &mut self.get_mut().inner {
            Kind::Once(option_bytes) => Poll::Ready(option_bytes.take().map(|bytes| Ok(Frame::data(bytes)))),
            Kind::Stream(box_body) => Pin::new(box_body).poll_frame(cx),
        }
    }

    fn is_end_stream(&self) -> bool {
        match &self.inner {
            Kind::Once(option_bytes) => option_bytes.is_none(),
            Kind::Stream(box_body) => box_body.is_end_stream(),
        }
    }

    fn size_hint(&self) -> SizeHint {
        match &self.inner {
            Kind::Once(None) => SizeHint::with_exact(0),
            Kind::Once(Some(bytes)) => SizeHint::with_exact(bytes.len() as u64),
            Kind::Stream(box_body) => box_body.size_hint(),
        }
    }
}
