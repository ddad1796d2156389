//! Body extractors. Each one reads the whole body through the accumulator, inflates it when
//! it is compressed and decodes it according to its `Content-Type`.

use crate::ExtractError;
use crate::body::{BodyDecoder, BodyKind, MediaType, OptionReqBody, ParsedBody, read_body};
use crate::extract::{Form, FromRequest, Json};
use crate::request::RequestContext;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use tracing::debug;

fn media_type(req: &RequestContext<'_>) -> MediaType {
    MediaType::from_header(req.headers().get(CONTENT_TYPE))
}

#[async_trait]
impl FromRequest for Bytes {
    async fn from_request(req: &RequestContext<'_>, body: OptionReqBody) -> Result<Self, ExtractError> {
        read_body(req, body).await
    }
}

#[async_trait]
impl FromRequest for String {
    async fn from_request(req: &RequestContext<'_>, body: OptionReqBody) -> Result<Self, ExtractError> {
        media_type(req).ensure_utf8()?;
        let bytes = read_body(req, body).await?;
        String::from_utf8(bytes.into()).map_err(|_e| ExtractError::InvalidUtf8)
    }
}

/// The body decoded by its `Content-Type`: JSON, form, raw bytes, or absent when empty.
#[async_trait]
impl FromRequest for ParsedBody {
    async fn from_request(req: &RequestContext<'_>, body: OptionReqBody) -> Result<Self, ExtractError> {
        let media_type = media_type(req);
        let bytes = read_body(req, body).await?;
        debug!(kind = ?media_type.kind(), size = bytes.len(), "decode request body");
        BodyDecoder::new(req.body_config()).decode(&media_type, bytes)
    }
}

#[async_trait]
impl<T> FromRequest for Json<T>
where
    T: DeserializeOwned + Send + 'static,
{
    async fn from_request(req: &RequestContext<'_>, body: OptionReqBody) -> Result<Self, ExtractError> {
        let media_type = media_type(req);
        if media_type.kind() != BodyKind::Json {
            return Err(ExtractError::UnsupportedMediaType { expected: "application/json" });
        }
        media_type.ensure_utf8()?;

        let bytes = read_body(req, body).await?;
        if bytes.is_empty() {
            return Err(ExtractError::EmptyBody);
        }

        BodyDecoder::new(req.body_config()).decode_json(&bytes).map(Json)
    }
}

#[async_trait]
impl<T> FromRequest for Form<T>
where
    T: DeserializeOwned + Send + 'static,
{
    async fn from_request(req: &RequestContext<'_>, body: OptionReqBody) -> Result<Self, ExtractError> {
        let media_type = media_type(req);
        if media_type.kind() != BodyKind::Form {
            return Err(ExtractError::UnsupportedMediaType { expected: "application/x-www-form-urlencoded" });
        }
        media_type.ensure_utf8()?;

        let bytes = read_body(req, body).await?;
        if bytes.is_empty() {
            return Err(ExtractError::EmptyBody);
        }

        BodyDecoder::new(req.body_config()).decode_form(&bytes).map(Form)
    }
}
