//! Response handling module that converts handler results into HTTP responses.
//!
//! The [`Responder`] trait defines how a handler's return value becomes a response.
//! It is implemented for text, bytes, [`Json`], [`ParsedBody`], status code pairs,
//! `Option`, `Result`, ready-made `Response`s and the extraction errors.

use crate::body::{ParsedBody, ResponseBody};
use crate::extract::Json;
use crate::{ExtractError, RequestContext};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Response, StatusCode};
use serde::Serialize;
use std::convert::Infallible;
use tracing::error;

/// A trait for types that can be converted into HTTP responses.
pub trait Responder {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody>;
}

/// The Ok and Err variants must both implement Responder.
impl<T: Responder, E: Responder> Responder for Result<T, E> {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody> {
        match self {
            Ok(t) => t.response_to(req),
            Err(e) => e.response_to(req),
        }
    }
}

/// None case returns an empty response.
impl<T: Responder> Responder for Option<T> {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody> {
        match self {
            Some(t) => t.response_to(req),
            None => Response::new(ResponseBody::empty()),
        }
    }
}

impl<B> Responder for Response<B>
where
    B: Into<ResponseBody>,
{
    fn response_to(self, _req: &RequestContext) -> Response<ResponseBody> {
        self.map(Into::into)
    }
}

impl<T: Responder> Responder for (StatusCode, T) {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody> {
        let (status, responder) = self;
        let mut response = responder.response_to(req);
        *response.status_mut() = status;
        response
    }
}

impl<T: Responder> Responder for (T, StatusCode) {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody> {
        let (responder, status) = self;
        (status, responder).response_to(req)
    }
}

impl<T: Responder> Responder for Box<T> {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody> {
        (*self).response_to(req)
    }
}

impl Responder for () {
    fn response_to(self, _req: &RequestContext) -> Response<ResponseBody> {
        Response::new(ResponseBody::empty())
    }
}

impl Responder for &'static str {
    fn response_to(self, _req: &RequestContext) -> Response<ResponseBody> {
        with_content_type(ResponseBody::from(self), "text/plain; charset=utf-8")
    }
}

impl Responder for String {
    fn response_to(self, _req: &RequestContext) -> Response<ResponseBody> {
        with_content_type(ResponseBody::from(self), "text/plain; charset=utf-8")
    }
}

impl Responder for Bytes {
    fn response_to(self, _req: &RequestContext) -> Response<ResponseBody> {
        with_content_type(ResponseBody::from(self), "application/octet-stream")
    }
}

/// Serialized with `serde_json`; a value that fails to serialize answers 500.
impl<T: Serialize> Responder for Json<T> {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody> {
        match serde_json::to_vec(&self.0) {
            Ok(json) => with_content_type(ResponseBody::from(json), "application/json"),
            Err(e) => {
                error!(cause = %e, "failed to serialize json response");
                (StatusCode::INTERNAL_SERVER_ERROR, ()).response_to(req)
            }
        }
    }
}

/// Echoes a parsed body: JSON and form values as JSON, raw bytes as they came.
impl Responder for ParsedBody {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody> {
        match self {
            ParsedBody::Json(value) => Json(value).response_to(req),
            ParsedBody::Form(map) => Json(map).response_to(req),
            ParsedBody::Raw(bytes) => bytes.response_to(req),
            ParsedBody::Absent => (StatusCode::NO_CONTENT, ()).response_to(req),
        }
    }
}

/// The response for a request no route matched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotFound;

impl Responder for NotFound {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody> {
        (StatusCode::NOT_FOUND, "404 Not Found").response_to(req)
    }
}

impl Responder for ExtractError {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody> {
        (self.status_code(), self.to_string()).response_to(req)
    }
}

impl Responder for Infallible {
    fn response_to(self, _req: &RequestContext) -> Response<ResponseBody> {
        match self {}
    }
}

fn with_content_type(body: ResponseBody, content_type: &'static str) -> Response<ResponseBody> {
    let mut response = Response::new(body);
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyConfig;
    use crate::{PathParams, QueryParams};
    use http::Request;
    use http_body_util::BodyExt;
    use ingest_http::protocol::RequestHeader;
    use serde_json::json;

    async fn respond<R: Responder>(responder: R) -> (StatusCode, Option<String>, Bytes) {
        let header: RequestHeader = Request::builder().uri("/").body(()).unwrap().into();
        let (path_params, query_params, config) = (PathParams::empty(), QueryParams::default(), BodyConfig::default());
        let req = RequestContext::new(&header, &path_params, &query_params, &config);

        let response = responder.response_to(&req);
        let content_type = response.headers().get(CONTENT_TYPE).map(|v| v.to_str().unwrap().to_string());
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, content_type, body)
    }

    #[tokio::test]
    async fn text_is_plain_utf8() {
        let (status, content_type, body) = respond("hello").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("text/plain; charset=utf-8"));
        assert_eq!(body, Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn json_is_serialized() {
        let (status, content_type, body) = respond(Json(json!({"name": "John"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert_eq!(body, Bytes::from_static(br#"{"name":"John"}"#));
    }

    #[tokio::test]
    async fn extract_error_carries_its_status() {
        let (status, _, body) = respond(ExtractError::limit_exceeded(10)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body, Bytes::from("request body exceeds the limit of 10 bytes"));
    }

    #[tokio::test]
    async fn not_found() {
        let (status, _, body) = respond(NotFound).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, Bytes::from_static(b"404 Not Found"));
    }

    #[tokio::test]
    async fn absent_body_is_no_content() {
        let (status, _, body) = respond(ParsedBody::Absent).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_empty());
    }
}
