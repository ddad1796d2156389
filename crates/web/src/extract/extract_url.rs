//! Extraction from the request target: the typed query string, the path and query
//! parameters, and the URI itself.

use crate::ExtractError;
use crate::body::OptionReqBody;
use crate::extract::{FromRequest, Query};
use crate::request::{PathParams, QueryParams, RequestContext};
use async_trait::async_trait;
use http::Uri;
use serde::de::DeserializeOwned;

/// Decoded with `serde_qs`, so `tags[]=a&tags[]=b` and `user[name]=John` work here as well.
#[async_trait]
impl<T> FromRequest for Query<T>
where
    T: DeserializeOwned + Send + 'static,
{
    async fn from_request(req: &RequestContext<'_>, _body: OptionReqBody) -> Result<Self, ExtractError> {
        let query = req.uri().query().unwrap_or_default();
        serde_qs::from_str::<T>(query).map(Query).map_err(ExtractError::invalid_query)
    }
}

#[async_trait]
impl FromRequest for PathParams {
    async fn from_request(req: &RequestContext<'_>, _body: OptionReqBody) -> Result<Self, ExtractError> {
        Ok(req.path_params().clone())
    }
}

#[async_trait]
impl FromRequest for QueryParams {
    async fn from_request(req: &RequestContext<'_>, _body: OptionReqBody) -> Result<Self, ExtractError> {
        Ok(req.query_params().clone())
    }
}

#[async_trait]
impl FromRequest for Uri {
    async fn from_request(req: &RequestContext<'_>, _body: OptionReqBody) -> Result<Self, ExtractError> {
        Ok(req.uri().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyConfig;
    use futures::stream;
    use http::{Request, StatusCode};
    use ingest_http::protocol::body::body_channel;
    use ingest_http::protocol::{Message, ParseError, PayloadSize, RequestHeader};
    use serde::Deserialize;

    #[derive(Deserialize, Debug, PartialEq)]
    struct Search {
        q: String,
        page: Option<u32>,
    }

    async fn query<T: FromRequest>(uri: &str) -> Result<T, ExtractError> {
        let header: RequestHeader = Request::builder().uri(uri).body(()).unwrap().into();
        let path_params = PathParams::empty();
        let query_params = QueryParams::parse(header.uri());
        let config = BodyConfig::default();
        let req = RequestContext::new(&header, &path_params, &query_params, &config);

        let mut payload = stream::iter(Vec::<Result<Message<(RequestHeader, PayloadSize)>, ParseError>>::new());
        let (body, _sender) = body_channel(&mut payload, PayloadSize::Empty);
        T::from_request(&req, body.into()).await
    }

    #[tokio::test]
    async fn typed_query() {
        let Query(search) = query::<Query<Search>>("/search?q=rust&page=2").await.unwrap();
        assert_eq!(search, Search { q: "rust".into(), page: Some(2) });
    }

    #[tokio::test]
    async fn missing_query_reads_as_empty() {
        let error = query::<Query<Search>>("/search").await.unwrap_err();
        assert!(matches!(error, ExtractError::InvalidQuery { .. }));
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn query_params() {
        let params = query::<QueryParams>("/search?q=caf%C3%A9").await.unwrap();
        assert_eq!(params.get("q"), Some("café"));
    }

    #[tokio::test]
    async fn optional_extractor_never_fails() {
        let search = query::<Option<Query<Search>>>("/search?page=1").await.unwrap();
        assert!(search.is_none());
    }
}
