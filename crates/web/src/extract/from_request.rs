use crate::ExtractError;
use crate::body::OptionReqBody;
use crate::request::RequestContext;
use async_trait::async_trait;

/// A handler argument built from the request.
///
/// Extractors that need the body take it from `body`; the body can only be taken once per
/// request, a second attempt fails with [`ExtractError::BodyConsumed`].
#[async_trait]
pub trait FromRequest: Sized + Send + 'static {
    async fn from_request(req: &RequestContext<'_>, body: OptionReqBody) -> Result<Self, ExtractError>;
}

/// `None` when `T` could not be extracted. A body aborted by the peer still fails.
#[async_trait]
impl<T: FromRequest> FromRequest for Option<T> {
    async fn from_request(req: &RequestContext<'_>, body: OptionReqBody) -> Result<Self, ExtractError> {
        match T::from_request(req, body).await {
            Ok(t) => Ok(Some(t)),
            Err(e) if e.is_connection_aborted() => Err(e),
            Err(_e) => Ok(None),
        }
    }
}

/// Hands the extraction error to the handler instead of answering with it,
/// except for a body aborted by the peer.
#[async_trait]
impl<T: FromRequest> FromRequest for Result<T, ExtractError> {
    async fn from_request(req: &RequestContext<'_>, body: OptionReqBody) -> Result<Self, ExtractError> {
        match T::from_request(req, body).await {
            Err(e) if e.is_connection_aborted() => Err(e),
            result => Ok(result),
        }
    }
}
