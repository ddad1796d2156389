use crate::ExtractError;
use crate::body::OptionReqBody;
use crate::extract::FromRequest;
use crate::request::RequestContext;
use async_trait::async_trait;
use http::{HeaderMap, Method, Version};

#[async_trait]
impl FromRequest for Method {
    async fn from_request(req: &RequestContext<'_>, _body: OptionReqBody) -> Result<Self, ExtractError> {
        Ok(req.method().clone())
    }
}

#[async_trait]
impl FromRequest for HeaderMap {
    async fn from_request(req: &RequestContext<'_>, _body: OptionReqBody) -> Result<Self, ExtractError> {
        Ok(req.headers().clone())
    }
}

#[async_trait]
impl FromRequest for Version {
    async fn from_request(req: &RequestContext<'_>, _body: OptionReqBody) -> Result<Self, ExtractError> {
        Ok(req.version())
    }
}
