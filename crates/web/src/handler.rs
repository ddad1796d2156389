use crate::body::{OptionReqBody, ResponseBody, finish_body};
use crate::extract::FromRequest;
use crate::fn_trait::FnTrait;
use crate::request::RequestContext;
use crate::responder::Responder;
use async_trait::async_trait;
use http::Response;
use std::marker::PhantomData;
use tracing::warn;

/// Turns a routed request into a response.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn invoke(&self, req: &RequestContext<'_>, req_body: OptionReqBody) -> Response<ResponseBody>;
}

/// a `FnTrait` holder which represents any async Fn
pub struct FnHandler<F, Args> {
    f: F,
    _phantom: PhantomData<fn(Args)>,
}

impl<F, Args> FnHandler<F, Args>
where
    F: FnTrait<Args>,
{
    fn new(f: F) -> Self {
        Self { f, _phantom: PhantomData }
    }
}

/// Makes a handler of an async function whose arguments are all [`FromRequest`] extractors.
///
/// The arguments are extracted in order; the first one that fails answers the request
/// with its error and the function is not called. A body none of the arguments took is
/// still read to its end before the call, so the function never runs for a request whose
/// body was cut short.
pub fn handler_fn<F, Args>(f: F) -> FnHandler<F, Args>
where
    F: FnTrait<Args>,
{
    FnHandler::new(f)
}

#[async_trait]
impl<F, Args> RequestHandler for FnHandler<F, Args>
where
    F: FnTrait<Args>,
    F::Output: Responder,
    Args: FromRequest,
{
    async fn invoke(&self, req: &RequestContext<'_>, req_body: OptionReqBody) -> Response<ResponseBody> {
        let args = match Args::from_request(req, req_body.clone()).await {
            Ok(args) => args,
            Err(e) => {
                warn!(cause = %e, method = %req.method(), path = req.path(), "failed to extract request");
                return e.response_to(req);
            }
        };

        if let Err(e) = finish_body(req, &req_body).await {
            warn!(cause = %e, method = %req.method(), path = req.path(), "failed to read unused request body");
            return e.response_to(req);
        }

        self.f.call(args).await.response_to(req)
    }
}

impl<F, Args> std::fmt::Debug for FnHandler<F, Args> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler").field("f", &std::any::type_name::<F>()).finish()
    }
}
