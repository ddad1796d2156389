//! The HTTP server: accepts connections, routes each request and invokes its handler.
//!
//! ```no_run
//! use ingest_web::body::ParsedBody;
//! use ingest_web::router::{Router, post};
//! use ingest_web::{Server, handler_fn};
//!
//! async fn echo(body: ParsedBody) -> ParsedBody {
//!     body
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let router = Router::builder().route("/echo", post(handler_fn(echo))).build().unwrap();
//!     let server = Server::builder().router(router).bind("127.0.0.1:8080").build().unwrap();
//!     server.start().await;
//! }
//! ```

use crate::body::{BodyConfig, OptionReqBody, ResponseBody};
use crate::handler::{RequestHandler, handler_fn};
use crate::request::{PathParams, QueryParams, RequestContext};
use crate::responder::NotFound;
use crate::router::{RouteResult, Router};
use async_trait::async_trait;
use http::{Request, Response};
use ingest_http::connection::HttpConnection;
use ingest_http::handler::Handler;
use ingest_http::protocol::RequestHeader;
use ingest_http::protocol::body::ReqBody;
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::select;
use tokio_util::task::TaskTracker;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

pub struct ServerBuilder {
    router: Option<Router>,
    default_handler: Option<Box<dyn RequestHandler>>,
    address: Option<io::Result<Vec<SocketAddr>>>,
    body_config: BodyConfig,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { router: None, default_handler: None, address: None, body_config: BodyConfig::default() }
    }

    /// The addresses to listen on; resolution errors are reported by [`ServerBuilder::build`].
    pub fn bind<A: ToSocketAddrs>(mut self, address: A) -> Self {
        self.address = Some(address.to_socket_addrs().map(|addrs| addrs.collect()));
        self
    }

    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    /// Answers requests no route matched, a plain 404 when unset.
    pub fn default_handler(mut self, request_handler: impl RequestHandler + 'static) -> Self {
        self.default_handler = Some(Box::new(request_handler));
        self
    }

    pub fn body_config(mut self, body_config: BodyConfig) -> Self {
        self.body_config = body_config;
        self
    }

    pub fn build(self) -> Result<Server, ServerBuildError> {
        let router = self.router.ok_or(ServerBuildError::MissingRouter)?;
        let address = self.address.ok_or(ServerBuildError::MissingAddress)?.map_err(|source| ServerBuildError::InvalidAddress { source })?;
        let default_handler = self.default_handler.unwrap_or_else(|| Box::new(handler_fn(not_found)));

        Ok(Server { router, default_handler, address, body_config: self.body_config })
    }
}

impl fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerBuilder").field("router", &self.router).field("address", &self.address).finish_non_exhaustive()
    }
}

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("router must be set")]
    MissingRouter,
    #[error("address must be set")]
    MissingAddress,
    #[error("invalid address: {source}")]
    InvalidAddress {
        #[source]
        source: io::Error,
    },
}

async fn not_found() -> NotFound {
    NotFound
}

pub struct Server {
    router: Router,
    default_handler: Box<dyn RequestHandler>,
    address: Vec<SocketAddr>,
    body_config: BodyConfig,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Binds the configured address and serves until ctrl-c.
    pub async fn start(self) {
        let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            debug!("global tracing subscriber already set");
        }

        info!(address = ?self.address, "start listening");
        let tcp_listener = match TcpListener::bind(self.address.as_slice()).await {
            Ok(tcp_listener) => tcp_listener,
            Err(e) => {
                error!(cause = %e, "bind server error");
                return;
            }
        };

        self.serve(tcp_listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(cause = %e, "failed to listen for ctrl-c");
            }
        })
        .await;
    }

    /// Serves connections from `tcp_listener` until `shutdown` resolves, then waits for the
    /// connections in flight to finish.
    pub async fn serve<F>(self, tcp_listener: TcpListener, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let handler = Arc::new(self);
        let tracker = TaskTracker::new();
        tokio::pin!(shutdown);

        loop {
            let (tcp_stream, remote_addr) = select! {
                _ = &mut shutdown => {
                    info!("shutdown signal received, stop accepting connections");
                    break;
                }
                accepted = tcp_listener.accept() => match accepted {
                    Ok(stream_and_addr) => stream_and_addr,
                    Err(e) => {
                        warn!(cause = %e, "failed to accept");
                        continue;
                    }
                },
            };

            let handler = handler.clone();
            tracker.spawn(async move {
                let (reader, writer) = tcp_stream.into_split();
                let connection = HttpConnection::new(reader, writer);
                match connection.process(handler).await {
                    Ok(()) => debug!(%remote_addr, "finished process, connection shutdown"),
                    Err(e) => error!(%remote_addr, cause = %e, "service has error, connection shutdown"),
                }
            });
        }

        tracker.close();
        tracker.wait().await;
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("router", &self.router)
            .field("address", &self.address)
            .field("body_config", &self.body_config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Handler for Server {
    type RespBody = ResponseBody;
    type Error = Box<dyn Error + Send + Sync>;

    async fn call(&self, req: Request<ReqBody>) -> Result<Response<Self::RespBody>, Self::Error> {
        let (parts, body) = req.into_parts();
        let header = RequestHeader::from(parts);
        let req_body = OptionReqBody::from(body);
        let query_params = QueryParams::parse(header.uri());

        let response = match self.router.at(&header) {
            RouteResult::Found { item, params } => {
                let request_context = RequestContext::new(&header, &params, &query_params, &self.body_config);
                item.handler().invoke(&request_context, req_body).await
            }
            RouteResult::NotFound => {
                debug!(method = %header.method(), path = header.path(), "no route matched");
                let params = PathParams::empty();
                let request_context = RequestContext::new(&header, &params, &query_params, &self.body_config);
                self.default_handler.invoke(&request_context, req_body).await
            }
        };

        Ok(response)
    }
}
