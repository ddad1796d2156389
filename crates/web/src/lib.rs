//! Request-body ingestion and routing on top of `ingest-http`.
//!
//! A request is routed by method and path, its body is accumulated chunk by chunk within a
//! byte limit, inflated when compressed, and decoded according to its `Content-Type` before
//! the handler runs. Handlers are plain async functions whose arguments are extracted from
//! the request:
//!
//! ```no_run
//! use ingest_web::body::ParsedBody;
//! use ingest_web::extract::Json;
//! use ingest_web::router::{Router, get, post};
//! use ingest_web::{PathParams, Server, handler_fn};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct User {
//!     name: String,
//! }
//!
//! async fn create_user(Json(user): Json<User>) -> String {
//!     format!("created {}", user.name)
//! }
//!
//! async fn show_user(params: PathParams) -> String {
//!     format!("user {}", params.get("id").unwrap_or_default())
//! }
//!
//! async fn echo(body: ParsedBody) -> ParsedBody {
//!     body
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let router = Router::builder()
//!         .route("/users", post(handler_fn(create_user)))
//!         .route("/users/:id", get(handler_fn(show_user)))
//!         .route("/echo", post(handler_fn(echo)))
//!         .build()
//!         .unwrap();
//!
//!     Server::builder().router(router).bind("127.0.0.1:8080").build().unwrap().start().await;
//! }
//! ```
//!
//! Failures to read or decode a body are [`ExtractError`]s, answered with their status code
//! (400, 413 or 415) unless the handler asks for a `Result` and deals with them itself. A body
//! cut short by the peer never reaches a decoder and the request gets no response.

pub mod body;
mod error;
pub mod extract;
mod fn_trait;
mod handler;
mod request;
mod responder;
pub mod router;
mod server;

pub use body::{OptionReqBody, ParsedBody, ResponseBody};
pub use error::ExtractError;
pub use fn_trait::FnTrait;
pub use handler::{FnHandler, RequestHandler, handler_fn};
pub use request::{PathParams, QueryParams, RequestContext};
pub use responder::{NotFound, Responder};
pub use router::Router;
pub use server::{Server, ServerBuildError, ServerBuilder};
