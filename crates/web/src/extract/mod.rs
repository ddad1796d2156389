//! Typed extraction of handler arguments from a request.
//!
//! Every handler argument implements [`FromRequest`]. Body extractors ([`Json`], [`Form`],
//! [`ParsedBody`](crate::body::ParsedBody), `Bytes`, `String`) consume the request body, so a
//! handler takes at most one of them; the others read the head and can be freely combined.

mod extract_body;
mod extract_header;
mod extract_tuple;
mod extract_url;
mod from_request;

pub use from_request::FromRequest;

/// A form body decoded into `T`.
///
/// The request must carry `Content-Type: application/x-www-form-urlencoded`. Nested keys
/// such as `user[name]` are only understood when [`FormMode::Extended`](crate::body::FormMode)
/// is configured.
///
/// # Example
/// ```
/// # use serde::Deserialize;
/// # use ingest_web::extract::Form;
/// # #[allow(dead_code)]
/// #[derive(Deserialize, Debug)]
/// struct Params {
///     name: String,
///     zip: String,
/// }
///
/// pub async fn handle(Form(params) : Form<Params>) -> String {
///     format!("received params: {:?}", params)
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form<T>(pub T);

/// A JSON body decoded into `T`, also a JSON response when `T: Serialize`.
///
/// The request must carry `Content-Type: application/json`.
///
/// # Example
/// ```
/// # use serde::Deserialize;
/// # use ingest_web::extract::Json;
/// # #[allow(dead_code)]
/// #[derive(Deserialize, Debug)]
/// struct Params {
///     name: String,
///     zip: String,
/// }
///
/// pub async fn handle(Json(params) : Json<Params>) -> String {
///     format!("received params: {:?}", params)
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Json<T>(pub T);

/// The query string decoded into `T`.
///
/// A request without a query string decodes like an empty one.
///
/// # Example
/// ```
/// # use serde::Deserialize;
/// # use ingest_web::extract::Query;
/// # #[allow(dead_code)]
/// #[derive(Deserialize, Debug)]
/// struct Params {
///     name: String,
///     zip: String,
/// }
///
/// pub async fn handle(Query(params) : Query<Params>) -> String {
///     format!("received params: {:?}", params)
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query<T>(pub T);
