use http::StatusCode;
use ingest_web::body::{BodyConfig, FormMode, ParsedBody};
use ingest_web::extract::{Form, Json, Query};
use ingest_web::router::filter::header;
use ingest_web::router::{get, post};
use ingest_web::{ExtractError, PathParams, Router, Server, handler_fn};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Deserialize, Serialize, Debug)]
pub struct User {
    name: String,
    age: u32,
}

#[derive(Deserialize, Debug)]
pub struct Paging {
    page: Option<u32>,
}

// curl -v -H 'Content-Type: application/json' -d '{"name":"John","age":30}' http://127.0.0.1:8080/users
async fn create_user(Json(user): Json<User>) -> (StatusCode, Json<User>) {
    info!(?user, "create user");
    (StatusCode::CREATED, Json(user))
}

// curl -v -d "name=John&age=30" http://127.0.0.1:8080/users
async fn create_user_from_form(Form(user): Form<User>) -> String {
    format!("created {} from a form\r\n", user.name)
}

// curl -v "http://127.0.0.1:8080/users/42?page=2"
async fn show_user(params: PathParams, Query(paging): Query<Paging>) -> String {
    format!("user {} on page {}\r\n", params.get("id").unwrap_or_default(), paging.page.unwrap_or(1))
}

// curl -v -H "Transfer-Encoding: chunked" -H 'Content-Type: application/json' -d '{"tags":["a","b"]}' http://127.0.0.1:8080/echo
async fn echo(body: Result<ParsedBody, ExtractError>) -> Result<ParsedBody, (StatusCode, String)> {
    body.map_err(|e| (e.status_code(), format!("can't read body: {e}\r\n")))
}

#[tokio::main]
async fn main() {
    let router = Router::builder()
        .route("/users", post(handler_fn(create_user)).with(header(http::header::CONTENT_TYPE, "application/json")))
        .route("/users", post(handler_fn(create_user_from_form)))
        .route("/users/:id", get(handler_fn(show_user)))
        .route("/echo", post(handler_fn(echo)))
        .build()
        .unwrap();

    let body_config = BodyConfig::builder().limit(1024 * 1024).form_mode(FormMode::Extended).build();

    Server::builder().router(router).body_config(body_config).bind("127.0.0.1:8080").build().unwrap().start().await;
}
