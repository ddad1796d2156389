use flate2::Compression;
use flate2::write::GzEncoder;
use ingest_web::body::{BodyConfig, ParsedBody};
use ingest_web::extract::Json;
use ingest_web::router::{get, post};
use ingest_web::{PathParams, QueryParams, Router, Server, ServerBuilder, handler_fn};
use serde_json::Value;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::time::timeout;

static DECODED_CALLS: AtomicUsize = AtomicUsize::new(0);
static COUNT_CALLS: AtomicUsize = AtomicUsize::new(0);

async fn echo(body: ParsedBody) -> ParsedBody {
    body
}

async fn json_only(Json(value): Json<Value>) -> Json<Value> {
    Json(value)
}

async fn decoded(Json(_value): Json<Value>) -> &'static str {
    DECODED_CALLS.fetch_add(1, Ordering::SeqCst);
    "decoded"
}

async fn count() -> &'static str {
    COUNT_CALLS.fetch_add(1, Ordering::SeqCst);
    "counted"
}

async fn fallback(query: QueryParams) -> String {
    format!("fallback x={}", query.get("x").unwrap_or_default())
}

async fn show_user(params: PathParams, query: QueryParams) -> String {
    format!("user={} tab={}", params.get("id").unwrap_or_default(), query.get("tab").unwrap_or_default())
}

fn router() -> Router {
    Router::builder()
        .route("/echo", post(handler_fn(echo)))
        .route("/json", post(handler_fn(json_only)))
        .route("/decoded", post(handler_fn(decoded)))
        .route("/count", post(handler_fn(count)))
        .route("/users/:id", get(handler_fn(show_user)))
        .build()
        .unwrap()
}

fn server_with(body_config: BodyConfig) -> ServerBuilder {
    Server::builder().router(router()).body_config(body_config)
}

/// Sends `request` to a fresh server and reads until the server closes the connection.
///
/// Unless `close_write` is set the client side stays open while waiting.
async fn exchange(builder: ServerBuilder, request: &[u8], close_write: bool) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let server = builder.bind(address).build().unwrap();

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let serving = tokio::spawn(server.serve(listener, async {
        let _ = shutdown_rx.await;
    }));

    let mut stream = TcpStream::connect(address).await.unwrap();
    stream.write_all(request).await.unwrap();
    if close_write {
        stream.shutdown().await.unwrap();
    }

    let response = timeout(Duration::from_secs(5), read_until_closed(&mut stream)).await.expect("server kept the connection open");

    shutdown_tx.send(()).unwrap();
    serving.await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

/// Reads everything the server wrote; a reset after its response still counts as closed.
async fn read_until_closed(stream: &mut TcpStream) -> Vec<u8> {
    let mut response = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return response,
            Ok(n) => response.extend_from_slice(&buf[..n]),
        }
    }
}

async fn send(request: &str) -> String {
    exchange(server_with(BodyConfig::default()), request.as_bytes(), false).await
}

#[tokio::test]
async fn json_body_is_echoed() {
    let response = send(
        "POST /echo HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: 24\r\nConnection: close\r\n\r\n{\"name\":\"John\",\"age\":30}",
    )
    .await;

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
    assert!(response.contains("content-type: application/json\r\n"));
    let body = response.split("\r\n\r\n").nth(1).unwrap();
    let value: Value = serde_json::from_str(body).unwrap();
    assert_eq!(value, serde_json::json!({"name": "John", "age": 30}));
}

#[tokio::test]
async fn chunked_form_body() {
    let response = send(
        "POST /echo HTTP/1.1\r\nContent-Type: application/x-www-form-urlencoded\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n\
         5\r\nname=\r\n4\r\nJohn\r\n7\r\n&age=30\r\n0\r\n\r\n",
    )
    .await;

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
    let body = response.split("\r\n\r\n").nth(1).unwrap();
    let value: Value = serde_json::from_str(body).unwrap();
    assert_eq!(value, serde_json::json!({"name": "John", "age": "30"}));
}

#[tokio::test]
async fn path_and_query_params() {
    let response = send("GET /users/42?tab=posts HTTP/1.1\r\nConnection: close\r\n\r\n").await;

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
    assert!(response.ends_with("\r\n\r\nuser=42 tab=posts"));
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let response = send("GET /nowhere HTTP/1.1\r\nConnection: close\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"), "{response}");

    let response = send("GET /echo HTTP/1.1\r\nConnection: close\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"), "{response}");
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let response =
        send("POST /json HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: 7\r\nConnection: close\r\n\r\n{\"name\"").await;

    assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"), "{response}");
    assert!(response.contains("malformed json body"));
}

#[tokio::test]
async fn over_limit_body_is_rejected() {
    let body_config = BodyConfig::builder().limit(16).build();
    let request = "POST /echo HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: 24\r\nConnection: close\r\n\r\n{\"name\":\"John\",\"age\":30}";

    let response = exchange(server_with(body_config), request.as_bytes(), false).await;

    assert!(response.starts_with("HTTP/1.1 413 "), "{response}");
}

#[tokio::test]
async fn huge_declared_body_is_rejected_without_reading_it() {
    let body_config = BodyConfig::builder().limit(16).build();
    let request = "POST /echo HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: 1000000\r\n\r\n{\"a\":1";

    let response = exchange(server_with(body_config), request.as_bytes(), false).await;

    assert!(response.starts_with("HTTP/1.1 413 "), "{response}");
    assert!(response.contains("connection: close\r\n"), "{response}");
}

#[tokio::test]
async fn gzip_body_is_inflated() {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(br#"{"name":"John"}"#).unwrap();
    let compressed = encoder.finish().unwrap();

    let mut request = format!(
        "POST /json HTTP/1.1\r\nContent-Type: application/json\r\nContent-Encoding: gzip\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        compressed.len()
    )
    .into_bytes();
    request.extend_from_slice(&compressed);

    let response = exchange(server_with(BodyConfig::default()), &request, false).await;

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
    assert!(response.ends_with(r#"{"name":"John"}"#));
}

#[tokio::test]
async fn aborted_body_gets_no_response() {
    let request = "POST /decoded HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: 24\r\n\r\n{\"name\":";

    let response = exchange(server_with(BodyConfig::default()), request.as_bytes(), true).await;

    assert!(response.is_empty(), "{response}");
    assert_eq!(DECODED_CALLS.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn handler_without_body_argument_skips_aborted_request() {
    let request = "POST /count HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: 24\r\n\r\n{\"name\":";

    let response = exchange(server_with(BodyConfig::default()), request.as_bytes(), true).await;

    assert!(response.is_empty(), "{response}");
    assert_eq!(COUNT_CALLS.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn default_handler_sees_query_params() {
    let builder = server_with(BodyConfig::default()).default_handler(handler_fn(fallback));

    let response = exchange(builder, b"GET /nowhere?x=1 HTTP/1.1\r\nConnection: close\r\n\r\n", false).await;

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
    assert!(response.ends_with("\r\n\r\nfallback x=1"), "{response}");
}
