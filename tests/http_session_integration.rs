//! Integration tests for the HTTP-streaming transport.
//!
//! Each test spawns the real router on an ephemeral port and talks to it
//! over HTTP, covering the session handshake, concurrent dispatch with
//! request-ID correlation, and session close semantics.

use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::{json, Value};

use toolhost_mcp::capabilities;
use toolhost_mcp::config::Config;
use toolhost_mcp::mcp::dispatch::Dispatcher;
use toolhost_mcp::mcp::http::{build_router, SESSION_HEADER};
use toolhost_mcp::mcp::session::SessionManager;

async fn spawn_server() -> SocketAddr {
    let registry = capabilities::build_registry(&Config::default()).unwrap();
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(registry)));
    let sessions = Arc::new(SessionManager::new(300));
    let router = build_router(dispatcher, sessions);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn rpc(id: i64, method: &str, params: Value) -> String {
    json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}).to_string()
}

/// Performs the initialize handshake and returns the minted session id.
async fn handshake(client: &reqwest::Client, addr: SocketAddr) -> String {
    let response = client
        .post(format!("http://{addr}/mcp"))
        .body(rpc(0, "initialize", json!({"protocolVersion": "2024-11-05"})))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    response
        .headers()
        .get(SESSION_HEADER)
        .expect("handshake returns a session header")
        .to_str()
        .unwrap()
        .to_string()
}

// =============================================================================
// Handshake and sessions
// =============================================================================

#[tokio::test]
async fn handshake_mints_session_and_negotiates_version() {
    let addr = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{addr}/mcp"))
        .body(rpc(0, "initialize", json!({"protocolVersion": "2024-11-05"})))
        .send()
        .await
        .unwrap();

    let session = response
        .headers()
        .get(SESSION_HEADER)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(!session.is_empty());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(body["result"]["serverInfo"]["name"], "toolhost-mcp");
}

#[tokio::test]
async fn concurrent_connections_get_distinct_sessions() {
    let addr = spawn_server().await;
    let client = reqwest::Client::new();

    let (first, second) = tokio::join!(handshake(&client, addr), handshake(&client, addr));
    assert_ne!(first, second);
}

#[tokio::test]
async fn request_without_session_rejected() {
    let addr = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{addr}/mcp"))
        .body(rpc(1, "tools/list", json!({})))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Mcp-Session-Id"));
}

#[tokio::test]
async fn unknown_session_rejected() {
    let addr = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{addr}/mcp"))
        .header(SESSION_HEADER, "never-issued")
        .body(rpc(1, "tools/list", json!({})))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_body_answered_with_parse_error() {
    let addr = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{addr}/mcp"))
        .body("{ this is not json")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], -32700);
}

// =============================================================================
// Dispatch over a session
// =============================================================================

#[tokio::test]
async fn concurrent_calls_on_one_session_correlate_by_id() {
    let addr = spawn_server().await;
    let client = reqwest::Client::new();
    let session = handshake(&client, addr).await;

    let call = |id: i64, message: &str| {
        let client = client.clone();
        let session = session.clone();
        let body = rpc(
            id,
            "tools/call",
            json!({"name": "echo", "arguments": {"message": message}}),
        );
        async move {
            let response = client
                .post(format!("http://{addr}/mcp"))
                .header(SESSION_HEADER, session)
                .body(body)
                .send()
                .await
                .unwrap();
            response.json::<Value>().await.unwrap()
        }
    };

    let (first, second) = tokio::join!(call(1, "one"), call(2, "two"));

    assert_eq!(first["id"], 1);
    assert_eq!(first["result"]["content"][0]["text"], "Echo: one");
    assert_eq!(second["id"], 2);
    assert_eq!(second["result"]["content"][0]["text"], "Echo: two");
}

#[tokio::test]
async fn tool_listing_over_http() {
    let addr = spawn_server().await;
    let client = reqwest::Client::new();
    let session = handshake(&client, addr).await;

    let response = client
        .post(format!("http://{addr}/mcp"))
        .header(SESSION_HEADER, session)
        .body(rpc(1, "tools/list", json!({})))
        .send()
        .await
        .unwrap();

    let body: Value = response.json().await.unwrap();
    let names: Vec<&str> = body["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["echo", "get_time", "fetch_url"]);
}

// =============================================================================
// Stream and close
// =============================================================================

#[tokio::test]
async fn event_stream_opens_for_live_session() {
    let addr = spawn_server().await;
    let client = reqwest::Client::new();
    let session = handshake(&client, addr).await;

    let response = client
        .get(format!("http://{addr}/mcp"))
        .header(SESSION_HEADER, session)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response.headers()[reqwest::header::CONTENT_TYPE],
        "text/event-stream"
    );
}

#[tokio::test]
async fn closed_session_stops_accepting_requests() {
    let addr = spawn_server().await;
    let client = reqwest::Client::new();
    let session = handshake(&client, addr).await;

    let response = client
        .delete(format!("http://{addr}/mcp"))
        .header(SESSION_HEADER, &session)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NO_CONTENT);

    let response = client
        .post(format!("http://{addr}/mcp"))
        .header(SESSION_HEADER, &session)
        .body(rpc(1, "ping", json!({})))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let addr = spawn_server().await;
    let client = reqwest::Client::new();

    let body: Value = client
        .get(format!("http://{addr}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "ok");
    assert_eq!(body["server"], "toolhost-mcp");
}
