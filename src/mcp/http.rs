//! HTTP-streaming transport.
//!
//! The session-oriented delivery mode: each client connection performs an
//! `initialize` handshake over `POST /mcp` and receives a session
//! identifier in the `Mcp-Session-Id` response header. Subsequent requests
//! present that header and are dispatched independently — axum gives each
//! request its own task, so multiple operations per session may be in
//! flight at once and responses correlate by request ID, not arrival
//! order. `GET /mcp` opens a per-session SSE stream for server-initiated
//! messages; `DELETE /mcp` closes the session.
//!
//! Transport failures (malformed body, dropped connection) terminate only
//! the affected request or session, never the server process.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event as SseEvent, KeepAlive};
use axum::response::{IntoResponse, Response, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::config::HttpConfig;
use crate::mcp::dispatch::Dispatcher;
use crate::mcp::protocol::{
    parse_message, IncomingMessage, JsonRpcError, JsonRpcResponse, SERVER_NAME,
};
use crate::mcp::session::SessionManager;

/// Header carrying the session identifier, both directions.
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Shared state handed to every request handler.
///
/// The dispatcher wraps the read-only registry; the session table is the
/// only mutable shared structure.
#[derive(Clone)]
struct AppState {
    dispatcher: Arc<Dispatcher>,
    sessions: Arc<SessionManager>,
}

/// Builds the transport's router.
#[must_use]
pub fn build_router(dispatcher: Arc<Dispatcher>, sessions: Arc<SessionManager>) -> Router {
    let state = AppState {
        dispatcher,
        sessions,
    };

    Router::new()
        .route(
            "/mcp",
            post(message_handler).get(stream_handler).delete(close_handler),
        )
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Binds the configured address and serves until shutdown.
///
/// # Errors
///
/// Returns an error if the address cannot be bound (unrecoverable startup
/// failure) or the accept loop fails.
pub async fn serve(dispatcher: Arc<Dispatcher>, config: &HttpConfig) -> anyhow::Result<()> {
    let sessions = Arc::new(SessionManager::new(config.session_idle_secs));
    let router = build_router(dispatcher, Arc::clone(&sessions));

    spawn_idle_sweeper(Arc::clone(&sessions), config.sweep_interval_secs);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {e}", config.bind))?;

    info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP transport shut down");
    Ok(())
}

/// Spawns the background task that reclaims idle sessions.
///
/// In-flight dispatches are unaffected: they hold their own handles and
/// only the table entry disappears.
fn spawn_idle_sweeper(sessions: Arc<SessionManager>, sweep_interval_secs: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(sweep_interval_secs.max(1)));
        loop {
            interval.tick().await;
            let reclaimed = sessions.reclaim_idle().await;
            if reclaimed > 0 {
                debug!(reclaimed, "reclaimed idle sessions");
            }
        }
    });
}

/// Resolves when a shutdown signal arrives.
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (Ok(mut sigint), Ok(mut sigterm)) =
        (signal(SignalKind::interrupt()), signal(SignalKind::terminate()))
    else {
        // Signal registration failed; serve until the process is killed.
        return std::future::pending::<()>().await;
    };

    tokio::select! {
        _ = sigint.recv() => info!("Received SIGINT, shutting down"),
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
    }
}

/// Resolves when a shutdown signal arrives.
#[cfg(windows)]
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Received Ctrl+C, shutting down");
    }
}

/// Extracts the session identifier from request headers.
fn session_from(headers: &HeaderMap) -> Option<&str> {
    headers.get(SESSION_HEADER)?.to_str().ok()
}

/// `POST /mcp`: the request path of the transport.
///
/// An `initialize` request mints a session; everything else must present
/// a live session header. Malformed bodies get a JSON-RPC parse error
/// response rather than tearing anything down.
async fn message_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let message = match parse_message(&body) {
        Ok(message) => message,
        Err(error) => return (StatusCode::BAD_REQUEST, Json(error)).into_response(),
    };

    match message {
        IncomingMessage::Request(req) if req.method == "initialize" => {
            let session_id = state.sessions.create().await;
            info!(session = %session_id, "session established");
            let response = JsonRpcResponse::success(req.id, state.dispatcher.initialize_result());
            ([(SESSION_HEADER, session_id)], Json(response)).into_response()
        }

        IncomingMessage::Request(req) => {
            let Some(session_id) = session_from(&headers) else {
                let error = JsonRpcError::invalid_request(
                    Some(req.id),
                    "Missing Mcp-Session-Id header; initialize first",
                );
                return (StatusCode::BAD_REQUEST, Json(error)).into_response();
            };

            if !state.sessions.touch(session_id).await {
                let error =
                    JsonRpcError::invalid_request(Some(req.id), "Unknown or expired session");
                return (StatusCode::NOT_FOUND, Json(error)).into_response();
            }

            match state.dispatcher.dispatch(req).await {
                Ok(response) => Json(response).into_response(),
                Err(error) => Json(error).into_response(),
            }
        }

        IncomingMessage::Notification(notification) => {
            if let Some(session_id) = session_from(&headers) {
                state.sessions.touch(session_id).await;
            }
            debug!(method = %notification.method, "notification received");
            StatusCode::ACCEPTED.into_response()
        }
    }
}

/// `GET /mcp`: opens the session's server-initiated event stream.
///
/// Events carry the session-local monotonic event number as the SSE id.
async fn stream_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(session_id) = session_from(&headers) else {
        return (StatusCode::BAD_REQUEST, "Missing Mcp-Session-Id header").into_response();
    };

    let Some(receiver) = state.sessions.subscribe(session_id).await else {
        return (StatusCode::NOT_FOUND, "Unknown or expired session").into_response();
    };
    state.sessions.touch(session_id).await;
    debug!(session = %session_id, "event stream opened");

    let stream = BroadcastStream::new(receiver)
        .filter_map(Result::ok)
        .map(|event| {
            Ok::<SseEvent, Infallible>(
                SseEvent::default()
                    .id(event.id.to_string())
                    .event("message")
                    .data(event.payload.to_string()),
            )
        });

    Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
}

/// `DELETE /mcp`: closes the session.
///
/// Requests already dispatched under it are abandoned to their own tasks
/// and their results discarded with the connection.
async fn close_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(session_id) = session_from(&headers) else {
        return (StatusCode::BAD_REQUEST, "Missing Mcp-Session-Id header").into_response();
    };

    if state.sessions.close(session_id).await {
        info!(session = %session_id, "session closed");
        StatusCode::NO_CONTENT.into_response()
    } else {
        (StatusCode::NOT_FOUND, "Unknown or expired session").into_response()
    }
}

/// `GET /health`: liveness probe.
async fn health_handler() -> Response {
    Json(json!({
        "status": "ok",
        "server": SERVER_NAME,
        "version": env!("CARGO_PKG_VERSION"),
    }))
    .into_response()
}
