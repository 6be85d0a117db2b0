//! Server lifecycle: registry wiring, transport selection, and the
//! duplex-stream main loop.
//!
//! The stdio server owns the MCP lifecycle state machine:
//!
//! 1. **Initialisation**: capability negotiation and version agreement
//! 2. **Operation**: dispatching requests
//! 3. **Shutdown**: EOF or signal
//!
//! There is exactly one logical peer in this mode, so requests are
//! processed in arrival order and no session concept is needed. Per-frame
//! failures (parse errors, rejected requests, handler faults) are answered
//! on the stream and never terminate the loop.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{Config, TransportMode};
use crate::mcp::dispatch::Dispatcher;
use crate::mcp::http;
use crate::mcp::protocol::{
    parse_message, IncomingMessage, JsonRpcError, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse,
};
use crate::mcp::transport::StdioTransport;
use crate::registry::CapabilityRegistry;

/// Server state in the MCP lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for initialize request.
    AwaitingInit,
    /// Initialize received, waiting for initialized notification.
    Initialising,
    /// Ready for normal operation.
    Running,
    /// Shutdown in progress.
    ShuttingDown,
}

/// Selects the configured transport and runs the server to completion.
///
/// # Errors
///
/// Returns an error on unrecoverable startup or transport failure; the
/// caller turns this into a non-zero process exit.
pub async fn serve(config: &Config, registry: CapabilityRegistry) -> anyhow::Result<()> {
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(registry)));

    match config.transport.mode {
        TransportMode::Stdio => {
            info!("starting stdio transport");
            StdioServer::new(dispatcher).run().await?;
            Ok(())
        }
        TransportMode::Http => {
            info!("starting HTTP transport");
            http::serve(dispatcher, &config.transport.http).await
        }
    }
}

/// The duplex-stream server.
pub struct StdioServer {
    /// Current lifecycle state.
    state: ServerState,
    /// The framing layer.
    transport: StdioTransport,
    /// The shared dispatch pipeline.
    dispatcher: Arc<Dispatcher>,
}

impl StdioServer {
    /// Creates a stdio server over the given dispatcher.
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            state: ServerState::AwaitingInit,
            transport: StdioTransport::new(),
            dispatcher,
        }
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// Runs the main loop with graceful shutdown handling.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    #[cfg(unix)]
    pub async fn run(&mut self) -> std::io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt()).map_err(std::io::Error::other)?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(std::io::Error::other)?;

        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    info!("Received SIGINT, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                _ = sigterm.recv() => {
                    info!("Received SIGTERM, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                frame_result = self.transport.read_frame() => {
                    if self.handle_transport_result(frame_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Runs the main loop with graceful shutdown handling.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    #[cfg(windows)]
    pub async fn run(&mut self) -> std::io::Result<()> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("Received Ctrl+C, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                frame_result = self.transport.read_frame() => {
                    if self.handle_transport_result(frame_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Handles the result of a transport read.
    ///
    /// Returns `true` if the server should shut down.
    async fn handle_transport_result(
        &mut self,
        frame_result: std::io::Result<Option<String>>,
    ) -> std::io::Result<bool> {
        let Some(frame) = frame_result? else {
            self.state = ServerState::ShuttingDown;
            return Ok(true);
        };

        if frame.trim().is_empty() {
            return Ok(false);
        }

        self.handle_frame(&frame).await?;

        Ok(self.state == ServerState::ShuttingDown)
    }

    /// Handles a single decoded frame.
    async fn handle_frame(&mut self, frame: &str) -> std::io::Result<()> {
        match parse_message(frame) {
            Ok(IncomingMessage::Request(req)) => self.handle_request(req).await,
            Ok(IncomingMessage::Notification(notif)) => {
                self.apply_notification(&notif);
                Ok(())
            }
            Err(error) => self.transport.write_message(&error).await,
        }
    }

    /// Handles an incoming request, gated by the lifecycle state.
    async fn handle_request(&mut self, req: JsonRpcRequest) -> std::io::Result<()> {
        if req.method == "initialize" {
            return match self.initialize_response(&req) {
                Ok(response) => self.transport.write_message(&response).await,
                Err(error) => self.transport.write_message(&error).await,
            };
        }

        if let Some(error) = self.gate_request(&req) {
            return self.transport.write_message(&error).await;
        }

        match self.dispatcher.dispatch(req).await {
            Ok(response) => self.transport.write_message(&response).await,
            Err(error) => self.transport.write_message(&error).await,
        }
    }

    /// Produces the initialize response, enforcing single initialisation.
    fn initialize_response(
        &mut self,
        req: &JsonRpcRequest,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        if self.state != ServerState::AwaitingInit {
            return Err(JsonRpcError::invalid_request(
                Some(req.id.clone()),
                "Server already initialised",
            ));
        }

        self.state = ServerState::Initialising;
        Ok(JsonRpcResponse::success(
            req.id.clone(),
            self.dispatcher.initialize_result(),
        ))
    }

    /// Rejects non-lifecycle requests until initialisation completes.
    fn gate_request(&self, req: &JsonRpcRequest) -> Option<JsonRpcError> {
        if req.method == "ping" || self.state == ServerState::Running {
            return None;
        }
        Some(JsonRpcError::invalid_request(
            Some(req.id.clone()),
            "Server not initialised",
        ))
    }

    /// Applies lifecycle notifications.
    fn apply_notification(&mut self, notif: &JsonRpcNotification) {
        if notif.method == "notifications/initialized" && self.state == ServerState::Initialising {
            debug!("initialisation complete");
            self.state = ServerState::Running;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::RequestId;
    use serde_json::json;

    fn server() -> StdioServer {
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(CapabilityRegistry::new())));
        StdioServer::new(dispatcher)
    }

    fn request(method: &str) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: RequestId::Number(1),
            method: method.to_string(),
            params: Some(json!({})),
        }
    }

    fn notification(method: &str) -> JsonRpcNotification {
        JsonRpcNotification {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params: None,
        }
    }

    #[test]
    fn lifecycle_happy_path() {
        let mut server = server();
        assert_eq!(server.state(), ServerState::AwaitingInit);

        let response = server.initialize_response(&request("initialize")).unwrap();
        assert!(response.result["protocolVersion"].is_string());
        assert_eq!(server.state(), ServerState::Initialising);

        server.apply_notification(&notification("notifications/initialized"));
        assert_eq!(server.state(), ServerState::Running);
        assert!(server.gate_request(&request("tools/list")).is_none());
    }

    #[test]
    fn double_initialise_rejected() {
        let mut server = server();
        server.initialize_response(&request("initialize")).unwrap();

        let err = server
            .initialize_response(&request("initialize"))
            .unwrap_err();
        assert!(err.error.message.contains("already initialised"));
    }

    #[test]
    fn requests_gated_before_initialisation() {
        let server = server();
        let err = server.gate_request(&request("tools/list")).unwrap();
        assert!(err.error.message.contains("not initialised"));

        // ping is allowed in any state
        assert!(server.gate_request(&request("ping")).is_none());
    }

    #[test]
    fn unrelated_notifications_ignored() {
        let mut server = server();
        server.apply_notification(&notification("notifications/cancelled"));
        assert_eq!(server.state(), ServerState::AwaitingInit);
    }
}
