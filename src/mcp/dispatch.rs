//! Request dispatch: resolve, validate, invoke, encode.
//!
//! The dispatcher is the single pipeline beneath both transports. Each
//! dispatch is independent and carries no state across requests; the only
//! shared structure is the registry, which is read-only after startup.
//!
//! Failure classes are kept distinct on the wire:
//!
//! - unknown capability → error response tagged `unknown_capability`,
//!   rejected before any handler runs
//! - invalid arguments → error response tagged `invalid_arguments`, the
//!   handler is never invoked
//! - handler fault (the handler returned `Err`) → well-formed error
//!   response tagged `handler_fault`; the connection survives
//! - domain failure (the handler completed with `isError: true`) → a
//!   successful response carrying the flag verbatim, so callers can tell
//!   "the tool ran and reported failure" from "the call was malformed"

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{RegistryError, ValidationError};
use crate::mcp::protocol::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId, MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::registry::{Capability, CapabilityKind, CapabilityRegistry};

/// Server information for the initialize response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Parameters for `tools/call` and `prompts/get`.
#[derive(Debug, Clone, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

/// Parameters for `resources/read`.
#[derive(Debug, Clone, Deserialize)]
struct ReadParams {
    uri: String,
}

/// The schema-validated request dispatcher.
///
/// Cheap to share: holds only an `Arc` to the registry. `dispatch` takes
/// `&self`, so any number of requests may be in flight concurrently.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<CapabilityRegistry>,
}

impl Dispatcher {
    /// Creates a dispatcher over a populated registry.
    #[must_use]
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this dispatcher resolves against.
    #[must_use]
    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Builds the `initialize` result payload.
    ///
    /// Both transports negotiate the same version and capability set; only
    /// session handling differs between them.
    #[must_use]
    pub fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": false },
                "resources": { "listChanged": false },
                "prompts": { "listChanged": false },
            },
            "serverInfo": ServerInfo::default(),
        })
    }

    /// Dispatches one request and produces its response.
    ///
    /// # Errors
    ///
    /// Returns a ready-to-send [`JsonRpcError`] for every per-request
    /// failure; dispatch itself never fails the connection.
    pub async fn dispatch(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        debug!(method = %req.method, id = %req.id, "dispatching request");

        match req.method.as_str() {
            "initialize" => Ok(JsonRpcResponse::success(req.id, self.initialize_result())),
            "ping" => Ok(JsonRpcResponse::success(req.id, json!({}))),
            "tools/list" => Ok(self.list_tools(req.id)),
            "resources/list" => Ok(self.list_resources(req.id)),
            "prompts/list" => Ok(self.list_prompts(req.id)),
            "tools/call" => self.call(req, CapabilityKind::Tool).await,
            "prompts/get" => self.call(req, CapabilityKind::Prompt).await,
            "resources/read" => self.read_resource(req).await,
            _ => Err(JsonRpcError::method_not_found(req.id, &req.method)),
        }
    }

    /// `tools/list`: registry metadata only, no handler code runs.
    fn list_tools(&self, id: RequestId) -> JsonRpcResponse {
        let tools: Vec<Value> = self
            .registry
            .list(CapabilityKind::Tool)
            .map(|c| {
                json!({
                    "name": c.name(),
                    "description": c.description(),
                    "inputSchema": c.schema().to_json_schema(),
                })
            })
            .collect();
        JsonRpcResponse::success(id, json!({ "tools": tools }))
    }

    /// `resources/list`: URIs and descriptions in registration order.
    fn list_resources(&self, id: RequestId) -> JsonRpcResponse {
        let resources: Vec<Value> = self
            .registry
            .list(CapabilityKind::Resource)
            .map(|c| {
                json!({
                    "uri": c.name(),
                    "name": c.name(),
                    "description": c.description(),
                })
            })
            .collect();
        JsonRpcResponse::success(id, json!({ "resources": resources }))
    }

    /// `prompts/list`: names plus argument metadata in registration order.
    fn list_prompts(&self, id: RequestId) -> JsonRpcResponse {
        let prompts: Vec<Value> = self
            .registry
            .list(CapabilityKind::Prompt)
            .map(|c| {
                let arguments: Vec<Value> = c
                    .schema()
                    .fields()
                    .iter()
                    .map(|f| {
                        json!({
                            "name": f.name,
                            "description": f.description,
                            "required": f.required,
                        })
                    })
                    .collect();
                json!({
                    "name": c.name(),
                    "description": c.description(),
                    "arguments": arguments,
                })
            })
            .collect();
        JsonRpcResponse::success(id, json!({ "prompts": prompts }))
    }

    /// `tools/call` / `prompts/get`: resolve → validate → invoke.
    async fn call(
        &self,
        req: JsonRpcRequest,
        kind: CapabilityKind,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        let params: CallParams = parse_params(&req)?;

        let capability = self
            .registry
            .resolve(kind, &params.name)
            .map_err(|e| unknown_capability(req.id.clone(), &e))?;

        self.invoke(req.id, capability, params.arguments.as_ref())
            .await
    }

    /// `resources/read`: URI resolution, then the same validate → invoke
    /// pipeline with template-captured arguments.
    async fn read_resource(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        let params: ReadParams = parse_params(&req)?;

        let (capability, captured) = self
            .registry
            .resolve_resource_uri(&params.uri)
            .map_err(|e| unknown_capability(req.id.clone(), &e))?;

        self.invoke(req.id, capability, captured.as_ref()).await
    }

    /// Validates arguments and invokes the handler.
    ///
    /// Validation failure means the handler is never called. A handler
    /// `Err` is recovered here and converted into an error response; a
    /// domain failure inside a returned result passes through untouched.
    async fn invoke(
        &self,
        id: RequestId,
        capability: &Capability,
        arguments: Option<&Value>,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        let args = capability
            .schema()
            .validate(arguments)
            .map_err(|e| invalid_arguments(id.clone(), capability.name(), &e))?;

        match capability.invoke(args).await {
            Ok(output) => Ok(JsonRpcResponse::success(id, output.into_value())),
            Err(fault) => {
                warn!(capability = capability.name(), error = %fault, "handler fault");
                Err(
                    JsonRpcError::internal_error(id, format!("{fault:#}")).with_data(json!({
                        "reason": "handler_fault",
                        "capability": capability.name(),
                    })),
                )
            }
        }
    }
}

/// Deserialises request params, rejecting missing or mis-shaped ones.
fn parse_params<T: DeserializeOwned>(req: &JsonRpcRequest) -> Result<T, JsonRpcError> {
    req.params
        .as_ref()
        .map(|p| serde_json::from_value(p.clone()))
        .transpose()
        .map_err(|e| JsonRpcError::invalid_params(req.id.clone(), format!("Invalid params: {e}")))?
        .ok_or_else(|| JsonRpcError::invalid_params(req.id.clone(), "Missing params"))
}

/// Error response for a name that resolved to nothing.
fn unknown_capability(id: RequestId, err: &RegistryError) -> JsonRpcError {
    let RegistryError::NotFound { kind, name } = err else {
        return JsonRpcError::internal_error(id, err.to_string());
    };
    JsonRpcError::invalid_params(id, err.to_string()).with_data(json!({
        "reason": "unknown_capability",
        "kind": kind.to_string(),
        "name": name,
    }))
}

/// Error response for arguments that failed schema validation.
fn invalid_arguments(id: RequestId, capability: &str, err: &ValidationError) -> JsonRpcError {
    let mut data = json!({
        "reason": "invalid_arguments",
        "capability": capability,
    });
    if let (Some(field), Some(obj)) = (err.field(), data.as_object_mut()) {
        obj.insert("field".to_string(), json!(field));
    }
    JsonRpcError::invalid_params(id, err.to_string()).with_data(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{InvokeOutput, ToolOutput};
    use crate::schema::ArgumentShape;

    fn request(method: &str, params: Value) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: RequestId::Number(1),
            method: method.to_string(),
            params: Some(params),
        }
    }

    fn dispatcher_with_echo() -> Dispatcher {
        let mut registry = CapabilityRegistry::new();
        registry
            .register_tool(
                "echo",
                "Echo back a message",
                ArgumentShape::new().string("message", "Message to echo back"),
                |args| async move {
                    let message = args.str_or("message", "");
                    Ok(InvokeOutput::Tool(ToolOutput::text(format!("Echo: {message}"))))
                },
            )
            .unwrap();
        Dispatcher::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn initialize_reports_version_and_capabilities() {
        let dispatcher = dispatcher_with_echo();
        let resp = dispatcher
            .dispatch(request("initialize", json!({"protocolVersion": "2024-11-05"})))
            .await
            .unwrap();
        assert_eq!(resp.result["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(resp.result["serverInfo"]["name"], SERVER_NAME);
        assert!(resp.result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn ping_returns_empty_object() {
        let dispatcher = dispatcher_with_echo();
        let resp = dispatcher.dispatch(request("ping", json!({}))).await.unwrap();
        assert_eq!(resp.result, json!({}));
    }

    #[tokio::test]
    async fn unknown_method_rejected() {
        let dispatcher = dispatcher_with_echo();
        let err = dispatcher
            .dispatch(request("tools/uninstall", json!({})))
            .await
            .unwrap_err();
        assert_eq!(err.error.code, -32601);
    }

    #[tokio::test]
    async fn tool_call_round_trip() {
        let dispatcher = dispatcher_with_echo();
        let resp = dispatcher
            .dispatch(request(
                "tools/call",
                json!({"name": "echo", "arguments": {"message": "hi"}}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.result["content"][0]["text"], "Echo: hi");
        assert!(resp.result.get("isError").is_none());
    }

    #[tokio::test]
    async fn unknown_tool_tagged() {
        let dispatcher = dispatcher_with_echo();
        let err = dispatcher
            .dispatch(request("tools/call", json!({"name": "nope", "arguments": {}})))
            .await
            .unwrap_err();
        let data = err.error.data.unwrap();
        assert_eq!(data["reason"], "unknown_capability");
        assert_eq!(data["name"], "nope");
    }

    #[tokio::test]
    async fn invalid_arguments_tagged_with_field() {
        let dispatcher = dispatcher_with_echo();
        let err = dispatcher
            .dispatch(request(
                "tools/call",
                json!({"name": "echo", "arguments": {"message": 42}}),
            ))
            .await
            .unwrap_err();
        let data = err.error.data.unwrap();
        assert_eq!(data["reason"], "invalid_arguments");
        assert_eq!(data["field"], "message");
    }

    #[tokio::test]
    async fn missing_params_rejected() {
        let dispatcher = dispatcher_with_echo();
        let req = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: RequestId::Number(9),
            method: "tools/call".to_string(),
            params: None,
        };
        let err = dispatcher.dispatch(req).await.unwrap_err();
        assert_eq!(err.error.code, -32602);
    }
}
