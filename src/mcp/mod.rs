//! Model Context Protocol (MCP) server kernel.
//!
//! This module implements the protocol server: JSON-RPC 2.0 message
//! handling, the schema-validated dispatcher, and two interchangeable
//! delivery modes selected at startup and never mixed at runtime.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Server                              │
//! │                                                              │
//! │   ┌─────────────┐     ┌─────────────┐    ┌──────────────┐   │
//! │   │  Transport   │───▶│  Dispatcher  │───▶│   Registry   │   │
//! │   │ stdio │ http │    │ (validate +  │    │ (tools, res- │   │
//! │   └─────────────┘     │   invoke)    │    │ ources, pro- │   │
//! │          │            └─────────────┘    │    mpts)     │   │
//! │          ▼                   │           └──────────────┘   │
//! │   ┌─────────────┐            ▼                              │
//! │   │  Sessions    │    JSON-RPC messages                     │
//! │   │ (http only)  │                                          │
//! │   └─────────────┘                                           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05.

pub mod dispatch;
pub mod http;
pub mod protocol;
pub mod server;
pub mod session;
pub mod transport;

pub use dispatch::Dispatcher;
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
pub use server::{serve, StdioServer};
pub use session::SessionManager;
pub use transport::StdioTransport;
