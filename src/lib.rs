//! toolhost-mcp: MCP server exposing schema-validated capabilities to LLM agents
//!
//! This library implements a Model Context Protocol server kernel plus a
//! set of example capabilities. Capabilities come in three kinds — callable
//! **tools**, readable **resources**, and templated **prompts** — each
//! registered once at startup with a name, description, argument schema,
//! and async handler.
//!
//! # Architecture
//!
//! - A read-only [`registry::CapabilityRegistry`] holds the three
//!   namespaces in registration order
//! - The [`mcp::Dispatcher`] resolves, schema-validates, and invokes,
//!   keeping protocol faults distinct from handler-reported failures
//! - Two transports deliver messages to the same dispatcher: a
//!   newline-delimited stdio stream and a session-oriented streamable-HTTP
//!   mode with SSE delivery
//!
//! # Modules
//!
//! - [`capabilities`] — the example tools, resources, and prompts
//! - [`config`] — configuration loading and validation
//! - [`error`] — error types
//! - [`mcp`] — protocol kernel: messages, dispatch, transports, sessions
//! - [`registry`] — capability registry and handler types
//! - [`schema`] — argument schemas and validation

pub mod capabilities;
pub mod config;
pub mod error;
pub mod mcp;
pub mod registry;
pub mod schema;
