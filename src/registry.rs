//! The capability registry.
//!
//! Capabilities come in three kinds — tools, resources, and prompts — each
//! with its own namespace. A capability is a name, a description, an
//! argument schema, and an async handler. All three namespaces preserve
//! registration order, which is the order listings are returned in.
//!
//! The registry is populated once at startup and treated as immutable
//! afterwards, so it is shared across concurrent sessions behind an `Arc`
//! with no locking. Handlers are uniform function values: there is exactly
//! one shape of capability within a kind, so no trait hierarchy is needed.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::RegistryError;
use crate::schema::{ArgumentShape, ValidatedArgs};

/// The three capability namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    /// A callable capability returning content blocks.
    Tool,
    /// A readable capability returning contextual data, addressed by URI.
    Resource,
    /// A templated capability returning a message sequence.
    Prompt,
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Tool => "tool",
            Self::Resource => "resource",
            Self::Prompt => "prompt",
        })
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if requires a predicate fn(&T) -> bool, so we must take &bool here
const fn is_false(b: &bool) -> bool {
    !*b
}

/// A content item in a tool or prompt result.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

impl ContentBlock {
    /// Creates a text content block.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// Result of a tool invocation.
///
/// `is_error` is the domain-failure channel: the tool ran to completion
/// but reports a logical failure. It is forwarded to the caller verbatim,
/// distinct from a protocol-level fault.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolOutput {
    /// Content returned by the tool.
    pub content: Vec<ContentBlock>,
    /// Whether the tool reports a logical failure.
    #[serde(skip_serializing_if = "is_false")]
    pub is_error: bool,
}

impl ToolOutput {
    /// Creates a successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            is_error: false,
        }
    }

    /// Creates a domain-failure text result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(message)],
            is_error: true,
        }
    }
}

/// One content entry of a resource read.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    /// The URI this content belongs to.
    pub uri: String,
    /// MIME type of the content.
    pub mime_type: String,
    /// The content itself.
    pub text: String,
}

/// Message author role in a prompt result.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The caller's side of the conversation.
    User,
    /// The model's side of the conversation.
    Assistant,
}

/// One message of a prompt result.
#[derive(Debug, Clone, Serialize)]
pub struct PromptMessage {
    /// Message author.
    pub role: Role,
    /// Message content.
    pub content: ContentBlock,
}

impl PromptMessage {
    /// Creates a user message with text content.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: ContentBlock::text(text),
        }
    }
}

/// The result of invoking a capability handler.
///
/// Polymorphic over the three result shapes; each kind's handlers return
/// the matching variant.
#[derive(Debug, Clone)]
pub enum InvokeOutput {
    /// Tool result: content blocks plus the domain-failure flag.
    Tool(ToolOutput),
    /// Resource result: one or more content entries.
    Resource(Vec<ResourceContents>),
    /// Prompt result: an optional description and a message sequence.
    Prompt {
        /// Description of the generated prompt.
        description: Option<String>,
        /// The message sequence.
        messages: Vec<PromptMessage>,
    },
}

impl InvokeOutput {
    /// Encodes this output as the JSON result payload for its request.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Tool(output) => {
                serde_json::to_value(&output).unwrap_or_else(|_| json!({"content": []}))
            }
            Self::Resource(contents) => json!({ "contents": contents }),
            Self::Prompt {
                description,
                messages,
            } => {
                let mut result = json!({ "messages": messages });
                if let (Some(desc), Some(obj)) = (description, result.as_object_mut()) {
                    obj.insert("description".to_string(), json!(desc));
                }
                result
            }
        }
    }
}

/// Future type produced by a capability handler.
pub type HandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<InvokeOutput>> + Send>>;

/// A capability handler: an async function from validated arguments to an
/// invocation result. Stored by value in the registry.
pub type Handler = Arc<dyn Fn(ValidatedArgs) -> HandlerFuture + Send + Sync>;

/// A registered capability descriptor.
///
/// Immutable after registration. The handler is reachable only through
/// [`Capability::invoke`]; listings never expose it.
#[derive(Clone)]
pub struct Capability {
    name: String,
    description: String,
    schema: ArgumentShape,
    handler: Handler,
}

impl Capability {
    /// The capability's unique name within its kind.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The declared argument shape.
    #[must_use]
    pub const fn schema(&self) -> &ArgumentShape {
        &self.schema
    }

    /// Invokes the handler with already-validated arguments.
    pub fn invoke(&self, args: ValidatedArgs) -> HandlerFuture {
        (self.handler)(args)
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Holds the three capability namespaces.
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    tools: IndexMap<String, Capability>,
    resources: IndexMap<String, Capability>,
    prompts: IndexMap<String, Capability>,
}

impl CapabilityRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    const fn namespace(&self, kind: CapabilityKind) -> &IndexMap<String, Capability> {
        match kind {
            CapabilityKind::Tool => &self.tools,
            CapabilityKind::Resource => &self.resources,
            CapabilityKind::Prompt => &self.prompts,
        }
    }

    fn namespace_mut(&mut self, kind: CapabilityKind) -> &mut IndexMap<String, Capability> {
        match kind {
            CapabilityKind::Tool => &mut self.tools,
            CapabilityKind::Resource => &mut self.resources,
            CapabilityKind::Prompt => &mut self.prompts,
        }
    }

    /// Registers a capability under `(kind, name)`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Duplicate`] if the name is already taken in
    /// that namespace; the existing registration stays active.
    pub fn register<F, Fut>(
        &mut self,
        kind: CapabilityKind,
        name: &str,
        description: &str,
        schema: ArgumentShape,
        handler: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(ValidatedArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<InvokeOutput>> + Send + 'static,
    {
        let namespace = self.namespace_mut(kind);
        if namespace.contains_key(name) {
            return Err(RegistryError::Duplicate {
                kind,
                name: name.to_string(),
            });
        }

        let capability = Capability {
            name: name.to_string(),
            description: description.to_string(),
            schema,
            handler: Arc::new(move |args| Box::pin(handler(args))),
        };
        namespace.insert(name.to_string(), capability);
        Ok(())
    }

    /// Registers a tool.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Duplicate`] if the tool name is taken.
    pub fn register_tool<F, Fut>(
        &mut self,
        name: &str,
        description: &str,
        schema: ArgumentShape,
        handler: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(ValidatedArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<InvokeOutput>> + Send + 'static,
    {
        self.register(CapabilityKind::Tool, name, description, schema, handler)
    }

    /// Registers a resource. The name is its URI, optionally containing a
    /// single trailing `{placeholder}` template segment.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Duplicate`] if the URI is taken.
    pub fn register_resource<F, Fut>(
        &mut self,
        uri: &str,
        description: &str,
        schema: ArgumentShape,
        handler: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(ValidatedArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<InvokeOutput>> + Send + 'static,
    {
        self.register(CapabilityKind::Resource, uri, description, schema, handler)
    }

    /// Registers a prompt.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Duplicate`] if the prompt name is taken.
    pub fn register_prompt<F, Fut>(
        &mut self,
        name: &str,
        description: &str,
        schema: ArgumentShape,
        handler: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(ValidatedArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<InvokeOutput>> + Send + 'static,
    {
        self.register(CapabilityKind::Prompt, name, description, schema, handler)
    }

    /// Returns the descriptors of a namespace in registration order.
    ///
    /// Listing is a pure read; no handler code runs.
    pub fn list(&self, kind: CapabilityKind) -> impl Iterator<Item = &Capability> {
        self.namespace(kind).values()
    }

    /// Resolves a capability by kind and name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if no such capability exists.
    pub fn resolve(&self, kind: CapabilityKind, name: &str) -> Result<&Capability, RegistryError> {
        self.namespace(kind)
            .get(name)
            .ok_or_else(|| RegistryError::NotFound {
                kind,
                name: name.to_string(),
            })
    }

    /// Resolves a resource URI against registered URIs and templates.
    ///
    /// An exact match wins. Otherwise a template of the form
    /// `prefix{placeholder}` matches any URI starting with `prefix`; the
    /// remainder is captured under the placeholder name and returned as an
    /// argument object to be validated against the resource's schema.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if nothing matches.
    pub fn resolve_resource_uri(
        &self,
        uri: &str,
    ) -> Result<(&Capability, Option<Value>), RegistryError> {
        if let Some(capability) = self.resources.get(uri) {
            return Ok((capability, None));
        }

        for (template, capability) in &self.resources {
            let Some(open) = template.find('{') else {
                continue;
            };
            if !template.ends_with('}') {
                continue;
            }
            let prefix = &template[..open];
            let placeholder = &template[open + 1..template.len() - 1];
            if uri.len() > prefix.len() && uri.starts_with(prefix) {
                let captured = &uri[prefix.len()..];
                return Ok((capability, Some(json!({ placeholder: captured }))));
            }
        }

        Err(RegistryError::NotFound {
            kind: CapabilityKind::Resource,
            name: uri.to_string(),
        })
    }
}
