//! Example tools: callable functions the LLM can invoke.
//!
//! `fetch_url` demonstrates the domain-failure channel: a failed fetch is
//! a completed tool call that reports `isError`, not a handler fault.

use std::time::Duration;

use chrono::{Local, Utc};

use crate::config::FetchConfig;
use crate::error::RegistryError;
use crate::registry::{CapabilityRegistry, InvokeOutput, ToolOutput};
use crate::schema::ArgumentShape;

/// Format used by the get_time tool.
const TIME_FORMAT: &str = "%A, %B %d, %Y at %I:%M:%S %p %Z";

/// Registers the example tools.
///
/// # Errors
///
/// Returns [`RegistryError::Duplicate`] on a name collision.
pub fn register(
    registry: &mut CapabilityRegistry,
    fetch: &FetchConfig,
) -> Result<(), RegistryError> {
    registry.register_tool(
        "echo",
        "Echo back a message (example tool)",
        ArgumentShape::new().string("message", "Message to echo back"),
        |args| async move {
            let message = args.str_or("message", "");
            Ok(InvokeOutput::Tool(ToolOutput::text(format!(
                "Echo: {message}"
            ))))
        },
    )?;

    registry.register_tool(
        "get_time",
        "Get the current date and time",
        ArgumentShape::new().optional_enum(
            "timezone",
            "Timezone to format in (default: utc)",
            &["utc", "local"],
        ),
        |args| async move {
            let formatted = match args.str_or("timezone", "utc") {
                "local" => Local::now().format(TIME_FORMAT).to_string(),
                _ => Utc::now().format(TIME_FORMAT).to_string(),
            };
            Ok(InvokeOutput::Tool(ToolOutput::text(formatted)))
        },
    )?;

    let timeout = Duration::from_secs(fetch.timeout_secs);
    let max_chars = fetch.max_response_chars;
    registry.register_tool(
        "fetch_url",
        "Fetch content from a URL",
        ArgumentShape::new().string("url", "URL to fetch"),
        move |args| async move {
            let url = args.str_or("url", "");
            Ok(InvokeOutput::Tool(fetch_url(url, timeout, max_chars).await))
        },
    )?;

    Ok(())
}

/// Fetches a URL, reporting failures as domain errors.
async fn fetch_url(url: &str, timeout: Duration, max_chars: usize) -> ToolOutput {
    match try_fetch(url, timeout).await {
        Ok(body) => ToolOutput::text(truncate(body, max_chars)),
        Err(e) => ToolOutput::error(format!("Error fetching URL: {e}")),
    }
}

async fn try_fetch(url: &str, timeout: Duration) -> reqwest::Result<String> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let response = client.get(url).send().await?;
    response.text().await
}

/// Caps a body at `max_chars` characters.
fn truncate(text: String, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text
    } else {
        text.chars().take(max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Capability, CapabilityKind};
    use serde_json::json;

    fn registry() -> CapabilityRegistry {
        let mut registry = CapabilityRegistry::new();
        register(&mut registry, &FetchConfig::default()).unwrap();
        registry
    }

    async fn call(registry: &CapabilityRegistry, name: &str, args: serde_json::Value) -> ToolOutput {
        let capability = registry.resolve(CapabilityKind::Tool, name).unwrap();
        let validated = capability.schema().validate(Some(&args)).unwrap();
        match capability.invoke(validated).await.unwrap() {
            InvokeOutput::Tool(output) => output,
            other => panic!("expected tool output, got {other:?}"),
        }
    }

    #[test]
    fn tools_registered_in_order() {
        let registry = registry();
        let names: Vec<&str> = registry
            .list(CapabilityKind::Tool)
            .map(Capability::name)
            .collect();
        assert_eq!(names, vec!["echo", "get_time", "fetch_url"]);
    }

    #[tokio::test]
    async fn echo_prefixes_message() {
        let registry = registry();
        let output = call(&registry, "echo", json!({"message": "hello"})).await;
        assert!(!output.is_error);
        let crate::registry::ContentBlock::Text { text } = &output.content[0];
        assert_eq!(text, "Echo: hello");
    }

    #[tokio::test]
    async fn get_time_defaults_to_utc() {
        let registry = registry();
        let output = call(&registry, "get_time", json!({})).await;
        assert!(!output.is_error);
        let crate::registry::ContentBlock::Text { text } = &output.content[0];
        assert!(text.contains("UTC"));
    }

    #[tokio::test]
    async fn fetch_url_failure_is_domain_error() {
        let registry = registry();
        let output = call(&registry, "fetch_url", json!({"url": "not a url"})).await;
        assert!(output.is_error);
        let crate::registry::ContentBlock::Text { text } = &output.content[0];
        assert!(text.starts_with("Error fetching URL:"));
    }

    #[test]
    fn truncate_caps_long_bodies() {
        assert_eq!(truncate("abcdef".to_string(), 4), "abcd");
        assert_eq!(truncate("abc".to_string(), 4), "abc");
    }
}
