//! Example prompts: reusable templates for common interactions.

use crate::error::RegistryError;
use crate::registry::{CapabilityRegistry, InvokeOutput, PromptMessage};
use crate::schema::ArgumentShape;

/// Registers the example prompts.
///
/// # Errors
///
/// Returns [`RegistryError::Duplicate`] on a name collision.
pub fn register(registry: &mut CapabilityRegistry) -> Result<(), RegistryError> {
    registry.register_prompt(
        "code_review",
        "Review code for quality and suggest improvements",
        ArgumentShape::new()
            .string("code", "The code to review")
            .optional_string("language", "Programming language")
            .optional_enum(
                "focus",
                "What to focus on",
                &["security", "performance", "readability", "all"],
            ),
        |args| async move {
            let code = args.str_or("code", "");
            let language = args.str_or("language", "unknown");
            let focus = args.str_or("focus", "all");

            let text = format!(
                "Please review the following {language} code with a focus on {focus}:\n\n\
                 ```{language}\n{code}\n```\n\n\
                 Provide:\n\
                 1. A summary of what the code does\n\
                 2. Potential issues or improvements\n\
                 3. Specific suggestions with code examples"
            );

            Ok(InvokeOutput::Prompt {
                description: Some(format!("Code review focused on {focus}")),
                messages: vec![PromptMessage::user(text)],
            })
        },
    )?;

    registry.register_prompt(
        "explain",
        "Explain a concept in simple terms",
        ArgumentShape::new()
            .string("topic", "The topic to explain")
            .optional_enum(
                "audience",
                "Target audience level",
                &["beginner", "intermediate", "expert"],
            ),
        |args| async move {
            let topic = args.str_or("topic", "");
            let audience = args.str_or("audience", "beginner");

            let text = format!(
                "Please explain \"{topic}\" for a {audience} audience.\n\n\
                 Include:\n\
                 - A clear definition\n\
                 - Key concepts\n\
                 - Practical examples\n\
                 - Common misconceptions (if any)"
            );

            Ok(InvokeOutput::Prompt {
                description: Some(format!("Explanation of {topic}")),
                messages: vec![PromptMessage::user(text)],
            })
        },
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{CapabilityKind, ContentBlock, Role};
    use serde_json::json;

    async fn get_prompt(name: &str, args: serde_json::Value) -> (Option<String>, Vec<PromptMessage>) {
        let mut registry = CapabilityRegistry::new();
        register(&mut registry).unwrap();

        let capability = registry.resolve(CapabilityKind::Prompt, name).unwrap();
        let validated = capability.schema().validate(Some(&args)).unwrap();
        match capability.invoke(validated).await.unwrap() {
            InvokeOutput::Prompt {
                description,
                messages,
            } => (description, messages),
            other => panic!("expected prompt output, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn code_review_defaults() {
        let (description, messages) =
            get_prompt("code_review", json!({"code": "fn main() {}"})).await;

        assert_eq!(description.unwrap(), "Code review focused on all");
        assert_eq!(messages.len(), 1);
        assert!(matches!(messages[0].role, Role::User));
        let ContentBlock::Text { text } = &messages[0].content;
        assert!(text.contains("fn main() {}"));
        assert!(text.contains("focus on all"));
    }

    #[tokio::test]
    async fn code_review_honours_arguments() {
        let (_, messages) = get_prompt(
            "code_review",
            json!({"code": "x = 1", "language": "python", "focus": "security"}),
        )
        .await;

        let ContentBlock::Text { text } = &messages[0].content;
        assert!(text.contains("python code"));
        assert!(text.contains("focus on security"));
    }

    #[tokio::test]
    async fn explain_includes_topic_and_audience() {
        let (_, messages) =
            get_prompt("explain", json!({"topic": "borrowing", "audience": "expert"})).await;

        let ContentBlock::Text { text } = &messages[0].content;
        assert!(text.contains("\"borrowing\""));
        assert!(text.contains("expert audience"));
    }
}
