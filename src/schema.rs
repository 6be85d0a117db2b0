//! Declarative argument schemas and validation.
//!
//! Every capability declares the shape of its arguments as an
//! [`ArgumentShape`]: a flat set of fields, each with a primitive or enum
//! kind, an optionality flag, and a description. Shapes are built once at
//! registration time and never mutated.
//!
//! Validation is closed: fields not declared by the schema are rejected,
//! so a handler only ever sees arguments it asked for. Validation is
//! synchronous and side-effect-free; it runs before the handler and a
//! failure means the handler is never invoked.

use serde_json::{json, Map, Value};

use crate::error::ValidationError;

/// The kind of a single argument field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// A JSON string.
    String,
    /// A JSON number (integer or float).
    Number,
    /// A JSON boolean.
    Boolean,
    /// A string restricted to a fixed set of values.
    Enum(Vec<String>),
}

impl FieldKind {
    /// Human-readable name of the expected JSON type.
    #[must_use]
    pub const fn expected(&self) -> &'static str {
        match self {
            Self::String | Self::Enum(_) => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }
}

/// A single declared argument field.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Field name.
    pub name: String,
    /// Human-readable description, surfaced in capability listings.
    pub description: String,
    /// Expected kind.
    pub kind: FieldKind,
    /// Whether the field must be present.
    pub required: bool,
}

/// A declarative description of a capability's expected arguments.
///
/// Field order is declaration order and is preserved in the rendered
/// JSON Schema.
#[derive(Debug, Clone, Default)]
pub struct ArgumentShape {
    fields: Vec<FieldSpec>,
}

impl ArgumentShape {
    /// Creates an empty shape (the capability takes no arguments).
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    fn field(mut self, name: &str, description: &str, kind: FieldKind, required: bool) -> Self {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            description: description.to_string(),
            kind,
            required,
        });
        self
    }

    /// Declares a required string field.
    #[must_use]
    pub fn string(self, name: &str, description: &str) -> Self {
        self.field(name, description, FieldKind::String, true)
    }

    /// Declares an optional string field.
    #[must_use]
    pub fn optional_string(self, name: &str, description: &str) -> Self {
        self.field(name, description, FieldKind::String, false)
    }

    /// Declares a required number field.
    #[must_use]
    pub fn number(self, name: &str, description: &str) -> Self {
        self.field(name, description, FieldKind::Number, true)
    }

    /// Declares an optional number field.
    #[must_use]
    pub fn optional_number(self, name: &str, description: &str) -> Self {
        self.field(name, description, FieldKind::Number, false)
    }

    /// Declares a required boolean field.
    #[must_use]
    pub fn boolean(self, name: &str, description: &str) -> Self {
        self.field(name, description, FieldKind::Boolean, true)
    }

    /// Declares an optional boolean field.
    #[must_use]
    pub fn optional_boolean(self, name: &str, description: &str) -> Self {
        self.field(name, description, FieldKind::Boolean, false)
    }

    /// Declares a required enum field restricted to `allowed`.
    #[must_use]
    pub fn enumeration(self, name: &str, description: &str, allowed: &[&str]) -> Self {
        let allowed = allowed.iter().map(ToString::to_string).collect();
        self.field(name, description, FieldKind::Enum(allowed), true)
    }

    /// Declares an optional enum field restricted to `allowed`.
    #[must_use]
    pub fn optional_enum(self, name: &str, description: &str, allowed: &[&str]) -> Self {
        let allowed = allowed.iter().map(ToString::to_string).collect();
        self.field(name, description, FieldKind::Enum(allowed), false)
    }

    /// Returns the declared fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Returns `true` if the shape declares no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validates `args` against this shape.
    ///
    /// `None` and `null` are treated as an empty argument object. An
    /// explicit `null` field value is treated as absent.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the offending field and the
    /// violated constraint: undeclared field, missing required field, type
    /// mismatch, or enum violation.
    pub fn validate(&self, args: Option<&Value>) -> Result<ValidatedArgs, ValidationError> {
        let empty = Map::new();
        let provided = match args {
            None | Some(Value::Null) => &empty,
            Some(Value::Object(map)) => map,
            Some(_) => return Err(ValidationError::NotAnObject),
        };

        // Closed schema: reject anything not declared.
        for key in provided.keys() {
            if !self.fields.iter().any(|f| f.name == *key) {
                return Err(ValidationError::UnknownField { field: key.clone() });
            }
        }

        let mut values = Map::new();
        for spec in &self.fields {
            let value = provided.get(&spec.name).filter(|v| !v.is_null());
            let Some(value) = value else {
                if spec.required {
                    return Err(ValidationError::MissingField {
                        field: spec.name.clone(),
                    });
                }
                continue;
            };

            let matches = match &spec.kind {
                FieldKind::String => value.is_string(),
                FieldKind::Number => value.is_number(),
                FieldKind::Boolean => value.is_boolean(),
                FieldKind::Enum(allowed) => match value.as_str() {
                    Some(s) if allowed.iter().any(|a| a == s) => true,
                    Some(_) => {
                        return Err(ValidationError::NotInEnum {
                            field: spec.name.clone(),
                            allowed: allowed.clone(),
                        })
                    }
                    None => false,
                },
            };

            if !matches {
                return Err(ValidationError::TypeMismatch {
                    field: spec.name.clone(),
                    expected: spec.kind.expected(),
                });
            }

            values.insert(spec.name.clone(), value.clone());
        }

        Ok(ValidatedArgs { values })
    }

    /// Renders this shape as a JSON Schema object for capability listings.
    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for spec in &self.fields {
            let mut prop = match &spec.kind {
                FieldKind::String | FieldKind::Number | FieldKind::Boolean => json!({
                    "type": spec.kind.expected(),
                }),
                FieldKind::Enum(allowed) => json!({
                    "type": "string",
                    "enum": allowed,
                }),
            };
            if let Some(obj) = prop.as_object_mut() {
                obj.insert("description".to_string(), json!(spec.description));
            }
            properties.insert(spec.name.clone(), prop);
            if spec.required {
                required.push(Value::String(spec.name.clone()));
            }
        }

        let mut schema = json!({
            "type": "object",
            "properties": Value::Object(properties),
        });
        if !required.is_empty() {
            if let Some(obj) = schema.as_object_mut() {
                obj.insert("required".to_string(), Value::Array(required));
            }
        }
        schema
    }
}

/// Arguments that have passed validation against an [`ArgumentShape`].
///
/// Handlers receive this instead of raw JSON, so they only ever observe
/// declared fields of the declared types.
#[derive(Debug, Clone, Default)]
pub struct ValidatedArgs {
    values: Map<String, Value>,
}

impl ValidatedArgs {
    /// An empty argument set, for capabilities with no declared fields.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns a string field, if present.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    /// Returns a string field, falling back to `default` when absent.
    #[must_use]
    pub fn str_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.get_str(name).unwrap_or(default)
    }

    /// Returns a number field, if present.
    #[must_use]
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.values.get(name).and_then(Value::as_f64)
    }

    /// Returns a boolean field, if present.
    #[must_use]
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.values.get(name).and_then(Value::as_bool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_shape() -> ArgumentShape {
        ArgumentShape::new()
            .string("url", "URL to fetch")
            .optional_number("limit", "Maximum bytes")
            .optional_boolean("follow", "Follow redirects")
            .optional_enum("mode", "Fetch mode", &["text", "head"])
    }

    #[test]
    fn accepts_valid_arguments() {
        let args = json!({"url": "https://example.com", "limit": 512, "mode": "text"});
        let validated = sample_shape().validate(Some(&args)).unwrap();
        assert_eq!(validated.get_str("url"), Some("https://example.com"));
        assert_eq!(validated.get_f64("limit"), Some(512.0));
        assert_eq!(validated.get_str("mode"), Some("text"));
        assert_eq!(validated.get_bool("follow"), None);
    }

    #[test]
    fn missing_required_field() {
        let args = json!({"limit": 512});
        let err = sample_shape().validate(Some(&args)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingField {
                field: "url".to_string()
            }
        );
    }

    #[test]
    fn wrong_type_names_field_and_expectation() {
        let args = json!({"url": 42});
        let err = sample_shape().validate(Some(&args)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::TypeMismatch {
                field: "url".to_string(),
                expected: "string"
            }
        );
    }

    #[test]
    fn enum_value_outside_set() {
        let args = json!({"url": "https://example.com", "mode": "binary"});
        let err = sample_shape().validate(Some(&args)).unwrap_err();
        assert!(matches!(err, ValidationError::NotInEnum { field, .. } if field == "mode"));
    }

    #[test]
    fn enum_value_wrong_type() {
        let args = json!({"url": "https://example.com", "mode": 3});
        let err = sample_shape().validate(Some(&args)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::TypeMismatch {
                field: "mode".to_string(),
                expected: "string"
            }
        );
    }

    #[test]
    fn rejects_undeclared_fields() {
        let args = json!({"url": "https://example.com", "extra": true});
        let err = sample_shape().validate(Some(&args)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownField {
                field: "extra".to_string()
            }
        );
    }

    #[test]
    fn rejects_non_object_arguments() {
        let args = json!(["url"]);
        let err = sample_shape().validate(Some(&args)).unwrap_err();
        assert_eq!(err, ValidationError::NotAnObject);
    }

    #[test]
    fn null_optional_field_is_absent() {
        let args = json!({"url": "https://example.com", "limit": null});
        let validated = sample_shape().validate(Some(&args)).unwrap();
        assert_eq!(validated.get_f64("limit"), None);
    }

    #[test]
    fn missing_args_ok_for_empty_shape() {
        let validated = ArgumentShape::new().validate(None).unwrap();
        assert_eq!(validated.get_str("anything"), None);
    }

    #[test]
    fn json_schema_rendering() {
        let schema = sample_shape().to_json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["url"]["type"], "string");
        assert_eq!(schema["properties"]["mode"]["enum"][0], "text");
        assert_eq!(schema["required"], json!(["url"]));
    }

    #[test]
    fn json_schema_omits_empty_required() {
        let schema = ArgumentShape::new()
            .optional_string("note", "A note")
            .to_json_schema();
        assert!(schema.get("required").is_none());
    }
}
