//! Error types for toolhost-mcp.
//!
//! The taxonomy separates failures by when they can occur and who recovers
//! from them:
//!
//! - [`ConfigError`] and [`RegistryError::Duplicate`] happen at startup and
//!   are fatal to the process.
//! - [`RegistryError::NotFound`], [`ValidationError`], and handler faults
//!   happen per-request and are converted into structured responses; the
//!   connection survives them.

use std::path::PathBuf;

use thiserror::Error;

use crate::registry::CapabilityKind;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors raised by the capability registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A capability with the same kind and name is already registered.
    ///
    /// Registration happens once at startup, so this is a configuration
    /// error and fatal; the registry never silently overwrites.
    #[error("duplicate {kind} registration: {name}")]
    Duplicate {
        /// Namespace the registration targeted.
        kind: CapabilityKind,
        /// The already-taken name.
        name: String,
    },

    /// No capability with this kind and name exists.
    #[error("unknown {kind}: {name}")]
    NotFound {
        /// Namespace that was searched.
        kind: CapabilityKind,
        /// The requested name.
        name: String,
    },
}

/// Argument validation failures, naming the offending field and the
/// violated constraint so the calling agent can self-correct and retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Arguments were not a JSON object.
    #[error("arguments must be a JSON object")]
    NotAnObject,

    /// A required field was absent.
    #[error("missing required argument: {field}")]
    MissingField {
        /// Name of the absent field.
        field: String,
    },

    /// A field was present with the wrong JSON type.
    #[error("argument '{field}' must be a {expected}")]
    TypeMismatch {
        /// Name of the mistyped field.
        field: String,
        /// Human-readable expected type.
        expected: &'static str,
    },

    /// An enum field carried a value outside its allowed set.
    #[error("argument '{field}' must be one of: {}", allowed.join(", "))]
    NotInEnum {
        /// Name of the field.
        field: String,
        /// The allowed values.
        allowed: Vec<String>,
    },

    /// A field was supplied that the schema does not declare.
    ///
    /// Schemas are closed: producers may only supply declared arguments.
    #[error("unknown argument: {field}")]
    UnknownField {
        /// Name of the undeclared field.
        field: String,
    },
}

impl ValidationError {
    /// Returns the name of the offending field, if the failure concerns one.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::NotAnObject => None,
            Self::MissingField { field }
            | Self::TypeMismatch { field, .. }
            | Self::NotInEnum { field, .. }
            | Self::UnknownField { field } => Some(field),
        }
    }
}

/// Errors raised by file-backed resource handlers.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The requested path resolves outside the configured resource root.
    #[error("access denied: path is outside the configured resource root")]
    AccessDenied,

    /// The requested file could not be read.
    #[error("failed to read resource: {path}")]
    ReadError {
        /// The resolved path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}
