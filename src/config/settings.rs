//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ConfigError;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Transport selection and settings.
    #[serde(default)]
    pub transport: TransportConfig,

    /// File-backed resource settings.
    #[serde(default)]
    pub resources: ResourcesConfig,

    /// Outbound fetch settings for the fetch_url tool.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transport.http.bind.is_empty() {
            return Err(ConfigError::ValidationError {
                message: "transport.http.bind must not be empty".to_string(),
            });
        }
        if self.transport.http.session_idle_secs == 0 {
            return Err(ConfigError::ValidationError {
                message: "transport.http.session_idle_secs must be greater than zero".to_string(),
            });
        }
        if self.fetch.timeout_secs == 0 {
            return Err(ConfigError::ValidationError {
                message: "fetch.timeout_secs must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// The delivery mode the server runs in. Selected at startup; the two
/// modes are never mixed at runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Newline-delimited JSON-RPC over stdin/stdout.
    #[default]
    Stdio,
    /// Session-oriented streamable HTTP.
    Http,
}

/// Transport configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransportConfig {
    /// Which delivery mode to run.
    #[serde(default)]
    pub mode: TransportMode,

    /// Settings for the HTTP mode (ignored under stdio).
    #[serde(default)]
    pub http: HttpConfig,
}

/// HTTP transport configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    /// Address to bind, e.g. "127.0.0.1:8000".
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Idle threshold after which a session is eligible for reclamation.
    #[serde(default = "default_session_idle")]
    pub session_idle_secs: u64,

    /// How often the idle sweeper runs.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            session_idle_secs: default_session_idle(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

const fn default_session_idle() -> u64 {
    300
}

const fn default_sweep_interval() -> u64 {
    60
}

/// File-backed resource configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourcesConfig {
    /// Root directory file resources are confined to.
    /// Defaults to the current working directory.
    #[serde(default)]
    pub root: Option<PathBuf>,
}

/// Outbound fetch configuration for the fetch_url tool.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    /// Maximum number of characters returned from a fetched body.
    #[serde(default = "default_max_response_chars")]
    pub max_response_chars: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            max_response_chars: default_max_response_chars(),
        }
    }
}

const fn default_fetch_timeout() -> u64 {
    30
}

const fn default_max_response_chars() -> usize {
    10_000
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
