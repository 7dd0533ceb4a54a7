//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use yagura_core::{RunMode, YaguraOptions};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YaguraConfig {
    /// Run mode of the runtime.
    #[serde(default)]
    pub mode: RunMode,

    /// Whether to install the panic hook and the signal watcher.
    #[serde(default = "default_process_hooks")]
    pub process_hooks: bool,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Per-layer configuration sections, keyed by layer name.
    #[serde(default)]
    pub layers: HashMap<String, Value>,

    /// Per-service configuration sections, keyed by service name.
    #[serde(default)]
    pub services: HashMap<String, Value>,
}

impl Default for YaguraConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::default(),
            process_hooks: default_process_hooks(),
            logging: LoggingConfig::default(),
            layers: HashMap::new(),
            services: HashMap::new(),
        }
    }
}

impl YaguraConfig {
    /// Returns the runtime options described by this configuration.
    pub fn options(&self) -> YaguraOptions {
        YaguraOptions {
            mode: self.mode,
            process_hooks: self.process_hooks,
        }
    }
}

fn default_process_hooks() -> bool {
    true
}

// =============================================================================
// Logging
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Global log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Output destination.
    #[serde(default)]
    pub output: LogOutput,

    /// Which span lifecycle events are logged.
    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Include thread ids.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line.
    #[serde(default)]
    pub file_location: bool,

    /// Per-target level overrides, e.g. `yagura_core = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,

    /// Log file path, required when `output` is `file`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
            filters: HashMap::new(),
            file_path: None,
        }
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    #[serde(alias = "warning")]
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature.
    #[cfg(feature = "json-log")]
    Json,
}

/// Log output destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Span lifecycle events to log.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let config: YaguraConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(config.mode, RunMode::Development);
        assert!(config.process_hooks);
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.output, LogOutput::Stdout);
        assert!(config.layers.is_empty());
    }

    #[test]
    fn test_sections_and_aliases() {
        let config: YaguraConfig = serde_json::from_value(json!({
            "mode": "prod",
            "process_hooks": false,
            "logging": { "level": "warning", "filters": { "yagura_core": "trace" } },
            "layers": { "Echo": { "prefix": ">" } }
        }))
        .unwrap();

        assert_eq!(config.mode, RunMode::Production);
        assert_eq!(config.logging.level, LogLevel::Warn);
        assert_eq!(config.logging.filters["yagura_core"], LogLevel::Trace);
        assert_eq!(config.layers["Echo"]["prefix"], json!(">"));

        let options = config.options();
        assert_eq!(options.mode, RunMode::Production);
        assert!(!options.process_hooks);
    }
}
