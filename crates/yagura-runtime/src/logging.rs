//! Logging setup for Yagura applications.
//!
//! Installs a `tracing-subscriber` registry with an env-filter and a fmt layer.
//! The core emits its diagnostics under the `yagura` target; each dispatched
//! event runs inside a `dispatch` span carrying the event name and id, so
//! enabling span events shows how long every event spent in the stack.
//!
//! # Configuration-Based Initialization
//!
//! ```rust,ignore
//! use yagura_runtime::{config::load_config, logging};
//!
//! let config = load_config()?;
//! logging::init_from_config(&config.logging);
//! ```
//!
//! # Manual Initialization
//!
//! ```rust,ignore
//! use yagura_runtime::config::{LogLevel, SpanEventConfig};
//! use yagura_runtime::logging::LoggingBuilder;
//!
//! LoggingBuilder::new()
//!     .level(LogLevel::Debug)
//!     .directive("yagura=trace")
//!     .span_events(SpanEventConfig { close: true, ..Default::default() })
//!     .init();
//! ```

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::Subscriber;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LogFormat, LogLevel, LogOutput, LoggingConfig, SpanEventConfig};

/// Initializes logging from a [`LoggingConfig`].
///
/// Does nothing if a global subscriber is already installed.
pub fn init_from_config(config: &LoggingConfig) {
    let _ = LoggingBuilder::from_config(config).try_init();
}

fn fmt_span(events: &SpanEventConfig) -> FmtSpan {
    [
        (events.new, FmtSpan::NEW),
        (events.enter, FmtSpan::ENTER),
        (events.exit, FmtSpan::EXIT),
        (events.close, FmtSpan::CLOSE),
    ]
    .into_iter()
    .filter(|(enabled, _)| *enabled)
    .fold(FmtSpan::NONE, |span, (_, flag)| span | flag)
}

// =============================================================================
// LoggingBuilder
// =============================================================================

/// A builder for the global tracing subscriber.
///
/// Starts from a [`LoggingConfig`]; per-target filters become env-filter
/// directives, applied on top of `RUST_LOG` or the configured level.
#[derive(Debug, Default)]
pub struct LoggingBuilder {
    config: LoggingConfig,
    directives: Vec<String>,
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        let mut filters: Vec<_> = config.filters.iter().collect();
        filters.sort_by(|a, b| a.0.cmp(b.0));

        Self {
            config: config.clone(),
            directives: filters
                .into_iter()
                .map(|(target, level)| format!("{target}={level}"))
                .collect(),
        }
    }

    /// Sets the level used when `RUST_LOG` is not set.
    pub fn level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    /// Adds a filter directive such as `yagura=debug`.
    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    pub fn span_events(mut self, events: SpanEventConfig) -> Self {
        self.config.span_events = events;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.config.output = output;
        self
    }

    /// Sets the file written to when the output is [`LogOutput::File`].
    pub fn file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.file_path = Some(path.into());
        self
    }

    pub fn thread_ids(mut self, enabled: bool) -> Self {
        self.config.thread_ids = enabled;
        self
    }

    pub fn file_location(mut self, enabled: bool) -> Self {
        self.config.file_location = enabled;
        self
    }

    fn filter(&self) -> EnvFilter {
        let default = LevelFilter::from_level(self.config.level.to_tracing_level());
        let mut filter = EnvFilter::builder()
            .with_default_directive(default.into())
            .from_env_lossy();

        for directive in &self.directives {
            match directive.parse() {
                Ok(d) => filter = filter.add_directive(d),
                Err(e) => eprintln!("Ignoring invalid log directive '{directive}': {e}"),
            }
        }
        filter
    }

    fn writer(&self) -> BoxMakeWriter {
        match (self.config.output, &self.config.file_path) {
            (LogOutput::Stdout, _) => BoxMakeWriter::new(std::io::stdout),
            (LogOutput::Stderr, _) => BoxMakeWriter::new(std::io::stderr),
            (LogOutput::File, Some(path)) => BoxMakeWriter::new(tracing_appender::rolling::never(
                path.parent().unwrap_or_else(|| Path::new(".")),
                path.file_name().unwrap_or_else(|| OsStr::new("yagura.log")),
            )),
            (LogOutput::File, None) => {
                eprintln!("File output requested but no file path configured, using stdout");
                BoxMakeWriter::new(std::io::stdout)
            }
        }
    }

    fn fmt_layer<S>(&self) -> Box<dyn tracing_subscriber::Layer<S> + Send + Sync>
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        let layer = fmt::layer()
            .with_writer(self.writer())
            .with_span_events(fmt_span(&self.config.span_events))
            .with_thread_ids(self.config.thread_ids)
            .with_file(self.config.file_location)
            .with_line_number(self.config.file_location);

        match self.config.format {
            LogFormat::Compact => layer.compact().boxed(),
            LogFormat::Full => layer.boxed(),
            LogFormat::Pretty => layer.pretty().boxed(),
            #[cfg(feature = "json-log")]
            LogFormat::Json => layer.json().boxed(),
        }
    }

    /// Initializes the global subscriber, ignoring failure.
    pub fn init(self) {
        let _ = self.try_init();
    }

    /// Initializes the global subscriber.
    pub fn try_init(self) -> Result<(), TryInitError> {
        tracing_subscriber::registry()
            .with(self.fmt_layer())
            .with(self.filter())
            .try_init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_event_flags() {
        assert_eq!(fmt_span(&SpanEventConfig::default()), FmtSpan::NONE);

        let lifecycle = SpanEventConfig {
            new: true,
            close: true,
            ..Default::default()
        };
        assert_eq!(fmt_span(&lifecycle), FmtSpan::NEW | FmtSpan::CLOSE);

        let all = SpanEventConfig {
            new: true,
            enter: true,
            exit: true,
            close: true,
        };
        assert_eq!(fmt_span(&all), FmtSpan::FULL);
    }

    #[test]
    fn test_builder_from_config() {
        let mut config = LoggingConfig {
            level: LogLevel::Debug,
            output: LogOutput::Stderr,
            file_location: true,
            ..Default::default()
        };
        config.filters.insert("yagura_framework".into(), LogLevel::Trace);
        config.filters.insert("yagura".into(), LogLevel::Warn);

        let builder = LoggingBuilder::from_config(&config)
            .directive("hyper=error")
            .thread_ids(true);
        assert_eq!(builder.config.level, LogLevel::Debug);
        assert_eq!(builder.config.output, LogOutput::Stderr);
        assert!(builder.config.file_location && builder.config.thread_ids);
        assert_eq!(
            builder.directives,
            vec!["yagura=warn", "yagura_framework=trace", "hyper=error"]
        );
    }

    #[test]
    fn test_builder_setters_override_config() {
        let builder = LoggingBuilder::new()
            .level(LogLevel::Error)
            .format(LogFormat::Pretty)
            .output(LogOutput::File)
            .file_path("logs/app.log");
        assert_eq!(builder.config.level, LogLevel::Error);
        assert_eq!(builder.config.format, LogFormat::Pretty);
        assert_eq!(builder.config.file_path, Some(PathBuf::from("logs/app.log")));
        assert!(builder.directives.is_empty());
    }
}
