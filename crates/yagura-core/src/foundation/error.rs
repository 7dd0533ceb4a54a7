//! Error types for the Yagura core.
//!
//! [`YaguraError`] covers every failure the runtime itself produces.
//! Component code (layers, services, consume hooks) reports failures as
//! [`BoxError`], and everything that reaches the runtime's error pipeline is
//! wrapped into an [`ErrorReport`], which carries its own
//! [`ConsumptionGuard`] so that re-reported errors can be detected.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::guard::ConsumptionGuard;

/// Type-erased error returned by layers, services and event hooks.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Result type for runtime operations.
pub type YaguraResult<T> = Result<T, YaguraError>;

// =============================================================================
// Runtime Errors
// =============================================================================

/// Errors produced by the Yagura runtime.
#[derive(Debug, Error)]
pub enum YaguraError {
    /// A layer or service was mounted onto a runtime a second time.
    #[error("{component} '{name}' has already been mounted")]
    AlreadyMounted {
        /// `"layer"` or `"service"`.
        component: &'static str,
        /// Name of the component.
        name: String,
    },

    /// An event was consumed twice.
    #[error("event {event}#{id} has already been consumed")]
    DoubleConsumption {
        /// Event type name.
        event: &'static str,
        /// Event identifier.
        id: String,
    },

    /// The event's `on_consumed` hook failed.
    #[error("consume hook of {event}#{id} failed: {source}")]
    ConsumeHook {
        /// Event type name.
        event: &'static str,
        /// Event identifier.
        id: String,
        /// The hook's failure.
        #[source]
        source: BoxError,
    },

    /// A layer requires an API version the host does not provide.
    #[error("layer '{layer}' requires yagura API {required}, host provides {host}")]
    VersionMismatch {
        /// Layer name.
        layer: String,
        /// Version the layer was built against.
        required: String,
        /// Version of this runtime.
        host: String,
    },

    /// A service with the same name and vendor is already registered.
    #[error("service '{name}' is already registered for vendor '{vendor}'")]
    DuplicateVendor {
        /// Service name.
        name: String,
        /// Vendor name.
        vendor: String,
    },

    /// A service failed its initialization hook.
    #[error("failed to initialize service '{name}' ({vendor}): {source}")]
    ServiceInit {
        /// Service name.
        name: String,
        /// Vendor name.
        vendor: String,
        /// The initialization failure.
        #[source]
        source: BoxError,
    },

    /// A layer failed its initialization hook.
    #[error("failed to initialize layer '{name}': {source}")]
    LayerInit {
        /// Layer name.
        name: String,
        /// The initialization failure.
        #[source]
        source: BoxError,
    },

    /// A layer panicked while handling an event or an error.
    #[error("layer '{layer}' panicked: {message}")]
    LayerPanicked {
        /// Layer name.
        layer: String,
        /// Panic payload rendered as text.
        message: String,
    },

    /// A panic escaped outside of any layer.
    #[error("panic: {0}")]
    Panic(String),

    /// A configuration value could not be serialized or deserialized.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An operation exceeded its deadline.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// Startup failed because an error was reported before initialization
    /// completed.
    #[error("startup failed: {0}")]
    Startup(ErrorReport),
}

impl YaguraError {
    /// Builds a [`YaguraError::LayerPanicked`] from a caught panic payload.
    pub(crate) fn layer_panicked(layer: &str, payload: &(dyn std::any::Any + Send)) -> Self {
        Self::LayerPanicked {
            layer: layer.to_string(),
            message: panic_message(payload),
        }
    }
}

/// Renders a panic payload as text.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// =============================================================================
// Error Reports
// =============================================================================

/// An error travelling through the runtime's error pipeline.
///
/// Cloning shares the underlying error and its guard, so a report that is
/// passed back into [`Yagura::handle_error`](crate::Yagura::handle_error)
/// is recognised as already handled.
#[derive(Clone)]
pub struct ErrorReport {
    inner: Arc<ReportInner>,
}

struct ReportInner {
    error: BoxError,
    guard: ConsumptionGuard,
}

impl ErrorReport {
    fn wrap(error: BoxError) -> Self {
        Self {
            inner: Arc::new(ReportInner {
                error,
                guard: ConsumptionGuard::new(),
            }),
        }
    }

    /// Wraps an error into a report.
    ///
    /// A boxed `ErrorReport` is unwrapped rather than nested, keeping its
    /// guard intact.
    pub fn new(error: impl Into<BoxError>) -> Self {
        let error: BoxError = error.into();
        Self::from(error)
    }

    /// Returns the wrapped error.
    pub fn error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.inner.error.as_ref()
    }

    /// Returns the report's consumption guard.
    pub fn guard(&self) -> &ConsumptionGuard {
        &self.inner.guard
    }

    /// Attempts to downcast the wrapped error.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.inner.error.downcast_ref::<E>()
    }

    /// Renders the error followed by its `source()` chain.
    pub fn display_chain(&self) -> String {
        let mut out = self.inner.error.to_string();
        let mut source = self.inner.error.source();
        while let Some(cause) = source {
            out.push_str("\n  caused by: ");
            out.push_str(&cause.to_string());
            source = cause.source();
        }
        out
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner.error, f)
    }
}

impl fmt::Debug for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorReport")
            .field("error", &self.inner.error)
            .field("handled", &self.inner.guard.was_handled())
            .finish()
    }
}

impl StdError for ErrorReport {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.error.source()
    }
}

impl From<BoxError> for ErrorReport {
    fn from(error: BoxError) -> Self {
        match error.downcast::<ErrorReport>() {
            Ok(report) => *report,
            Err(error) => Self::wrap(error),
        }
    }
}

impl From<YaguraError> for ErrorReport {
    fn from(error: YaguraError) -> Self {
        Self::wrap(Box::new(error))
    }
}

impl From<String> for ErrorReport {
    fn from(message: String) -> Self {
        Self::wrap(message.into())
    }
}

impl From<&str> for ErrorReport {
    fn from(message: &str) -> Self {
        Self::wrap(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boxed_report_is_not_nested() {
        let report = ErrorReport::from("boom");
        report.guard().flag_handled();

        let boxed: BoxError = Box::new(report.clone());
        let again = ErrorReport::from(boxed);
        assert!(again.guard().was_handled());
        assert_eq!(again.to_string(), "boom");
    }

    #[test]
    fn test_display_chain_includes_sources() {
        let report = ErrorReport::from(YaguraError::LayerInit {
            name: "net".into(),
            source: "socket closed".into(),
        });
        let rendered = report.display_chain();
        assert!(rendered.starts_with("failed to initialize layer 'net'"));
        assert!(rendered.contains("caused by: socket closed"));
    }

    #[test]
    fn test_downcast_ref() {
        let report = ErrorReport::from(YaguraError::Timeout(Duration::from_millis(5)));
        assert!(matches!(
            report.downcast_ref::<YaguraError>(),
            Some(YaguraError::Timeout(_))
        ));
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn std::any::Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
