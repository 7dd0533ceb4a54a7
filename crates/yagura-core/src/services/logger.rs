//! The `Logger` service.
//!
//! The runtime routes its own diagnostics through whichever `Logger` vendor
//! is active. The default vendor forwards to `tracing`.

use std::sync::Arc;

use crate::foundation::event::Event;
use crate::framework::service::{Service, ServiceBase};

/// Service name of the logger.
pub const LOGGER: &str = "Logger";

/// Vendor name of the built-in services.
pub const DEFAULT_VENDOR: &str = "Default";

/// Leveled logging, optionally annotated with the event being processed.
///
/// Register implementations as `dyn Logger` under the name [`LOGGER`].
pub trait Logger: Service {
    /// Logs an error.
    fn error(&self, message: &str, event: Option<&dyn Event>);
    /// Logs a warning.
    fn warn(&self, message: &str, event: Option<&dyn Event>);
    /// Logs an informational message.
    fn info(&self, message: &str, event: Option<&dyn Event>);
    /// Logs a debug message.
    fn debug(&self, message: &str, event: Option<&dyn Event>);
    /// Logs a verbose (trace-level) message.
    fn verbose(&self, message: &str, event: Option<&dyn Event>);
}

macro_rules! emit {
    ($level:ident, $message:expr, $event:expr) => {
        match $event {
            Some(event) => tracing::$level!(target: "yagura", event = %event, "{}", $message),
            None => tracing::$level!(target: "yagura", "{}", $message),
        }
    };
}

/// Logger backed by `tracing`; `verbose` maps to `TRACE`.
#[derive(Debug)]
pub struct DefaultLogger {
    base: ServiceBase,
}

impl DefaultLogger {
    /// Creates the default logger.
    pub fn new() -> Self {
        Self {
            base: ServiceBase::new(LOGGER, DEFAULT_VENDOR),
        }
    }
}

impl Default for DefaultLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Service for DefaultLogger {
    fn base(&self) -> &ServiceBase {
        &self.base
    }
}

impl Logger for DefaultLogger {
    fn error(&self, message: &str, event: Option<&dyn Event>) {
        emit!(error, message, event);
    }

    fn warn(&self, message: &str, event: Option<&dyn Event>) {
        emit!(warn, message, event);
    }

    fn info(&self, message: &str, event: Option<&dyn Event>) {
        emit!(info, message, event);
    }

    fn debug(&self, message: &str, event: Option<&dyn Event>) {
        emit!(debug, message, event);
    }

    fn verbose(&self, message: &str, event: Option<&dyn Event>) {
        emit!(trace, message, event);
    }
}

/// The runtime's view of the active logger.
///
/// Falls back to `tracing` when no `Logger` service resolves.
pub(crate) struct RuntimeLog(Option<Arc<dyn Logger>>);

impl RuntimeLog {
    pub(crate) fn new(logger: Option<Arc<dyn Logger>>) -> Self {
        Self(logger)
    }

    pub(crate) fn error(&self, message: &str, event: Option<&dyn Event>) {
        match &self.0 {
            Some(logger) => logger.error(message, event),
            None => emit!(error, message, event),
        }
    }

    pub(crate) fn warn(&self, message: &str, event: Option<&dyn Event>) {
        match &self.0 {
            Some(logger) => logger.warn(message, event),
            None => emit!(warn, message, event),
        }
    }

    pub(crate) fn info(&self, message: &str, event: Option<&dyn Event>) {
        match &self.0 {
            Some(logger) => logger.info(message, event),
            None => emit!(info, message, event),
        }
    }

    pub(crate) fn debug(&self, message: &str, event: Option<&dyn Event>) {
        match &self.0 {
            Some(logger) => logger.debug(message, event),
            None => emit!(debug, message, event),
        }
    }

    pub(crate) fn verbose(&self, message: &str, event: Option<&dyn Event>) {
        match &self.0 {
            Some(logger) => logger.verbose(message, event),
            None => emit!(trace, message, event),
        }
    }
}
