//! The `ErrorHandler` service.

use async_trait::async_trait;

use super::logger::{DEFAULT_VENDOR, LOGGER, Logger};
use crate::foundation::error::{BoxError, ErrorReport};
use crate::framework::service::{Service, ServiceBase};

/// Service name of the error handler.
pub const ERROR_HANDLER: &str = "ErrorHandler";

/// Final destination of every error reported to the runtime.
///
/// Register implementations as `dyn ErrorHandler` under the name
/// [`ERROR_HANDLER`]. A handler that fails or panics is reported on stderr;
/// its failure never propagates further.
#[async_trait]
pub trait ErrorHandler: Service {
    /// Handles a reported error.
    async fn handle(&self, report: &ErrorReport) -> Result<(), BoxError>;
}

/// Logs every error through the active `Logger`.
#[derive(Debug)]
pub struct DefaultErrorHandler {
    base: ServiceBase,
}

impl DefaultErrorHandler {
    /// Creates the default error handler.
    pub fn new() -> Self {
        Self {
            base: ServiceBase::new(ERROR_HANDLER, DEFAULT_VENDOR),
        }
    }
}

impl Default for DefaultErrorHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Service for DefaultErrorHandler {
    fn base(&self) -> &ServiceBase {
        &self.base
    }
}

#[async_trait]
impl ErrorHandler for DefaultErrorHandler {
    async fn handle(&self, report: &ErrorReport) -> Result<(), BoxError> {
        let message = report.display_chain();
        let logger = self
            .base
            .yagura()
            .and_then(|yagura| yagura.get_service::<dyn Logger>(LOGGER, None));

        match logger {
            Some(logger) => logger.error(&message, None),
            None => tracing::error!(target: "yagura", "{message}"),
        }
        Ok(())
    }
}
