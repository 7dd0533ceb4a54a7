//! Yagura Runtime - hosting layer for Yagura applications.
//!
//! This crate provides:
//! - Layered configuration loading with figment ([`ConfigLoader`], [`YaguraConfig`])
//! - Logging setup with `tracing-subscriber` ([`LoggingBuilder`])
//! - Application hosting ([`YaguraApp`])
//!
//! ```rust,ignore
//! use yagura_runtime::YaguraApp;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     YaguraApp::new()
//!         .layer(MyTransport::new())
//!         .run()
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod logging;

pub use app::{AppBuilder, YaguraApp};
pub use config::{ConfigError, ConfigLoader, ConfigResult, LoggingConfig, Profile, YaguraConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::LoggingBuilder;

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros for convenient imports.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
