//! # Yagura
//!
//! A layered event runtime. Events enter an ordered stack of layers and are
//! consumed exactly once; services are looked up by name and vendor.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌─────────────────────────────────────────┐
//! │  YaguraApp   │────▶│ Yagura                                  │
//! │ config, logs │     │  Layer 0 ─▶ Layer 1 ─▶ ... ─▶ transport │──▶ services
//! └──────────────┘     └─────────────────────────────────────────┘
//! ```
//!
//! - [`core`]: events, layers, services and the runtime itself
//! - [`framework`]: event filters, timeouts, the logging layer
//! - [`runtime`]: configuration, logging setup, application hosting
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use yagura::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     YaguraApp::new()
//!         .layer(LoggingLayer::new())
//!         .layer(Echo::new().filtered(EventFilter::types().allow::<LineEvent>()))
//!         .layer(StdinTransport::new())
//!         .run()
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use yagura_core as core;
pub use yagura_framework as framework;
pub use yagura_runtime as runtime;

/// Commonly used types.
pub mod prelude {
    pub use yagura_runtime::{YaguraApp, YaguraConfig};

    pub use yagura_core::{
        AppEvent, AppEventKind, BoxError, BoxedEvent, DataEvent, ErrorHandler, ErrorReport, Event,
        EventExt, EventHeader, Flow, Layer, LayerBase, Logger, RunMode, Service, ServiceBase,
        ServiceProxy, Yagura, YaguraError, YaguraResult, async_trait, event_base,
    };

    pub use yagura_framework::{EventFilter, LayerExt, LoggingLayer, TimeoutExt};
}
