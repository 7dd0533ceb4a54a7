//! # Yagura Core
//!
//! The core engine of the Yagura layered event runtime.
//!
//! A Yagura application is an ordered stack of [`Layer`]s plus a registry of
//! named, vendor-qualified [`Service`]s. Events enter at the top of the stack
//! and travel downwards until a layer stops them; every event is consumed
//! exactly once.
//!
//! ## Architecture Layers
//!
//! ### Foundation Layer
//!
//! - **Event System**: [`Event`], [`EventHeader`], [`BoxedEvent`], [`EventExt`]
//! - **Consumption Guard**: once-only latch shared by events and errors ([`ConsumptionGuard`])
//! - **Errors**: [`YaguraError`], [`ErrorReport`], [`BoxError`]
//! - **Configuration Snapshots**: [`ConfigSnapshot`]
//! - **API Versioning**: [`version`]
//!
//! ### Framework Layer
//!
//! - **Layers**: [`Layer`], [`LayerBase`], [`Flow`]
//! - **Services**: [`Service`], [`ServiceBase`], [`ServiceProxy`]
//!
//! ### Runtime Layer
//!
//! - **Runtime**: [`Yagura`], [`YaguraBuilder`], [`LifecycleState`], [`RunMode`]
//! - **Built-in Services**: [`Logger`], [`ErrorHandler`]
//!
//! ## Event Flow
//!
//! ```text
//!   dispatch(event)
//!        │
//!  ┌─────▼─────┐   Continue   ┌───────────┐   Continue   ┌───────────┐
//!  │  Layer 0  │─────────────▶│  Layer 1  │─────────────▶│  Layer 2  │
//!  └───────────┘              └───────────┘              └───────────┘
//!        │ Stop / consumed          │ Err / panic               │ end of stack
//!        ▼                          ▼                           ▼
//!     consumed             layer.handle_error()          consumed by runtime
//! ```
//!
//! Layers are initialized in the opposite direction: the last declared layer
//! (typically the transport) first.
//!
//! ## Example
//!
//! ```rust,ignore
//! use yagura_core::{
//!     BoxError, BoxedEvent, DataEvent, EventExt, Flow, Layer, LayerBase, Yagura, async_trait,
//! };
//! use serde_json::json;
//!
//! struct Echo {
//!     base: LayerBase,
//! }
//!
//! #[async_trait]
//! impl Layer for Echo {
//!     fn base(&self) -> &LayerBase {
//!         &self.base
//!     }
//!
//!     async fn handle_event(&self, event: &mut BoxedEvent) -> Result<Flow, BoxError> {
//!         event.data_mut()["echoed"] = json!(true);
//!         Ok(Flow::Stop)
//!     }
//! }
//!
//! let yagura = Yagura::builder()
//!     .layer(Echo { base: LayerBase::new("Echo") })
//!     .start()
//!     .await?;
//!
//! let event = yagura.dispatch(BoxedEvent::new(DataEvent::new(json!({ "text": "hi" })))).await;
//! ```

pub mod foundation;
pub mod framework;
pub mod runtime;
pub mod services;

pub use foundation::version;

pub use foundation::app_event::{AppEvent, AppEventKind};
pub use foundation::error::{BoxError, ErrorReport, YaguraError, YaguraResult};
pub use foundation::event::{BoxedEvent, DataEvent, Event, EventExt, EventHeader, generate_id};
pub use foundation::guard::ConsumptionGuard;
pub use foundation::snapshot::ConfigSnapshot;
pub use foundation::version::{YAGURA_API_VERSION, api_version, is_compatible};

pub use framework::layer::{BoxedLayer, Flow, Layer, LayerBase};
pub use framework::mount::Mount;
pub use framework::proxy::ServiceProxy;
pub use framework::service::{Service, ServiceBase};

pub use runtime::hooks::shutdown_signal;
pub use runtime::lifecycle::{LifecycleState, MODE_ENV, RunMode, YaguraOptions};
pub use runtime::{WeakYagura, Yagura, YaguraBuilder};

pub use services::error_handler::{DefaultErrorHandler, ERROR_HANDLER, ErrorHandler};
pub use services::logger::{DEFAULT_VENDOR, DefaultLogger, LOGGER, Logger};

pub use async_trait::async_trait;
