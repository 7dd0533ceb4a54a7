//! The layer contract.
//!
//! A [`Layer`] is one stage of the runtime's ordered event pipeline. Layers
//! are declared top to bottom; events flow from the first declared layer to
//! the last, and initialization runs in the opposite direction so that the
//! lowest (transport) layer is ready before anything above it.
//!
//! # Example
//!
//! ```rust,ignore
//! use yagura_core::{async_trait, BoxError, BoxedEvent, Flow, Layer, LayerBase};
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
//!         event.data_mut()["echoed"] = true.into();
//!         Ok(Flow::Stop)
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::mount::Mount;
use crate::foundation::error::{BoxError, YaguraResult};
use crate::foundation::event::BoxedEvent;
use crate::foundation::snapshot::ConfigSnapshot;
use crate::runtime::Yagura;

/// What the runtime does after a layer has handled an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flow {
    /// Pass the event to the next layer, unless the layer consumed it.
    Continue,
    /// Stop the chain. The runtime consumes the event if the layer did not.
    Stop,
}

/// State shared by every layer: name, configuration snapshot and mount point.
#[derive(Debug)]
pub struct LayerBase {
    name: String,
    config: ConfigSnapshot,
    mount: Mount,
}

impl LayerBase {
    /// Creates a base with an empty configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: ConfigSnapshot::empty(),
            mount: Mount::new(),
        }
    }

    /// Creates a base with a snapshot of `config`.
    pub fn with_config<C: Serialize + ?Sized>(
        name: impl Into<String>,
        config: &C,
    ) -> YaguraResult<Self> {
        Ok(Self {
            name: name.into(),
            config: ConfigSnapshot::new(config)?,
            mount: Mount::new(),
        })
    }

    /// Returns the layer name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the configuration snapshot.
    pub fn config(&self) -> &ConfigSnapshot {
        &self.config
    }

    /// Returns the mount point.
    pub fn mount(&self) -> &Mount {
        &self.mount
    }

    /// Returns the runtime this layer is mounted on.
    pub fn yagura(&self) -> Option<Yagura> {
        self.mount.yagura()
    }
}

/// A stage of the event pipeline.
#[async_trait]
pub trait Layer: Send + Sync + 'static {
    /// Returns the layer's shared state.
    fn base(&self) -> &LayerBase;

    /// Returns the layer name.
    fn name(&self) -> &str {
        self.base().name()
    }

    /// API version this layer was built against, if it declares one.
    ///
    /// See [`crate::version`].
    fn api_version(&self) -> Option<u32> {
        None
    }

    /// Called once during startup, bottom layer first.
    async fn initialize(&self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Handles an event.
    async fn handle_event(&self, event: &mut BoxedEvent) -> Result<Flow, BoxError>;

    /// Handles an error produced by this layer.
    ///
    /// The default forwards to the runtime's error pipeline. An unmounted layer
    /// hands the error back to the caller.
    async fn handle_error(&self, error: BoxError) -> Result<(), BoxError> {
        match self.base().yagura() {
            Some(yagura) => {
                yagura.handle_error(error).await;
                Ok(())
            }
            None => Err(error),
        }
    }
}

/// A shared, type-erased layer.
pub type BoxedLayer = Arc<dyn Layer>;
