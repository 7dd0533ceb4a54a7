//! # Yagura Framework
//!
//! Conveniences composed on top of [`yagura_core`]:
//!
//! - **Filtering**: [`EventFilter`], [`Filtered`], [`LayerExt::filtered`]
//! - **Timeouts**: [`with_timeout`], [`timeout_or_none`], [`TimeoutExt`]
//! - **Layers**: [`LoggingLayer`]

pub mod filter;
pub mod logging_layer;
pub mod timeout;

pub use filter::{EventFilter, Filtered, LayerExt, filtered};
pub use logging_layer::LoggingLayer;
pub use timeout::{TimeoutExt, timeout_or_none, with_timeout};
