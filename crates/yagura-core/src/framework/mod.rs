//! Framework layer: the layer and service contracts and service storage.

pub mod layer;
pub mod mount;
pub mod proxy;
pub(crate) mod registry;
pub mod service;
