//! Foundation layer: events, errors and plain-data building blocks.

pub mod app_event;
pub mod error;
pub mod event;
pub mod guard;
pub mod snapshot;
pub mod version;
