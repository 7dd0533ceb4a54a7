//! Built-in services registered by every runtime.

pub mod error_handler;
pub mod logger;
