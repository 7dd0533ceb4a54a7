//! Once-only back-reference from a component to its runtime.

use std::sync::OnceLock;

use crate::foundation::error::{YaguraError, YaguraResult};
use crate::runtime::{WeakYagura, Yagura};

/// Holds the runtime a layer or service is mounted on.
///
/// The handle is weak; components never keep the runtime alive.
#[derive(Debug, Default)]
pub struct Mount {
    runtime: OnceLock<WeakYagura>,
}

impl Mount {
    /// Creates an unmounted cell.
    pub const fn new() -> Self {
        Self {
            runtime: OnceLock::new(),
        }
    }

    /// Attaches the component to `yagura`.
    ///
    /// Fails with [`YaguraError::AlreadyMounted`] if the cell was already attached,
    /// whether to the same runtime or a different one.
    pub fn attach(&self, yagura: &Yagura, component: &'static str, name: &str) -> YaguraResult<()> {
        self.runtime
            .set(yagura.downgrade())
            .map_err(|_| YaguraError::AlreadyMounted {
                component,
                name: name.to_string(),
            })
    }

    /// Returns whether the cell has been attached.
    pub fn is_mounted(&self) -> bool {
        self.runtime.get().is_some()
    }

    /// Returns the runtime, if mounted and still alive.
    pub fn yagura(&self) -> Option<Yagura> {
        self.runtime.get().and_then(WeakYagura::upgrade)
    }
}
