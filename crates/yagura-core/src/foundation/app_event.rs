//! Application lifecycle events.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::event::{Event, EventHeader};

/// Kind of an [`AppEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppEventKind {
    /// Emitted once the runtime is initialized, before queued events are drained.
    Start,
    /// Emitted when the runtime begins shutting down.
    Shutdown,
    /// Requests an application restart.
    Restart,
    /// Requests a configuration reload.
    Reload,
    /// Requests an immediate shutdown.
    ForceShutdown,
}

impl AppEventKind {
    /// Returns the kind as a lowercase string.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Shutdown => "shutdown",
            Self::Restart => "restart",
            Self::Reload => "reload",
            Self::ForceShutdown => "force_shutdown",
        }
    }
}

/// Lifecycle event dispatched by the runtime itself.
///
/// The payload is the kind's string form, e.g. `"start"`.
#[derive(Debug)]
pub struct AppEvent {
    header: EventHeader,
    kind: AppEventKind,
}

impl AppEvent {
    /// Creates a lifecycle event of the given kind.
    pub fn new(kind: AppEventKind) -> Self {
        Self {
            header: EventHeader::new(Value::String(kind.as_str().to_string())),
            kind,
        }
    }

    /// Returns the event kind.
    pub fn kind(&self) -> AppEventKind {
        self.kind
    }
}

impl Event for AppEvent {
    crate::event_base!(header);
}
