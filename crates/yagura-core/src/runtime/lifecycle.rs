//! Lifecycle state and run-mode options.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Environment variable selecting the [`RunMode`].
pub const MODE_ENV: &str = "YAGURA_MODE";

/// Phase of a runtime's life.
///
/// States only move forward. Events dispatched before [`Initialized`] are
/// queued.
///
/// [`Initialized`]: LifecycleState::Initialized
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleState {
    /// Created, nothing initialized yet.
    Constructed,
    /// Services are being registered.
    ServicesInit,
    /// Layers are being mounted and initialized.
    LayersInit,
    /// Initialization finished; events dispatch directly.
    Initialized,
    /// The start event was dispatched and the startup queue drained.
    Running,
    /// Shutdown is in progress.
    ShuttingDown,
    /// Shutdown finished.
    Stopped,
}

impl LifecycleState {
    /// Returns whether events are dispatched directly in this state.
    pub fn accepts_events(self) -> bool {
        self >= Self::Initialized
    }
}

/// Controls how the runtime treats suspicious conditions.
///
/// In [`Production`](RunMode::Production) an event that arrives already
/// consumed is dropped; otherwise it is recycled and processed again.
/// [`Test`](RunMode::Test) behaves like development but never installs
/// process-wide hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Development mode.
    #[default]
    #[serde(alias = "dev")]
    Development,
    /// Production mode.
    #[serde(alias = "prod")]
    Production,
    /// Test mode.
    Test,
}

impl RunMode {
    /// Reads the mode from `YAGURA_MODE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var(MODE_ENV)
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }

    /// Returns whether this is production mode.
    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(format!("unknown run mode '{other}'")),
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        })
    }
}

/// Runtime options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YaguraOptions {
    /// Run mode.
    pub mode: RunMode,
    /// Whether to install the panic hook and the termination signal watcher.
    ///
    /// The watcher takes over Ctrl+C and SIGTERM for the whole process: a
    /// signal shuts the runtime down instead of terminating the process. A
    /// host that does not await [`Yagura::wait_for_stop`](crate::Yagura::wait_for_stop)
    /// (or otherwise exit after shutdown) should disable this.
    ///
    /// Ignored (treated as `false`) in [`RunMode::Test`].
    pub process_hooks: bool,
}

impl YaguraOptions {
    pub(crate) fn installs_hooks(&self) -> bool {
        self.process_hooks && self.mode != RunMode::Test
    }
}

impl Default for YaguraOptions {
    fn default() -> Self {
        Self {
            mode: RunMode::from_env(),
            process_hooks: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_ordering() {
        assert!(!LifecycleState::LayersInit.accepts_events());
        assert!(LifecycleState::Initialized.accepts_events());
        assert!(LifecycleState::Stopped.accepts_events());
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("prod".parse::<RunMode>(), Ok(RunMode::Production));
        assert_eq!(" Development ".parse::<RunMode>(), Ok(RunMode::Development));
        assert_eq!("test".parse::<RunMode>(), Ok(RunMode::Test));
        assert!("staging".parse::<RunMode>().is_err());
        assert_eq!(RunMode::Production.to_string(), "production");
    }

    #[test]
    fn test_test_mode_never_installs_hooks() {
        let options = YaguraOptions {
            mode: RunMode::Test,
            process_hooks: true,
        };
        assert!(!options.installs_hooks());
    }
}
