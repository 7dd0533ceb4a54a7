//! The service contract.
//!
//! Services are named, vendor-qualified singletons shared between layers.
//! Several vendors may provide the same service name; the most recently
//! registered vendor becomes the active one.
//!
//! Interface services are expressed as traits extending [`Service`] and are
//! registered and looked up as trait objects:
//!
//! ```rust,ignore
//! trait Storage: Service {
//!     fn put(&self, key: &str, value: Value);
//! }
//!
//! yagura.register_service::<dyn Storage>(Arc::new(MemoryStorage::new())).await?;
//! let storage = yagura.get_service::<dyn Storage>("Storage", None);
//! ```

use async_trait::async_trait;
use serde::Serialize;

use super::mount::Mount;
use crate::foundation::error::{BoxError, YaguraResult};
use crate::foundation::snapshot::ConfigSnapshot;
use crate::runtime::Yagura;

/// State shared by every service: identity, configuration and mount point.
#[derive(Debug)]
pub struct ServiceBase {
    name: String,
    vendor: String,
    config: ConfigSnapshot,
    mount: Mount,
}

impl ServiceBase {
    /// Creates a base with an empty configuration.
    pub fn new(name: impl Into<String>, vendor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vendor: vendor.into(),
            config: ConfigSnapshot::empty(),
            mount: Mount::new(),
        }
    }

    /// Creates a base with a snapshot of `config`.
    pub fn with_config<C: Serialize + ?Sized>(
        name: impl Into<String>,
        vendor: impl Into<String>,
        config: &C,
    ) -> YaguraResult<Self> {
        Ok(Self {
            name: name.into(),
            vendor: vendor.into(),
            config: ConfigSnapshot::new(config)?,
            mount: Mount::new(),
        })
    }

    /// Returns the service name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the vendor name.
    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    /// Returns the configuration snapshot.
    pub fn config(&self) -> &ConfigSnapshot {
        &self.config
    }

    /// Returns the mount point.
    pub fn mount(&self) -> &Mount {
        &self.mount
    }

    /// Returns the runtime this service is mounted on.
    pub fn yagura(&self) -> Option<Yagura> {
        self.mount.yagura()
    }
}

/// A named, vendor-qualified singleton.
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Returns the service's shared state.
    fn base(&self) -> &ServiceBase;

    /// Returns the service name.
    fn name(&self) -> &str {
        self.base().name()
    }

    /// Returns the vendor name.
    fn vendor(&self) -> &str {
        self.base().vendor()
    }

    /// Called once during registration, after mounting and before the
    /// service becomes visible to lookups.
    async fn initialize(&self) -> Result<(), BoxError> {
        Ok(())
    }
}
