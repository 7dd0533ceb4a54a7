//! Late-binding service handles.

use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use super::registry::ServiceRegistry;

/// A handle that resolves a service on every access.
///
/// Obtain one with [`Yagura::get_service_proxy`](crate::Yagura::get_service_proxy).
/// Without a pinned vendor the proxy always follows the currently active
/// vendor, so a consumer created early sees services registered later. The
/// proxy does not keep the runtime alive; once it is dropped, every access
/// yields `None`.
pub struct ServiceProxy<T: ?Sized> {
    registry: Weak<ServiceRegistry>,
    name: String,
    vendor: Option<String>,
    _marker: PhantomData<fn() -> Arc<T>>,
}

impl<T> ServiceProxy<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    pub(crate) fn new(registry: &Arc<ServiceRegistry>, name: &str, vendor: Option<&str>) -> Self {
        Self {
            registry: Arc::downgrade(registry),
            name: name.to_string(),
            vendor: vendor.map(str::to_string),
            _marker: PhantomData,
        }
    }

    /// Returns the service name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the pinned vendor, if any.
    pub fn vendor(&self) -> Option<&str> {
        self.vendor.as_deref()
    }

    /// Resolves the service now.
    pub fn get(&self) -> Option<Arc<T>> {
        self.registry
            .upgrade()?
            .get::<T>(&self.name, self.vendor.as_deref())
    }

    /// Resolves the service and applies `f` to it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.get().map(|service| f(&service))
    }
}

impl<T: ?Sized> Clone for ServiceProxy<T> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            name: self.name.clone(),
            vendor: self.vendor.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized> fmt::Debug for ServiceProxy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceProxy")
            .field("name", &self.name)
            .field("vendor", &self.vendor)
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}
