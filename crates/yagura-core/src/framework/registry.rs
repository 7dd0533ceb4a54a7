//! Type-erased storage for registered services.
//!
//! Services are stored as `Arc<T>` boxed behind `Arc<dyn Any + Send + Sync>`,
//! keyed by service name and vendor. `T` is usually a `dyn Trait`, so lookups
//! downcast to `Arc<T>` rather than to `T` itself.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::foundation::error::{YaguraError, YaguraResult};

type ServiceArc = Arc<dyn Any + Send + Sync>;

struct ServiceSlot {
    instance: ServiceArc,
    type_name: &'static str,
}

struct ServiceHolder {
    active: String,
    vendors: HashMap<String, ServiceSlot>,
}

/// Registry of services keyed by name, then vendor.
#[derive(Default)]
pub(crate) struct ServiceRegistry {
    services: RwLock<HashMap<String, ServiceHolder>>,
}

impl ServiceRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns whether `name` is registered for `vendor`.
    pub(crate) fn contains(&self, name: &str, vendor: &str) -> bool {
        self.services
            .read()
            .get(name)
            .is_some_and(|holder| holder.vendors.contains_key(vendor))
    }

    /// Inserts a service and promotes its vendor to active.
    pub(crate) fn insert<T>(&self, name: &str, vendor: &str, service: Arc<T>) -> YaguraResult<()>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let mut services = self.services.write();
        let holder = services
            .entry(name.to_string())
            .or_insert_with(|| ServiceHolder {
                active: vendor.to_string(),
                vendors: HashMap::new(),
            });

        if holder.vendors.contains_key(vendor) {
            return Err(YaguraError::DuplicateVendor {
                name: name.to_string(),
                vendor: vendor.to_string(),
            });
        }

        holder.vendors.insert(
            vendor.to_string(),
            ServiceSlot {
                instance: Arc::new(service),
                type_name: std::any::type_name::<T>(),
            },
        );
        holder.active = vendor.to_string();
        Ok(())
    }

    /// Resolves a service.
    ///
    /// With `vendor` set, only that vendor is considered. Otherwise the active
    /// vendor is used. Returns `None` if the entry is missing or was
    /// registered under a different type.
    pub(crate) fn get<T>(&self, name: &str, vendor: Option<&str>) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let services = self.services.read();
        let holder = services.get(name)?;
        let vendor = vendor.unwrap_or(&holder.active);
        let slot = holder.vendors.get(vendor)?;

        match slot.instance.downcast_ref::<Arc<T>>() {
            Some(service) => Some(Arc::clone(service)),
            None => {
                tracing::debug!(
                    service = name,
                    vendor,
                    stored = slot.type_name,
                    requested = std::any::type_name::<T>(),
                    "Service type mismatch"
                );
                None
            }
        }
    }

    /// Returns the vendors registered for `name`, sorted.
    pub(crate) fn vendors(&self, name: &str) -> Vec<String> {
        let mut vendors: Vec<String> = self
            .services
            .read()
            .get(name)
            .map(|holder| holder.vendors.keys().cloned().collect())
            .unwrap_or_default();
        vendors.sort();
        vendors
    }

    /// Returns the active vendor for `name`.
    pub(crate) fn active_vendor(&self, name: &str) -> Option<String> {
        self.services.read().get(name).map(|holder| holder.active.clone())
    }

    /// Returns all registered service names, sorted.
    pub(crate) fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.services.read().keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct Plain(&'static str);

    impl Greeter for Plain {
        fn greet(&self) -> String {
            self.0.to_string()
        }
    }

    #[test]
    fn test_latest_vendor_becomes_active() {
        let registry = ServiceRegistry::new();
        registry
            .insert::<dyn Greeter>("Greeter", "a", Arc::new(Plain("a")))
            .unwrap();
        registry
            .insert::<dyn Greeter>("Greeter", "b", Arc::new(Plain("b")))
            .unwrap();

        assert_eq!(registry.active_vendor("Greeter").as_deref(), Some("b"));
        assert_eq!(registry.get::<dyn Greeter>("Greeter", None).unwrap().greet(), "b");
        assert_eq!(
            registry.get::<dyn Greeter>("Greeter", Some("a")).unwrap().greet(),
            "a"
        );
        assert!(registry.get::<dyn Greeter>("Greeter", Some("c")).is_none());
        assert_eq!(registry.vendors("Greeter"), vec!["a", "b"]);
    }

    #[test]
    fn test_duplicate_vendor_rejected() {
        let registry = ServiceRegistry::new();
        registry.insert("Counter", "x", Arc::new(1u32)).unwrap();
        let err = registry.insert("Counter", "x", Arc::new(2u32)).unwrap_err();
        assert!(matches!(err, YaguraError::DuplicateVendor { .. }));
        assert_eq!(*registry.get::<u32>("Counter", None).unwrap(), 1);
    }

    #[test]
    fn test_type_mismatch_returns_none() {
        let registry = ServiceRegistry::new();
        registry.insert("Counter", "x", Arc::new(1u32)).unwrap();
        assert!(registry.get::<u64>("Counter", None).is_none());
        assert!(registry.get::<u32>("Missing", None).is_none());
        assert_eq!(registry.names(), vec!["Counter"]);
        assert!(registry.contains("Counter", "x"));
        assert!(!registry.contains("Counter", "y"));
    }
}
