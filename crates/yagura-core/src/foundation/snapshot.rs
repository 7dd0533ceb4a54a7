//! Plain-data configuration snapshots for layers and services.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::error::{YaguraError, YaguraResult};

/// An immutable, cheaply clonable copy of a component's configuration.
///
/// The configuration is serialized once at construction, so later changes to
/// the caller's value are not observed.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSnapshot(Arc<Value>);

impl ConfigSnapshot {
    /// Serializes `config` into a snapshot.
    pub fn new<T: Serialize + ?Sized>(config: &T) -> YaguraResult<Self> {
        serde_json::to_value(config)
            .map(Self::from_value)
            .map_err(|e| YaguraError::InvalidConfig(e.to_string()))
    }

    /// Wraps an existing JSON value.
    pub fn from_value(value: Value) -> Self {
        Self(Arc::new(value))
    }

    /// Returns an empty object snapshot.
    pub fn empty() -> Self {
        Self::from_value(Value::Object(Map::new()))
    }

    /// Returns the raw JSON value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Deserializes the snapshot into a typed configuration.
    pub fn get<T: DeserializeOwned>(&self) -> YaguraResult<T> {
        T::deserialize(self.0.as_ref()).map_err(|e| YaguraError::InvalidConfig(e.to_string()))
    }

    /// Looks up a value by JSON pointer, e.g. `/retry/attempts`.
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        self.0.pointer(pointer)
    }

    /// Returns `true` for `null` and for empty objects.
    pub fn is_empty(&self) -> bool {
        match self.0.as_ref() {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Retry {
        attempts: u32,
        backoff_ms: u64,
    }

    #[test]
    fn test_snapshot_roundtrip_and_pointer() {
        let mut retry = Retry {
            attempts: 3,
            backoff_ms: 250,
        };
        let snapshot = ConfigSnapshot::new(&retry).unwrap();
        retry.attempts = 10;

        assert_eq!(snapshot.pointer("/attempts"), Some(&json!(3)));
        assert_eq!(
            snapshot.get::<Retry>().unwrap(),
            Retry {
                attempts: 3,
                backoff_ms: 250
            }
        );
    }

    #[test]
    fn test_type_mismatch_is_invalid_config() {
        let snapshot = ConfigSnapshot::from_value(json!({ "attempts": "many" }));
        assert!(matches!(
            snapshot.get::<Retry>(),
            Err(YaguraError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_empty() {
        assert!(ConfigSnapshot::default().is_empty());
        assert!(ConfigSnapshot::from_value(Value::Null).is_empty());
        assert!(!ConfigSnapshot::from_value(json!({ "a": 1 })).is_empty());
    }
}
