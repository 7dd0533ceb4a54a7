//! Event system for the Yagura runtime.
//!
//! This module provides the core event infrastructure:
//!
//! - [`Event`] - Base trait for all events
//! - [`EventHeader`] - Identity, payload and consumption state carried by every event
//! - [`EventExt`] - Consumption and diagnostics, available on every event
//! - [`BoxedEvent`] - Owning, type-erased container passed through the layer stack
//! - [`DataEvent`] - Payload-only event
//!
//! # Defining an Event
//!
//! ```rust,ignore
//! use yagura_core::{event_base, Event, EventHeader};
//!
//! struct ChatMessage {
//!     header: EventHeader,
//!     channel: String,
//! }
//!
//! impl Event for ChatMessage {
//!     event_base!(header);
//! }
//! ```

use std::any::Any;
use std::fmt;
use std::ops::{Deref, DerefMut};

use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::error::{BoxError, YaguraError, YaguraResult};
use super::guard::ConsumptionGuard;

// ============================================================================
// Event Header
// ============================================================================

/// State shared by every event: identifier, payload and consumption guard.
#[derive(Debug)]
pub struct EventHeader {
    id: String,
    /// Event payload. Layers may read and mutate it freely.
    pub data: Value,
    guard: ConsumptionGuard,
}

impl EventHeader {
    /// Creates a header with a freshly generated identifier.
    pub fn new(data: Value) -> Self {
        Self::with_id(data, generate_id())
    }

    /// Creates a header with a caller-supplied identifier.
    pub fn with_id(data: Value, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data,
            guard: ConsumptionGuard::new(),
        }
    }

    /// Returns the event identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the consumption guard.
    pub fn guard(&self) -> &ConsumptionGuard {
        &self.guard
    }
}

/// Generates a random event identifier (UUID v4 as 32 lowercase hex digits).
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

// ============================================================================
// Core Event Trait
// ============================================================================

/// The base trait for all events.
///
/// Implementors store an [`EventHeader`] and expose it through
/// [`header`](Event::header) / [`header_mut`](Event::header_mut). The
/// [`event_base!`](crate::event_base) macro generates the accessor methods.
#[async_trait]
pub trait Event: Any + Send + Sync {
    /// Returns the event header.
    fn header(&self) -> &EventHeader;

    /// Returns the event header mutably.
    fn header_mut(&mut self) -> &mut EventHeader;

    /// Returns a reference to self as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns a mutable reference to self as `Any` for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Returns the human-readable name of this event type.
    ///
    /// Defaults to the unqualified Rust type name.
    fn event_name(&self) -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Hook invoked exactly once, when the event is consumed.
    async fn on_consumed(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Generates the required accessor methods of [`Event`] for a struct that
/// stores its [`EventHeader`] in the named field.
#[macro_export]
macro_rules! event_base {
    ($field:ident) => {
        fn header(&self) -> &$crate::EventHeader {
            &self.$field
        }

        fn header_mut(&mut self) -> &mut $crate::EventHeader {
            &mut self.$field
        }

        fn as_any(&self) -> &dyn ::std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
            self
        }
    };
}

// ============================================================================
// Event Extension
// ============================================================================

/// Operations available on every event.
///
/// Blanket-implemented for all [`Event`] types, including `dyn Event`.
#[async_trait]
pub trait EventExt: Event {
    /// Returns the event identifier.
    fn id(&self) -> &str {
        self.header().id()
    }

    /// Returns the event payload.
    fn data(&self) -> &Value {
        &self.header().data
    }

    /// Returns the event payload mutably.
    fn data_mut(&mut self) -> &mut Value {
        &mut self.header_mut().data
    }

    /// Returns whether the event has been consumed.
    fn was_consumed(&self) -> bool {
        self.header().guard().was_handled()
    }

    /// Marks the event consumed and runs its [`on_consumed`](Event::on_consumed) hook.
    ///
    /// Fails with [`YaguraError::DoubleConsumption`] if the event was already
    /// consumed; the hook does not run again in that case.
    async fn consume(&mut self) -> YaguraResult<()> {
        if !self.header().guard().flag_handled() {
            return Err(YaguraError::DoubleConsumption {
                event: self.event_name(),
                id: self.id().to_string(),
            });
        }
        match self.on_consumed().await {
            Ok(()) => Ok(()),
            Err(source) => Err(YaguraError::ConsumeHook {
                event: self.event_name(),
                id: self.id().to_string(),
                source,
            }),
        }
    }

    /// SHA-256 of the serialized payload, as lowercase hex.
    ///
    /// Intended for logging and deduplication only.
    fn content_hash(&self) -> String {
        hex::encode(Sha256::digest(self.data().to_string().as_bytes()))
    }

    /// Renders the event as `<TypeName>#<id>` followed by its pretty-printed payload.
    fn describe(&self) -> String {
        let data = serde_json::to_string_pretty(self.data())
            .unwrap_or_else(|_| self.data().to_string());
        format!("{}#{}\n{}", self.event_name(), self.id(), data)
    }
}

impl<E: Event + ?Sized> EventExt for E {}

impl dyn Event {
    /// Returns whether the event is of type `E`.
    pub fn is<E: Event>(&self) -> bool {
        self.as_any().is::<E>()
    }

    /// Attempts to downcast to a concrete event type.
    pub fn downcast_ref<E: Event>(&self) -> Option<&E> {
        self.as_any().downcast_ref()
    }

    /// Attempts to downcast to a concrete event type mutably.
    pub fn downcast_mut<E: Event>(&mut self) -> Option<&mut E> {
        self.as_any_mut().downcast_mut()
    }
}

impl fmt::Display for dyn Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.event_name(), self.id())
    }
}

impl fmt::Debug for dyn Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.event_name())
            .field("id", &self.id())
            .field("consumed", &self.was_consumed())
            .field("data", self.data())
            .finish()
    }
}

// ============================================================================
// Boxed Event
// ============================================================================

/// An owning, type-erased event container.
///
/// `BoxedEvent` derefs to `dyn Event`, so header and [`EventExt`] methods are
/// available directly. Layers that want to substitute the event for the rest
/// of the chain assign a new one through `&mut BoxedEvent`.
pub struct BoxedEvent {
    inner: Box<dyn Event>,
}

impl BoxedEvent {
    /// Boxes a concrete event.
    pub fn new<E: Event>(event: E) -> Self {
        Self {
            inner: Box::new(event),
        }
    }

    /// Wraps an already boxed event.
    pub fn from_box(inner: Box<dyn Event>) -> Self {
        Self { inner }
    }

    /// Returns the inner box.
    pub fn into_inner(self) -> Box<dyn Event> {
        self.inner
    }

    /// Attempts to downcast to a concrete event type.
    pub fn downcast_ref<E: Event>(&self) -> Option<&E> {
        self.inner.as_any().downcast_ref()
    }

    /// Attempts to downcast to a concrete event type mutably.
    pub fn downcast_mut<E: Event>(&mut self) -> Option<&mut E> {
        self.inner.as_any_mut().downcast_mut()
    }

    /// Substitutes the contained event, returning the previous one.
    pub fn replace<E: Event>(&mut self, event: E) -> BoxedEvent {
        BoxedEvent {
            inner: std::mem::replace(&mut self.inner, Box::new(event)),
        }
    }
}

impl<E: Event> From<E> for BoxedEvent {
    fn from(event: E) -> Self {
        Self::new(event)
    }
}

impl Deref for BoxedEvent {
    type Target = dyn Event;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl DerefMut for BoxedEvent {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner.as_mut()
    }
}

impl fmt::Display for BoxedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.inner.as_ref(), f)
    }
}

impl fmt::Debug for BoxedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.inner.as_ref(), f)
    }
}

// ============================================================================
// Data Event
// ============================================================================

/// An event that carries nothing but its payload.
#[derive(Debug)]
pub struct DataEvent {
    header: EventHeader,
}

impl DataEvent {
    /// Creates a payload-only event with a generated identifier.
    pub fn new(data: Value) -> Self {
        Self {
            header: EventHeader::new(data),
        }
    }

    /// Creates a payload-only event with a caller-supplied identifier.
    pub fn with_id(data: Value, id: impl Into<String>) -> Self {
        Self {
            header: EventHeader::with_id(data, id),
        }
    }
}

impl Event for DataEvent {
    crate::event_base!(header);

    fn event_name(&self) -> &'static str {
        "Event"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;

    struct Tracked {
        header: EventHeader,
        hooks: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl Event for Tracked {
        crate::event_base!(header);

        async fn on_consumed(&mut self) -> Result<(), BoxError> {
            self.hooks.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err("hook failed".into());
            }
            Ok(())
        }
    }

    fn tracked(fail: bool) -> (Tracked, Arc<AtomicUsize>) {
        let hooks = Arc::new(AtomicUsize::new(0));
        let event = Tracked {
            header: EventHeader::new(json!({ "text": "hi" })),
            hooks: hooks.clone(),
            fail,
        };
        (event, hooks)
    }

    #[test]
    fn test_generated_id_format() {
        let id = generate_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(id, generate_id());
    }

    #[test]
    fn test_default_event_name_is_short_type_name() {
        let (event, _) = tracked(false);
        assert_eq!(event.event_name(), "Tracked");
        assert_eq!(DataEvent::new(Value::Null).event_name(), "Event");
    }

    #[tokio::test]
    async fn test_consume_is_once_only() {
        let (mut event, hooks) = tracked(false);
        assert!(!event.was_consumed());

        event.consume().await.unwrap();
        assert!(event.was_consumed());

        let err = event.consume().await.unwrap_err();
        assert!(matches!(err, YaguraError::DoubleConsumption { event: "Tracked", .. }));
        assert_eq!(hooks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failing_hook_still_marks_consumed() {
        let (mut event, hooks) = tracked(true);
        let err = event.consume().await.unwrap_err();
        assert!(matches!(err, YaguraError::ConsumeHook { .. }));
        assert!(event.was_consumed());
        assert_eq!(hooks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_consume_through_boxed_event() {
        let (event, hooks) = tracked(false);
        let mut boxed = BoxedEvent::new(event);
        boxed.consume().await.unwrap();
        assert!(boxed.was_consumed());
        assert_eq!(hooks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_content_hash_is_deterministic() {
        let a = DataEvent::new(json!({ "k": [1, 2, 3] }));
        let b = DataEvent::new(json!({ "k": [1, 2, 3] }));
        let c = DataEvent::new(json!({ "k": [3, 2, 1] }));
        assert_eq!(a.content_hash(), b.content_hash());
        assert_ne!(a.content_hash(), c.content_hash());
        assert_eq!(a.content_hash().len(), 64);
    }

    #[test]
    fn test_describe_and_display() {
        let event = DataEvent::with_id(json!({ "a": 1 }), "abc");
        assert_eq!(event.describe(), "Event#abc\n{\n  \"a\": 1\n}");

        let boxed = BoxedEvent::new(event);
        assert_eq!(boxed.to_string(), "Event#abc");
    }

    #[test]
    fn test_downcast_and_replace() {
        let (event, _) = tracked(false);
        let mut boxed = BoxedEvent::from(event);
        assert!(boxed.is::<Tracked>());
        assert!(boxed.downcast_ref::<DataEvent>().is_none());

        boxed.data_mut()["text"] = json!("changed");
        assert_eq!(
            boxed.downcast_ref::<Tracked>().unwrap().data()["text"],
            json!("changed")
        );

        let previous = boxed.replace(DataEvent::with_id(Value::Null, "new"));
        assert!(previous.is::<Tracked>());
        assert_eq!(boxed.id(), "new");
    }
}
