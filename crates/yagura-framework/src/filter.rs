//! Event filtering for layers.
//!
//! [`Filtered`] wraps a layer and only forwards events accepted by an
//! [`EventFilter`]. Rejected events continue down the stack untouched, as if
//! the wrapped layer were not there.
//!
//! # Example
//!
//! ```rust,ignore
//! use yagura_framework::{EventFilter, LayerExt};
//!
//! // Only HTTP requests reach the router.
//! let router = HttpRouter::new().filtered(EventFilter::types().allow::<HttpRequest>());
//!
//! // Or with an arbitrary predicate.
//! let audit = Audit::new().filtered(EventFilter::predicate(|e| e.data()["user"].is_string()));
//! ```
//!
//! [`EventFilter`] also implements [`tower_layer::Layer`], so it composes with
//! other wrappers through `tower_layer::Stack`.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use yagura_core::{BoxError, BoxedEvent, Event, Flow, Layer, LayerBase};

type Predicate = Arc<dyn Fn(&dyn Event) -> bool + Send + Sync>;

/// Decides which events a [`Filtered`] layer sees.
#[derive(Clone)]
pub enum EventFilter {
    /// Accepts events whose concrete type is in the list.
    Types(Vec<(TypeId, &'static str)>),
    /// Accepts events for which the predicate returns `true`.
    Predicate(Predicate),
}

impl EventFilter {
    /// Creates an empty type allow-list.
    pub fn types() -> Self {
        Self::Types(Vec::new())
    }

    /// Creates a predicate filter.
    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&dyn Event) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(predicate))
    }

    /// Additionally accepts events of type `E`.
    pub fn allow<E: Event>(self) -> Self {
        let entry = (TypeId::of::<E>(), std::any::type_name::<E>());
        match self {
            Self::Types(mut types) => {
                types.push(entry);
                Self::Types(types)
            }
            Self::Predicate(predicate) => Self::Predicate(Arc::new(move |event: &dyn Event| {
                Any::type_id(event.as_any()) == entry.0 || predicate(event)
            })),
        }
    }

    /// Returns whether `event` passes the filter.
    pub fn matches(&self, event: &dyn Event) -> bool {
        match self {
            Self::Types(types) => {
                let id = Any::type_id(event.as_any());
                types.iter().any(|(allowed, _)| *allowed == id)
            }
            Self::Predicate(predicate) => predicate(event),
        }
    }
}

impl fmt::Debug for EventFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Types(types) => f
                .debug_tuple("Types")
                .field(&types.iter().map(|(_, name)| *name).collect::<Vec<_>>())
                .finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl<L> tower_layer::Layer<L> for EventFilter {
    type Service = Filtered<L>;

    fn layer(&self, inner: L) -> Self::Service {
        Filtered::new(inner, self.clone())
    }
}

/// A layer that only sees events accepted by its filter.
#[derive(Debug)]
pub struct Filtered<L> {
    inner: L,
    filter: EventFilter,
}

impl<L> Filtered<L> {
    /// Wraps `inner` with `filter`.
    pub fn new(inner: L, filter: EventFilter) -> Self {
        Self { inner, filter }
    }

    /// Returns the wrapped layer.
    pub fn inner(&self) -> &L {
        &self.inner
    }

    /// Returns the filter.
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

#[async_trait]
impl<L: Layer> Layer for Filtered<L> {
    fn base(&self) -> &LayerBase {
        self.inner.base()
    }

    fn api_version(&self) -> Option<u32> {
        self.inner.api_version()
    }

    async fn initialize(&self) -> Result<(), BoxError> {
        self.inner.initialize().await
    }

    async fn handle_event(&self, event: &mut BoxedEvent) -> Result<Flow, BoxError> {
        if !self.filter.matches(&**event) {
            return Ok(Flow::Continue);
        }
        self.inner.handle_event(event).await
    }

    async fn handle_error(&self, error: BoxError) -> Result<(), BoxError> {
        self.inner.handle_error(error).await
    }
}

/// Wraps `layer` so that it only sees events accepted by `filter`.
pub fn filtered<L: Layer>(layer: L, filter: EventFilter) -> Filtered<L> {
    Filtered::new(layer, filter)
}

/// Extension methods for layers.
pub trait LayerExt: Layer + Sized {
    /// Restricts the layer to events accepted by `filter`.
    fn filtered(self, filter: EventFilter) -> Filtered<Self> {
        Filtered::new(self, filter)
    }
}

impl<L: Layer> LayerExt for L {}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;
    use tower_layer::Layer as _;
    use yagura_core::{AppEvent, AppEventKind, DataEvent, EventExt, EventHeader, event_base};

    use super::*;

    struct Ping {
        header: EventHeader,
    }

    impl Event for Ping {
        event_base!(header);
    }

    struct Counter {
        base: LayerBase,
        hits: AtomicUsize,
    }

    impl Counter {
        fn new() -> Self {
            Self {
                base: LayerBase::new("Counter"),
                hits: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Layer for Counter {
        fn base(&self) -> &LayerBase {
            &self.base
        }

        async fn handle_event(&self, _event: &mut BoxedEvent) -> Result<Flow, BoxError> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            Ok(Flow::Stop)
        }
    }

    fn ping() -> BoxedEvent {
        BoxedEvent::new(Ping {
            header: EventHeader::new(json!({})),
        })
    }

    #[test]
    fn test_type_filter() {
        let filter = EventFilter::types().allow::<Ping>();
        assert!(filter.matches(&*ping()));
        assert!(!filter.matches(&DataEvent::new(json!({}))));
    }

    #[test]
    fn test_predicate_filter_with_allow() {
        let filter = EventFilter::predicate(|e| e.data()["vip"] == json!(true)).allow::<AppEvent>();
        assert!(filter.matches(&DataEvent::new(json!({ "vip": true }))));
        assert!(!filter.matches(&DataEvent::new(json!({ "vip": false }))));
        assert!(filter.matches(&AppEvent::new(AppEventKind::Start)));
    }

    #[tokio::test]
    async fn test_rejected_events_pass_through() {
        let layer = Counter::new().filtered(EventFilter::types().allow::<Ping>());

        let mut other = BoxedEvent::new(DataEvent::new(json!({})));
        assert_eq!(layer.handle_event(&mut other).await.unwrap(), Flow::Continue);
        assert_eq!(layer.inner().hits.load(Ordering::SeqCst), 0);

        let mut accepted = ping();
        assert_eq!(layer.handle_event(&mut accepted).await.unwrap(), Flow::Stop);
        assert_eq!(layer.inner().hits.load(Ordering::SeqCst), 1);
        assert_eq!(layer.name(), "Counter");
    }

    #[test]
    fn test_tower_layer_wraps() {
        let filter = EventFilter::types().allow::<Ping>();
        let layer = filter.layer(Counter::new());
        assert!(matches!(layer.filter(), EventFilter::Types(types) if types.len() == 1));
        assert_eq!(
            format!("{:?}", layer.filter()),
            format!("Types([\"{}\"])", std::any::type_name::<Ping>())
        );
    }
}
