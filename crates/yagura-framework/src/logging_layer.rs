//! A pass-through layer that logs every event.

use std::sync::OnceLock;

use async_trait::async_trait;
use yagura_core::{
    BoxError, BoxedEvent, EventExt, Flow, LOGGER, Layer, LayerBase, Logger, ServiceProxy,
};

/// Logs each event through the active `Logger` service at debug level and
/// lets it continue.
///
/// Place it at the top of the stack to see everything that enters.
#[derive(Debug)]
pub struct LoggingLayer {
    base: LayerBase,
    logger: OnceLock<ServiceProxy<dyn Logger>>,
}

impl LoggingLayer {
    pub fn new() -> Self {
        Self {
            base: LayerBase::new("Logger"),
            logger: OnceLock::new(),
        }
    }
}

impl Default for LoggingLayer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Layer for LoggingLayer {
    fn base(&self) -> &LayerBase {
        &self.base
    }

    async fn initialize(&self) -> Result<(), BoxError> {
        let proxy = self
            .base
            .yagura()
            .and_then(|yagura| yagura.get_service_proxy::<dyn Logger>(LOGGER, None));
        match proxy {
            Some(proxy) => {
                let _ = self.logger.set(proxy);
            }
            None => tracing::warn!("No Logger service available, events will be traced directly"),
        }
        Ok(())
    }

    async fn handle_event(&self, event: &mut BoxedEvent) -> Result<Flow, BoxError> {
        let message = event.describe();
        let logged = self
            .logger
            .get()
            .and_then(|proxy| proxy.with(|logger| logger.debug(&message, Some(&**event))));
        if logged.is_none() {
            let label = event.to_string();
            tracing::debug!(target: "yagura", event = %label, "{message}");
        }
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use serde_json::json;
    use yagura_core::{AppEvent, DataEvent, Event, RunMode, Service, ServiceBase, Yagura};

    use super::*;

    struct Capture {
        base: ServiceBase,
        lines: Mutex<Vec<String>>,
    }

    impl Service for Capture {
        fn base(&self) -> &ServiceBase {
            &self.base
        }
    }

    impl Logger for Capture {
        fn error(&self, _message: &str, _event: Option<&dyn Event>) {}
        fn warn(&self, _message: &str, _event: Option<&dyn Event>) {}
        fn info(&self, _message: &str, _event: Option<&dyn Event>) {}
        fn verbose(&self, _message: &str, _event: Option<&dyn Event>) {}

        fn debug(&self, message: &str, event: Option<&dyn Event>) {
            if event.is_some() {
                self.lines.lock().push(message.to_string());
            }
        }
    }

    struct Echo {
        base: LayerBase,
        echoed: AtomicUsize,
    }

    #[async_trait]
    impl Layer for Echo {
        fn base(&self) -> &LayerBase {
            &self.base
        }

        async fn handle_event(&self, event: &mut BoxedEvent) -> Result<Flow, BoxError> {
            if event.is::<AppEvent>() {
                return Ok(Flow::Continue);
            }
            event.data_mut()["echoed"] = json!(true);
            self.echoed.fetch_add(1, Ordering::SeqCst);
            Ok(Flow::Stop)
        }
    }

    #[tokio::test]
    async fn test_logs_and_passes_through() {
        let capture = Arc::new(Capture {
            base: ServiceBase::new(LOGGER, "Capture"),
            lines: Mutex::new(Vec::new()),
        });
        let echo = Arc::new(Echo {
            base: LayerBase::new("Echo"),
            echoed: AtomicUsize::new(0),
        });

        let yagura = Yagura::builder()
            .layer(LoggingLayer::new())
            .shared_layer(echo.clone())
            .service::<dyn Logger>(capture.clone())
            .mode(RunMode::Test)
            .start()
            .await
            .unwrap();

        let event = yagura
            .dispatch(BoxedEvent::new(DataEvent::with_id(json!({ "text": "hi" }), "abc")))
            .await
            .unwrap();

        assert!(event.was_consumed());
        assert_eq!(event.data()["echoed"], json!(true));
        assert_eq!(echo.echoed.load(Ordering::SeqCst), 1);

        let lines = capture.lines.lock();
        assert!(lines.iter().any(|line| line.starts_with("Event#abc\n")));
        assert!(lines.iter().any(|line| line.starts_with("AppEvent#")));
    }

    #[tokio::test]
    async fn test_unmounted_layer_continues() {
        let layer = LoggingLayer::new();
        let mut event = BoxedEvent::new(DataEvent::new(json!({})));
        assert_eq!(layer.handle_event(&mut event).await.unwrap(), Flow::Continue);
        assert!(!event.was_consumed());
    }
}
