use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use yagura_core::{
    AppEvent, BoxError, BoxedEvent, DataEvent, ErrorHandler, ErrorReport, EventExt, Flow, Layer,
    LayerBase, Logger, RunMode, Service, ServiceBase, Yagura, async_trait,
};

struct Passthrough {
    base: LayerBase,
    seen: AtomicUsize,
}

#[async_trait]
impl Layer for Passthrough {
    fn base(&self) -> &LayerBase {
        &self.base
    }

    async fn handle_event(&self, event: &mut BoxedEvent) -> Result<Flow, BoxError> {
        self.seen.fetch_add(1, Ordering::SeqCst);
        if let Some(yagura) = self.base.yagura()
            && let Some(logger) = yagura.get_service::<dyn Logger>("Logger", None)
        {
            logger.debug(&event.describe(), Some(&**event));
        }
        Ok(Flow::Continue)
    }
}

struct Echo {
    base: LayerBase,
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
        Ok(Flow::Stop)
    }
}

struct Counting {
    base: ServiceBase,
    errors: AtomicUsize,
}

impl Service for Counting {
    fn base(&self) -> &ServiceBase {
        &self.base
    }
}

#[async_trait]
impl ErrorHandler for Counting {
    async fn handle(&self, _report: &ErrorReport) -> Result<(), BoxError> {
        self.errors.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_echo_behind_logging_passthrough() {
    let passthrough = Arc::new(Passthrough {
        base: LayerBase::new("Logger"),
        seen: AtomicUsize::new(0),
    });
    let errors = Arc::new(Counting {
        base: ServiceBase::new("ErrorHandler", "Counting"),
        errors: AtomicUsize::new(0),
    });

    let yagura = assert_ok!(
        Yagura::builder()
            .shared_layer(passthrough.clone())
            .layer(Echo {
                base: LayerBase::new("Echo"),
            })
            .service::<dyn ErrorHandler>(errors.clone())
            .mode(RunMode::Test)
            .start()
            .await
    );

    let event = yagura
        .dispatch(BoxedEvent::new(DataEvent::new(json!({}))))
        .await
        .expect("event is handed back");

    assert!(event.was_consumed());
    assert_eq!(event.data()["echoed"], json!(true));
    assert_eq!(errors.errors.load(Ordering::SeqCst), 0);
    // Start event plus the dispatched one.
    assert_eq!(passthrough.seen.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_second_consume_fails() {
    let mut event = DataEvent::new(json!({ "n": 1 }));
    assert!(!event.was_consumed());
    assert_ok!(event.consume().await);
    assert!(event.was_consumed());
    assert_err!(event.consume().await);
}
