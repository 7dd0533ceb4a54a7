//! Event dispatch through the layer stack.

use std::panic::AssertUnwindSafe;
use std::time::Instant;

use futures::FutureExt;
use tracing::Instrument;

use super::Yagura;
use super::hooks;
use crate::foundation::error::{BoxError, YaguraError};
use crate::foundation::event::{BoxedEvent, EventExt};
use crate::framework::layer::{BoxedLayer, Flow};

impl Yagura {
    /// Dispatches an event through the layer stack, top to bottom.
    ///
    /// Before initialization the event is queued and replayed, in arrival
    /// order, once startup completes; `None` is returned in that case.
    ///
    /// An event that arrives already consumed is dropped in production mode
    /// (returning `None`) and recycled otherwise.
    ///
    /// Each layer decides how the chain continues:
    ///
    /// - `Ok(Flow::Continue)` passes the event on, unless the layer consumed it.
    /// - `Ok(Flow::Stop)` ends the chain; the event is consumed if it was not.
    /// - `Err(_)` or a panic ends the chain and goes to the layer's
    ///   [`handle_error`](crate::Layer::handle_error).
    ///
    /// An event that reaches the end of the chain unconsumed is consumed by
    /// the runtime. The event is handed back afterwards.
    ///
    /// # Cancellation
    ///
    /// Not cancellation safe. Dropping the future part way through the stack
    /// drops the event without consuming it. To bound the wait for a result,
    /// spawn the dispatch and time out the join handle instead.
    pub async fn dispatch(&self, event: BoxedEvent) -> Option<BoxedEvent> {
        let event = {
            let mut queue = self.inner.queue.lock();
            if self.is_initialized() {
                event
            } else {
                let label = event.to_string();
                queue.push_back(event);
                drop(queue);
                self.log().warn(
                    &format!("[EVENT] Dispatch called before initialization, queued {label} for later"),
                    None,
                );
                return None;
            }
        };

        let span = tracing::debug_span!("dispatch", event = %event.event_name(), id = %event.id());
        self.run_stack(event).instrument(span).await
    }

    async fn run_stack(&self, mut event: BoxedEvent) -> Option<BoxedEvent> {
        let log = self.log();
        let started = Instant::now();
        log.debug(&format!("[EVENT] Dispatched event {event}"), Some(&*event));

        if event.was_consumed() {
            log.warn(
                "[EVENT] An already handled event has been sent for handling again, this could cause an event handling loop",
                Some(&*event),
            );
            if self.mode().is_production() {
                log.warn("[EVENT] Dropping event", Some(&*event));
                return None;
            }
            log.warn("[EVENT] Development mode, recycling event", Some(&*event));
            event.header().guard().recycle();
        }

        for layer in self.layers() {
            log.verbose(
                &format!("[EVENT] Handling event {event} @ {}", layer.name()),
                Some(&*event),
            );

            match self.run_layer(layer, &mut event).await {
                Ok(Flow::Stop) => {
                    if !event.was_consumed() {
                        log.verbose(
                            &format!("[EVENT] Event implicitly consumed @ {}", layer.name()),
                            Some(&*event),
                        );
                        if let Err(e) = event.consume().await {
                            self.recover(layer, Box::new(e)).await;
                        }
                    }
                    break;
                }
                Ok(Flow::Continue) if event.was_consumed() => {
                    log.verbose(
                        &format!("[EVENT] Event explicitly consumed @ {}", layer.name()),
                        Some(&*event),
                    );
                    break;
                }
                Ok(Flow::Continue) => {}
                Err(error) => {
                    log.verbose(
                        &format!("[EVENT] Event handling errored @ {}", layer.name()),
                        Some(&*event),
                    );
                    self.recover(layer, error).await;
                    break;
                }
            }
        }

        if !event.was_consumed() {
            log.verbose("[EVENT] Event reached the end of the stack", Some(&*event));
            if let Err(e) = event.consume().await {
                self.handle_error(e).await;
            }
        }

        log.debug(
            &format!(
                "[EVENT] Consumed event {event} ({}ms)",
                started.elapsed().as_millis()
            ),
            Some(&*event),
        );
        Some(event)
    }

    /// Runs one layer's handler, converting a panic into an error.
    async fn run_layer(
        &self,
        layer: &BoxedLayer,
        event: &mut BoxedEvent,
    ) -> Result<Flow, BoxError> {
        let handled = AssertUnwindSafe(layer.handle_event(event)).catch_unwind();
        match hooks::within_layer(handled).await {
            Ok(result) => result,
            Err(payload) => Err(Box::new(YaguraError::layer_panicked(
                layer.name(),
                payload.as_ref(),
            ))),
        }
    }

    /// Passes an error to the layer's handler; whatever the layer cannot
    /// handle goes to the runtime.
    async fn recover(&self, layer: &BoxedLayer, error: BoxError) {
        let handled = AssertUnwindSafe(layer.handle_error(error)).catch_unwind();
        match hooks::within_layer(handled).await {
            Ok(Ok(())) => {}
            Ok(Err(unhandled)) => self.handle_error(unhandled).await,
            Err(payload) => {
                self.handle_error(YaguraError::layer_panicked(layer.name(), payload.as_ref()))
                    .await
            }
        }
    }
}
