//! The Yagura runtime.
//!
//! [`Yagura`] owns the layer stack and the service registry, drives the
//! startup sequence and dispatches events through the stack. It is a cheap
//! clonable handle; layers and services hold a [`WeakYagura`] through their
//! mount point.
//!
//! # Startup Sequence
//!
//! 1. Layer API versions are checked.
//! 2. The built-in `Logger` and `ErrorHandler` services are registered,
//!    followed by user services in declaration order.
//! 3. Layers are mounted and initialized bottom-up (last declared first).
//! 4. The runtime becomes [`Initialized`](LifecycleState::Initialized), the
//!    process hooks are installed and an [`AppEvent`] `Start` is dispatched.
//! 5. Events dispatched during startup are replayed in arrival order.
//!
//! An error reported before step 4 completes is printed to stderr and makes
//! startup fail with [`YaguraError::Startup`].

mod builder;
mod dispatch;
pub(crate) mod hooks;
pub mod lifecycle;

use std::collections::VecDeque;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

pub use builder::YaguraBuilder;
use lifecycle::{LifecycleState, RunMode, YaguraOptions};

use crate::foundation::app_event::{AppEvent, AppEventKind};
use crate::foundation::error::{ErrorReport, YaguraError, YaguraResult, panic_message};
use crate::foundation::event::BoxedEvent;
use crate::framework::layer::BoxedLayer;
use crate::framework::proxy::ServiceProxy;
use crate::framework::registry::ServiceRegistry;
use crate::framework::service::Service;
use crate::services::error_handler::{ERROR_HANDLER, ErrorHandler};
use crate::services::logger::{LOGGER, Logger, RuntimeLog};

// =============================================================================
// Runtime Handle
// =============================================================================

/// Handle to a running layered event runtime.
#[derive(Clone)]
pub struct Yagura {
    inner: Arc<YaguraInner>,
}

/// A non-owning handle to a [`Yagura`] runtime.
#[derive(Clone, Default)]
pub struct WeakYagura {
    inner: Weak<YaguraInner>,
}

struct YaguraInner {
    options: YaguraOptions,
    stack: Vec<BoxedLayer>,
    services: Arc<ServiceRegistry>,
    state: watch::Sender<LifecycleState>,
    queue: Mutex<VecDeque<BoxedEvent>>,
    fatal: Mutex<Option<ErrorReport>>,
    shutdown: CancellationToken,
}

impl Drop for YaguraInner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl Yagura {
    /// Creates a runtime builder.
    pub fn builder() -> YaguraBuilder {
        YaguraBuilder::new()
    }

    /// Builds and starts a runtime with the given layers and default options.
    pub async fn start(layers: impl IntoIterator<Item = BoxedLayer>) -> YaguraResult<Self> {
        YaguraBuilder::new().layers(layers).start().await
    }

    pub(crate) fn new(stack: Vec<BoxedLayer>, options: YaguraOptions) -> Self {
        Self {
            inner: Arc::new(YaguraInner {
                options,
                stack,
                services: Arc::new(ServiceRegistry::new()),
                state: watch::Sender::new(LifecycleState::Constructed),
                queue: Mutex::new(VecDeque::new()),
                fatal: Mutex::new(None),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Creates a non-owning handle.
    pub fn downgrade(&self) -> WeakYagura {
        WeakYagura {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Returns the runtime options.
    pub fn options(&self) -> YaguraOptions {
        self.inner.options
    }

    /// Returns the run mode.
    pub fn mode(&self) -> RunMode {
        self.inner.options.mode
    }

    /// Returns the layer stack, top first.
    pub fn layers(&self) -> &[BoxedLayer] {
        &self.inner.stack
    }

    // ─── Lifecycle ───────────────────────────────────────────────

    /// Returns the current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        *self.inner.state.borrow()
    }

    /// Returns whether initialization has completed.
    pub fn is_initialized(&self) -> bool {
        self.state().accepts_events()
    }

    /// Subscribes to lifecycle state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<LifecycleState> {
        self.inner.state.subscribe()
    }

    /// Waits until the runtime has stopped.
    pub async fn wait_for_stop(&self) {
        let mut state = self.inner.state.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = state.wait_for(|s| *s == LifecycleState::Stopped).await;
    }

    /// Returns a token that is cancelled when shutdown begins.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.inner.shutdown.clone()
    }

    /// Returns the number of events waiting for initialization.
    pub fn queued_events(&self) -> usize {
        self.inner.queue.lock().len()
    }

    fn set_state(&self, state: LifecycleState) {
        self.inner.state.send_replace(state);
    }

    /// Moves from `from` to `to`, returning `false` if the state was not `from`.
    fn transition(&self, from: &[LifecycleState], to: LifecycleState) -> bool {
        self.inner.state.send_if_modified(|state| {
            if from.contains(state) {
                *state = to;
                true
            } else {
                false
            }
        })
    }

    /// Begins shutdown: dispatches an [`AppEvent`] `Shutdown` and moves to
    /// [`Stopped`](LifecycleState::Stopped).
    ///
    /// Only the first call has any effect.
    pub async fn shutdown(&self) {
        let began = self.transition(
            &[LifecycleState::Initialized, LifecycleState::Running],
            LifecycleState::ShuttingDown,
        );
        if !began {
            return;
        }

        self.inner.shutdown.cancel();
        self.log().info("Shutting down...", None);
        self.dispatch(BoxedEvent::new(AppEvent::new(AppEventKind::Shutdown)))
            .await;
        self.set_state(LifecycleState::Stopped);
        self.log().info("Stopped", None);
    }

    // ─── Services ────────────────────────────────────────────────

    /// Registers a service.
    ///
    /// The service is mounted and initialized before it becomes visible.
    /// A new vendor is promoted to the active implementation of its name.
    ///
    /// # Errors
    ///
    /// - [`YaguraError::DuplicateVendor`] if the (name, vendor) pair exists;
    ///   the stored instance is left untouched.
    /// - [`YaguraError::AlreadyMounted`] if the instance was mounted before.
    /// - [`YaguraError::ServiceInit`] if `initialize` fails; nothing is stored.
    pub async fn register_service<T>(&self, service: Arc<T>) -> YaguraResult<Arc<T>>
    where
        T: ?Sized + Service,
    {
        let name = service.name().to_string();
        let vendor = service.vendor().to_string();

        if self.inner.services.contains(&name, &vendor) {
            return Err(YaguraError::DuplicateVendor { name, vendor });
        }

        service.base().mount().attach(self, "service", &name)?;
        if let Err(source) = service.initialize().await {
            return Err(YaguraError::ServiceInit {
                name,
                vendor,
                source,
            });
        }

        self.inner
            .services
            .insert::<T>(&name, &vendor, service.clone())?;
        self.log()
            .debug(&format!("Registered service {name} ({vendor})"), None);
        Ok(service)
    }

    /// Resolves a service by name.
    ///
    /// Without a vendor the active implementation is returned. With a vendor,
    /// only that vendor's instance is returned. `T` must match the type the
    /// service was registered as.
    pub fn get_service<T>(&self, name: &str, vendor: Option<&str>) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.inner.services.get::<T>(name, vendor)
    }

    /// Returns a proxy that re-resolves the service on every access.
    ///
    /// Returns `None` if the service does not resolve right now.
    pub fn get_service_proxy<T>(&self, name: &str, vendor: Option<&str>) -> Option<ServiceProxy<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.inner.services.get::<T>(name, vendor)?;
        Some(ServiceProxy::new(&self.inner.services, name, vendor))
    }

    /// Returns the vendors registered under `name`, sorted.
    pub fn service_vendors(&self, name: &str) -> Vec<String> {
        self.inner.services.vendors(name)
    }

    /// Returns the active vendor of `name`.
    pub fn active_vendor(&self, name: &str) -> Option<String> {
        self.inner.services.active_vendor(name)
    }

    /// Returns the names of all registered services, sorted.
    pub fn service_names(&self) -> Vec<String> {
        self.inner.services.names()
    }

    pub(crate) fn log(&self) -> RuntimeLog {
        RuntimeLog::new(self.get_service::<dyn Logger>(LOGGER, None))
    }

    // ─── Errors ──────────────────────────────────────────────────

    /// Reports an error to the runtime.
    ///
    /// Before initialization completes the error is printed to stderr and
    /// startup will fail. Afterwards it is passed to the active
    /// `ErrorHandler`. A report that was already handled is only logged as a
    /// warning. Failures of the handler itself are printed to stderr; this
    /// method never fails.
    pub async fn handle_error(&self, error: impl Into<ErrorReport>) {
        let report = error.into();

        if !self.is_initialized() {
            eprintln!(
                "Error occurred during initialization\n{}",
                report.display_chain()
            );
            self.inner.fatal.lock().get_or_insert(report);
            return;
        }

        if !report.guard().flag_handled() {
            self.log().warn(
                &format!(
                    "An already handled error has been sent for handling again, this could cause an error handling loop\n{}",
                    report.display_chain()
                ),
                None,
            );
            return;
        }

        let Some(handler) = self.get_service::<dyn ErrorHandler>(ERROR_HANDLER, None) else {
            eprintln!(
                "FAILED TO HANDLE ERROR\nno error handler is registered\n{}",
                report.display_chain()
            );
            return;
        };

        let handled = AssertUnwindSafe(handler.handle(&report)).catch_unwind();
        match hooks::within_error_handler(handled).await {
            Ok(Ok(())) => {}
            Ok(Err(failure)) => eprintln!(
                "FAILED TO HANDLE ERROR\n{failure}\nwhile handling\n{}",
                report.display_chain()
            ),
            Err(payload) => eprintln!(
                "FAILED TO HANDLE ERROR\nerror handler panicked: {}\nwhile handling\n{}",
                panic_message(payload.as_ref()),
                report.display_chain()
            ),
        }
    }

    /// Takes the first error reported before initialization, if any.
    fn take_fatal(&self) -> YaguraResult<()> {
        match self.inner.fatal.lock().take() {
            Some(report) => Err(YaguraError::Startup(report)),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Yagura {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Yagura")
            .field("state", &self.state())
            .field("mode", &self.inner.options.mode)
            .field("layers", &self.inner.stack.len())
            .field("services", &self.inner.services.names())
            .finish()
    }
}

impl WeakYagura {
    /// Upgrades to a strong handle if the runtime is still alive.
    pub fn upgrade(&self) -> Option<Yagura> {
        self.inner.upgrade().map(|inner| Yagura { inner })
    }
}

impl fmt::Debug for WeakYagura {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakYagura")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}
