//! Runtime builder and the startup sequence.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use super::Yagura;
use super::lifecycle::{LifecycleState, RunMode, YaguraOptions};
use crate::foundation::app_event::{AppEvent, AppEventKind};
use crate::foundation::error::{YaguraError, YaguraResult};
use crate::foundation::event::BoxedEvent;
use crate::framework::layer::{BoxedLayer, Layer};
use crate::framework::service::Service;
use crate::services::error_handler::{DefaultErrorHandler, ErrorHandler};
use crate::services::logger::{DefaultLogger, Logger};
use crate::version::{YAGURA_API_VERSION, format_version, is_compatible};

/// A service waiting to be registered during startup.
struct PendingService {
    name: String,
    register: Box<dyn FnOnce(Yagura) -> BoxFuture<'static, YaguraResult<()>> + Send>,
}

impl PendingService {
    fn new<T: ?Sized + Service>(service: Arc<T>) -> Self {
        Self {
            name: service.name().to_string(),
            register: Box::new(move |yagura: Yagura| {
                async move { yagura.register_service(service).await.map(|_| ()) }.boxed()
            }),
        }
    }
}

/// Builder for a [`Yagura`] runtime.
///
/// # Example
///
/// ```rust,ignore
/// let yagura = Yagura::builder()
///     .layer(LoggingLayer::new())
///     .layer(Echo::new())
///     .layer(StdinTransport::new())
///     .service::<dyn Storage>(Arc::new(MemoryStorage::new()))
///     .mode(RunMode::Production)
///     .start()
///     .await?;
/// ```
pub struct YaguraBuilder {
    layers: Vec<BoxedLayer>,
    services: Vec<PendingService>,
    options: YaguraOptions,
}

impl YaguraBuilder {
    /// Creates a builder with default options.
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            services: Vec::new(),
            options: YaguraOptions::default(),
        }
    }

    /// Appends a layer below the previously added ones.
    pub fn layer<L: Layer>(mut self, layer: L) -> Self {
        self.layers.push(Arc::new(layer));
        self
    }

    /// Appends an already shared layer.
    pub fn shared_layer(mut self, layer: BoxedLayer) -> Self {
        self.layers.push(layer);
        self
    }

    /// Appends several layers in order.
    pub fn layers(mut self, layers: impl IntoIterator<Item = BoxedLayer>) -> Self {
        self.layers.extend(layers);
        self
    }

    /// Adds a service to register during startup, after the built-in ones.
    pub fn service<T: ?Sized + Service>(mut self, service: Arc<T>) -> Self {
        self.services.push(PendingService::new(service));
        self
    }

    /// Sets the run mode.
    pub fn mode(mut self, mode: RunMode) -> Self {
        self.options.mode = mode;
        self
    }

    /// Enables or disables the process-wide hooks.
    pub fn process_hooks(mut self, enabled: bool) -> Self {
        self.options.process_hooks = enabled;
        self
    }

    /// Replaces all options.
    pub fn options(mut self, options: YaguraOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the runtime and runs the startup sequence.
    ///
    /// # Errors
    ///
    /// - [`YaguraError::VersionMismatch`] before anything is initialized.
    /// - [`YaguraError::AlreadyMounted`] if a layer was mounted before.
    /// - [`YaguraError::Startup`] if any error was reported during startup.
    pub async fn start(self) -> YaguraResult<Yagura> {
        for layer in &self.layers {
            if let Some(required) = layer.api_version()
                && !is_compatible(required)
            {
                return Err(YaguraError::VersionMismatch {
                    layer: layer.name().to_string(),
                    required: format_version(required),
                    host: format_version(YAGURA_API_VERSION),
                });
            }
        }

        let yagura = Yagura::new(self.layers, self.options);
        yagura.initialize(self.services).await?;
        Ok(yagura)
    }
}

impl Default for YaguraBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Yagura {
    async fn initialize(&self, services: Vec<PendingService>) -> YaguraResult<()> {
        self.set_state(LifecycleState::ServicesInit);
        self.register_service::<dyn Logger>(Arc::new(DefaultLogger::new()))
            .await?;
        self.register_service::<dyn ErrorHandler>(Arc::new(DefaultErrorHandler::new()))
            .await?;

        for pending in services {
            tracing::debug!(service = %pending.name, "Registering service");
            if let Err(e) = (pending.register)(self.clone()).await {
                self.handle_error(e).await;
            }
        }
        self.take_fatal()?;

        self.set_state(LifecycleState::LayersInit);
        self.initialize_stack().await?;
        self.take_fatal()?;

        {
            // Holding the queue lock keeps a concurrent dispatch from queueing
            // an event after the drain below has started.
            let _queue = self.inner.queue.lock();
            self.set_state(LifecycleState::Initialized);
        }
        self.log().info("Initialized", None);

        if self.inner.options.installs_hooks() {
            super::hooks::install(self);
        }

        self.dispatch(BoxedEvent::new(AppEvent::new(AppEventKind::Start)))
            .await;
        self.drain_queue().await;
        self.transition(&[LifecycleState::Initialized], LifecycleState::Running);
        Ok(())
    }

    async fn initialize_stack(&self) -> YaguraResult<()> {
        for layer in self.inner.stack.iter().rev() {
            layer.base().mount().attach(self, "layer", layer.name())?;
            if let Err(source) = layer.initialize().await {
                self.log()
                    .error(&format!("Failed to initialize layer: {}", layer.name()), None);
                self.handle_error(YaguraError::LayerInit {
                    name: layer.name().to_string(),
                    source,
                })
                .await;
                break;
            }
            tracing::debug!(layer = layer.name(), "Layer initialized");
        }
        Ok(())
    }

    async fn drain_queue(&self) {
        loop {
            let next = self.inner.queue.lock().pop_front();
            let Some(event) = next else {
                break;
            };
            self.dispatch(event).await;
        }
    }
}
