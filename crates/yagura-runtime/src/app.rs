//! Application hosting.
//!
//! [`YaguraApp`] ties configuration, logging and the core runtime together:
//! it loads and validates a [`YaguraConfig`], installs the tracing subscriber,
//! hands component sections to the code constructing layers and services, and
//! finally starts a [`Yagura`] and keeps it running until shutdown.
//!
//! ```rust,ignore
//! use yagura_runtime::YaguraApp;
//!
//! let app = YaguraApp::new();
//! let echo = Echo::new(app.layer_config("Echo")?);
//! app.layer(LoggingLayer::new()).layer(echo).run().await?;
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};
use yagura_core::{BoxedLayer, Layer, Service, Yagura, YaguraBuilder, shutdown_signal};

use crate::config::{ConfigError, ConfigLoader, ConfigResult, YaguraConfig, validate_config};
use crate::error::RuntimeResult;
use crate::logging;

/// A configured Yagura application.
pub struct YaguraApp {
    config: YaguraConfig,
    runtime: YaguraBuilder,
}

impl YaguraApp {
    /// Creates an application from the configuration found in the current
    /// directory and the environment.
    ///
    /// If the configuration cannot be loaded or is invalid, a warning is
    /// printed and defaults are used.
    pub fn new() -> Self {
        let config = ConfigLoader::new()
            .with_current_dir()
            .load()
            .and_then(|config| validate_config(&config).map(|()| config))
            .unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config ({e}), using defaults");
                YaguraConfig::default()
            });
        Self::with_valid_config(config)
    }

    /// Creates a builder for custom configuration loading.
    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }

    /// Creates an application from an already loaded configuration.
    pub fn from_config(config: YaguraConfig) -> RuntimeResult<Self> {
        validate_config(&config)?;
        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: YaguraConfig) -> Self {
        logging::init_from_config(&config.logging);
        info!(
            mode = %config.mode,
            log_level = %config.logging.level,
            log_format = ?config.logging.format,
            "Application configured"
        );
        let runtime = YaguraBuilder::new().options(config.options());
        Self { config, runtime }
    }

    pub fn config(&self) -> &YaguraConfig {
        &self.config
    }

    /// Deserializes the `layers.<name>` section.
    ///
    /// A missing or null section yields `T::default()`. Names are matched
    /// exactly first, then case-insensitively, since environment variables
    /// always produce lowercase keys.
    pub fn layer_config<T: DeserializeOwned + Default>(&self, name: &str) -> ConfigResult<T> {
        section("layers", &self.config.layers, name)
    }

    /// Deserializes the `services.<name>` section. See [`layer_config`](Self::layer_config).
    pub fn service_config<T: DeserializeOwned + Default>(&self, name: &str) -> ConfigResult<T> {
        section("services", &self.config.services, name)
    }

    /// Appends a layer below the ones already added.
    pub fn layer<L: Layer>(mut self, layer: L) -> Self {
        self.runtime = self.runtime.layer(layer);
        self
    }

    /// Appends a layer the caller keeps a handle to.
    pub fn shared_layer(mut self, layer: BoxedLayer) -> Self {
        self.runtime = self.runtime.shared_layer(layer);
        self
    }

    /// Adds a service, registered after the built-in ones.
    pub fn service<T: ?Sized + Service>(mut self, service: Arc<T>) -> Self {
        self.runtime = self.runtime.service(service);
        self
    }

    /// Starts the runtime and returns its handle.
    pub async fn start(self) -> RuntimeResult<Yagura> {
        let yagura = self.runtime.start().await?;
        info!(layers = yagura.layers().len(), "Yagura runtime started");
        Ok(yagura)
    }

    /// Starts the runtime and runs it until Ctrl+C, SIGTERM or
    /// [`Yagura::shutdown`].
    pub async fn run(self) -> RuntimeResult<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Starts the runtime and runs it until `shutdown` completes or the
    /// runtime is shut down from within.
    pub async fn run_until<F>(self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let yagura = self.start().await?;
        info!("Yagura is now running. Press Ctrl+C to stop.");

        tokio::select! {
            _ = shutdown => debug!("Shutdown requested"),
            _ = yagura.wait_for_stop() => debug!("Runtime stopped from within"),
        }

        yagura.shutdown().await;
        Ok(())
    }
}

impl Default for YaguraApp {
    fn default() -> Self {
        Self::new()
    }
}

fn section<T>(
    kind: &'static str,
    sections: &HashMap<String, Value>,
    name: &str,
) -> ConfigResult<T>
where
    T: DeserializeOwned + Default,
{
    let value = sections.get(name).or_else(|| {
        sections
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    });

    match value {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => T::deserialize(value).map_err(|source| ConfigError::Section {
            kind,
            name: name.to_string(),
            source,
        }),
    }
}

// =============================================================================
// AppBuilder
// =============================================================================

/// Builder for a [`YaguraApp`] with custom configuration loading.
pub struct AppBuilder {
    loader: ConfigLoader,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            loader: ConfigLoader::new().with_current_dir(),
        }
    }

    /// Loads this file instead of searching.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.loader = self.loader.file(path);
        self
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.loader = self.loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.loader = self.loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.loader = self.loader.without_env();
        self
    }

    /// Pins a configuration value. See [`ConfigLoader::set`].
    pub fn set<T: serde::Serialize>(mut self, key: &str, value: T) -> Self {
        self.loader = self.loader.set(key, value);
        self
    }

    /// Loads and validates the configuration.
    pub fn build(self) -> RuntimeResult<YaguraApp> {
        YaguraApp::from_config(self.loader.load()?)
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde::Deserialize;
    use serde_json::json;
    use tokio_test::assert_ok;
    use yagura_core::{
        AppEvent, BoxError, BoxedEvent, DataEvent, EventExt, Flow, LayerBase, LifecycleState,
        RunMode, async_trait,
    };

    use super::*;
    use crate::error::RuntimeError;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct EchoConfig {
        #[serde(default)]
        prefix: String,
    }

    struct Echo {
        base: LayerBase,
        prefix: String,
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
            let text = event.data()["text"].as_str().unwrap_or_default().to_string();
            event.data_mut()["reply"] = json!(format!("{}{text}", self.prefix));
            Ok(Flow::Stop)
        }
    }

    fn test_config() -> YaguraConfig {
        let mut config = YaguraConfig {
            mode: RunMode::Test,
            process_hooks: false,
            ..Default::default()
        };
        config.layers.insert("echo".into(), json!({ "prefix": "> " }));
        config
    }

    #[test]
    fn test_component_sections() {
        let mut config = test_config();
        config.services.insert("Greeter".into(), json!({ "prefix": 5 }));
        let app = YaguraApp::from_config(config).unwrap();

        let echo: EchoConfig = app.layer_config("Echo").unwrap();
        assert_eq!(echo.prefix, "> ");

        let missing: EchoConfig = app.layer_config("Nope").unwrap();
        assert_eq!(missing, EchoConfig::default());

        let bad = app.service_config::<EchoConfig>("Greeter");
        assert!(matches!(bad, Err(ConfigError::Section { kind: "services", .. })));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = test_config();
        config.layers.insert("Broken".into(), json!(3));
        assert!(matches!(
            YaguraApp::from_config(config),
            Err(RuntimeError::Config(ConfigError::InvalidSection { kind: "layers", .. }))
        ));
    }

    #[tokio::test]
    async fn test_start_with_configured_layer() {
        let app = YaguraApp::from_config(test_config()).unwrap();
        let echo_config: EchoConfig = app.layer_config("Echo").unwrap();
        let yagura = assert_ok!(
            app.layer(Echo {
                base: LayerBase::with_config("Echo", &json!({ "prefix": echo_config.prefix }))
                    .unwrap(),
                prefix: echo_config.prefix,
            })
            .start()
            .await
        );

        assert_eq!(yagura.mode(), RunMode::Test);
        let event = yagura
            .dispatch(BoxedEvent::new(DataEvent::new(json!({ "text": "hi" }))))
            .await
            .unwrap();
        assert_eq!(event.data()["reply"], json!("> hi"));
        assert_eq!(
            yagura.layers()[0].base().config().as_value()["prefix"],
            json!("> ")
        );
    }

    #[tokio::test]
    async fn test_run_until_shuts_down() {
        let app = YaguraApp::from_config(test_config()).unwrap();
        let result = app
            .run_until(tokio::time::sleep(Duration::from_millis(10)))
            .await;
        assert_ok!(result);
    }

    #[tokio::test]
    async fn test_run_until_returns_when_stopped_within() {
        struct Stopper {
            base: LayerBase,
        }

        #[async_trait]
        impl Layer for Stopper {
            fn base(&self) -> &LayerBase {
                &self.base
            }

            async fn initialize(&self) -> Result<(), BoxError> {
                let Some(yagura) = self.base.yagura() else {
                    return Ok(());
                };
                tokio::spawn(async move {
                    let mut state = yagura.subscribe_state();
                    let _ = state.wait_for(|s| *s == LifecycleState::Running).await;
                    yagura.shutdown().await;
                });
                Ok(())
            }

            async fn handle_event(&self, _event: &mut BoxedEvent) -> Result<Flow, BoxError> {
                Ok(Flow::Continue)
            }
        }

        let app = YaguraApp::from_config(test_config())
            .unwrap()
            .layer(Stopper {
                base: LayerBase::new("Stopper"),
            });
        assert_ok!(app.run_until(std::future::pending()).await);
    }
}
