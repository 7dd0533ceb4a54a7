//! Echo Demo
//!
//! Reads lines from stdin and answers each one through a Yagura layer stack:
//!
//! ```text
//! LoggingLayer          logs every event
//! Echo (LineEvent only) writes `reply`, stops the event
//! StdinTransport        produces LineEvents, prints replies
//! ```
//!
//! A blank line makes the echo layer fail, which shows the error being routed
//! to the error handler while the demo keeps running. Closing stdin (Ctrl+D)
//! or Ctrl+C shuts the runtime down.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package yagura-echo -- --prefix "> "
//! YAGURA_LOGGING__LEVEL=debug cargo run --package yagura-echo
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use yagura::core::{ErrorReport, WeakYagura};
use yagura::prelude::*;

#[derive(Parser, Debug)]
#[command(about = "Echo stdin lines through a Yagura layer stack")]
struct Args {
    /// Configuration file to load instead of searching for yagura.toml.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile.
    #[arg(long)]
    profile: Option<String>,

    /// Reply prefix, overrides `layers.Echo.prefix`.
    #[arg(short, long)]
    prefix: Option<String>,

    /// Upper bound for handling a single line, in milliseconds.
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,
}

// ============================================================================
// Events
// ============================================================================

/// A line read from stdin.
struct LineEvent {
    header: EventHeader,
}

impl LineEvent {
    fn new(text: &str) -> Self {
        Self {
            header: EventHeader::new(json!({ "text": text })),
        }
    }
}

impl Event for LineEvent {
    event_base!(header);
}

// ============================================================================
// Layers
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct EchoConfig {
    prefix: String,
}

impl Default for EchoConfig {
    fn default() -> Self {
        Self {
            prefix: "echo: ".to_string(),
        }
    }
}

struct Echo {
    base: LayerBase,
    prefix: String,
}

impl Echo {
    const NAME: &'static str = "Echo";

    fn new(config: EchoConfig) -> YaguraResult<Self> {
        Ok(Self {
            base: LayerBase::with_config(Self::NAME, &config)?,
            prefix: config.prefix,
        })
    }
}

#[async_trait]
impl Layer for Echo {
    fn base(&self) -> &LayerBase {
        &self.base
    }

    async fn handle_event(&self, event: &mut BoxedEvent) -> Result<Flow, BoxError> {
        let text = event.data()["text"].as_str().unwrap_or_default().trim().to_string();
        if text.is_empty() {
            return Err("refusing to echo an empty line".into());
        }
        event.data_mut()["reply"] = json!(format!("{}{text}", self.prefix));
        Ok(Flow::Stop)
    }
}

/// Turns stdin lines into [`LineEvent`]s and prints the replies.
struct StdinTransport {
    base: LayerBase,
    timeout: Duration,
}

impl StdinTransport {
    fn new(timeout: Duration) -> Self {
        Self {
            base: LayerBase::new("StdinTransport"),
            timeout,
        }
    }
}

#[async_trait]
impl Layer for StdinTransport {
    fn base(&self) -> &LayerBase {
        &self.base
    }

    async fn initialize(&self) -> Result<(), BoxError> {
        let Some(yagura) = self.base.yagura() else {
            return Err("transport is not mounted".into());
        };
        tokio::spawn(read_lines(yagura.downgrade(), self.timeout));
        Ok(())
    }

    async fn handle_event(&self, event: &mut BoxedEvent) -> Result<Flow, BoxError> {
        if let Some(app) = event.downcast_ref::<AppEvent>() {
            debug!(kind = app.kind().as_str(), "Application event reached the transport");
        }
        Ok(Flow::Continue)
    }
}

async fn read_lines(runtime: WeakYagura, timeout: Duration) {
    let Some(stop) = runtime.upgrade().map(|yagura| yagura.shutdown_token()) else {
        return;
    };
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            _ = stop.cancelled() => break,
            line = lines.next_line() => line,
        };
        let Some(yagura) = runtime.upgrade() else {
            break;
        };

        match line {
            Ok(Some(text)) => {
                let event = BoxedEvent::new(LineEvent::new(&text));
                // Dropping the join handle detaches the dispatch, it still
                // runs to completion.
                let dispatcher = yagura.clone();
                let pending = tokio::spawn(async move { dispatcher.dispatch(event).await });
                match pending.with_timeout(timeout).await {
                    Ok(Ok(Some(event))) => {
                        if let Some(reply) = event.data()["reply"].as_str() {
                            println!("{reply}");
                        }
                    }
                    Ok(Ok(None)) => debug!("Line queued until startup completes"),
                    Ok(Err(e)) => yagura.handle_error(ErrorReport::new(e)).await,
                    Err(e) => {
                        warn!("No reply in time, the line is still being handled");
                        yagura.handle_error(e).await;
                    }
                }
            }
            Ok(None) => {
                info!("stdin closed");
                yagura.shutdown().await;
                break;
            }
            Err(e) => {
                yagura.handle_error(ErrorReport::new(e)).await;
                yagura.shutdown().await;
                break;
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = YaguraApp::builder();
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = &args.profile {
        builder = builder.profile(profile);
    }
    if let Some(prefix) = &args.prefix {
        builder = builder.set("layers.Echo.prefix", prefix);
    }
    let app = builder.build()?;

    let echo = Echo::new(app.layer_config(Echo::NAME)?)?;

    app.layer(LoggingLayer::new())
        .layer(echo.filtered(EventFilter::types().allow::<LineEvent>()))
        .layer(StdinTransport::new(Duration::from_millis(args.timeout_ms)))
        .run()
        .await?;

    Ok(())
}
