//! Process-wide hooks.
//!
//! Installed once the runtime is initialized, unless disabled or running in
//! [`RunMode::Test`](super::lifecycle::RunMode::Test):
//!
//! - a panic hook that reports panics outside of layer handlers to the
//!   runtime's error pipeline. Panics inside a layer handler are already
//!   caught and reported by the dispatch loop, so the hook skips them. The
//!   same goes for panics raised by the error handler itself, which
//!   [`Yagura::handle_error`] contains.
//! - a task that shuts the runtime down on Ctrl+C or SIGTERM.

use std::future::Future;
use std::panic;

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use super::{WeakYagura, Yagura};
use crate::foundation::error::{YaguraError, panic_message};

tokio::task_local! {
    static IN_LAYER: ();
    static IN_ERROR_HANDLER: ();
}

/// Runs `future` marked as layer code.
pub(crate) async fn within_layer<F: Future>(future: F) -> F::Output {
    IN_LAYER.scope((), future).await
}

fn is_within_layer() -> bool {
    IN_LAYER.try_with(|_| ()).is_ok()
}

/// Runs `future` marked as error handler code.
pub(crate) async fn within_error_handler<F: Future>(future: F) -> F::Output {
    IN_ERROR_HANDLER.scope((), future).await
}

fn is_within_error_handler() -> bool {
    IN_ERROR_HANDLER.try_with(|_| ()).is_ok()
}

pub(crate) fn install(yagura: &Yagura) {
    install_panic_hook(yagura.downgrade());
    spawn_signal_watcher(yagura.downgrade(), yagura.shutdown_token());
    tracing::debug!("Process hooks installed");
}

fn install_panic_hook(runtime: WeakYagura) {
    let Ok(handle) = Handle::try_current() else {
        tracing::warn!("No tokio runtime available, panic hook not installed");
        return;
    };

    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        if is_within_layer() || is_within_error_handler() {
            return;
        }
        match runtime.upgrade() {
            Some(yagura) if yagura.is_initialized() => {
                let message = match info.location() {
                    Some(location) => format!("{} at {location}", panic_message(info.payload())),
                    None => panic_message(info.payload()),
                };
                handle.spawn(async move {
                    yagura.handle_error(YaguraError::Panic(message)).await;
                });
            }
            _ => previous(info),
        }
    }));
}

fn spawn_signal_watcher(runtime: WeakYagura, token: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = shutdown_signal() => {}
        }
        if let Some(yagura) = runtime.upgrade() {
            yagura.shutdown().await;
        }
    });
}

/// Waits for Ctrl+C or, on Unix, SIGTERM.
///
/// If no signal handler can be registered this never completes.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to register SIGTERM handler");
                ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = ctrl_c() => {}
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}
