//! Turns SIGINT/SIGTERM into batch cancellation.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Spawns a task that cancels `cancel` on the first interrupt or terminate
/// signal. If a handler cannot be installed that signal is ignored.
pub fn spawn_shutdown_listener(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = interrupt() => tracing::warn!("interrupted, cancelling remaining fetches"),
            _ = terminate() => tracing::warn!("terminated, cancelling remaining fetches"),
        }
        cancel.cancel();
    })
}

async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::debug!("ctrl-c handler unavailable: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sig) => {
            sig.recv().await;
        }
        Err(e) => {
            tracing::debug!("SIGTERM handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
