// Process shutdown wiring

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Cancel `cancel` once `signal` resolves
///
/// The watcher exits without cancelling if the token is cancelled elsewhere
/// first.
pub fn cancel_on<F>(signal: F, cancel: CancellationToken) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = signal => {
                info!("shutdown signal received");
                cancel.cancel();
            }
        }
    })
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "unable to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
