//! Process termination signals.

use std::future::Future;
use tracing::{info, warn};

use crate::Result;

/// Installs the termination handlers and returns a future that completes
/// on the first Ctrl+C or, on Unix, SIGTERM.
///
/// Handlers are registered before this returns, so a signal arriving
/// before the future is first polled is not lost.
pub fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    #[cfg(unix)]
    let mut terminate =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    Ok(async move {
        let interrupt = async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Received Ctrl+C"),
                Err(e) => {
                    warn!(error = %e, "Failed to listen for Ctrl+C");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(unix)]
        tokio::select! {
            _ = interrupt => {}
            _ = terminate.recv() => info!("Received SIGTERM"),
        }

        #[cfg(not(unix))]
        interrupt.await;
    })
}
