use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// Install a handler that listens for SIGTERM and SIGINT.
///
/// Returns a `CancellationToken` that is cancelled when either signal is
/// received. The orchestrator stops dispatching new jobs once it fires; jobs
/// already running are left to finish on their own.
pub fn install_shutdown_handler() -> std::io::Result<CancellationToken> {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, no further jobs will be started");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, no further jobs will be started");
            }
        }

        token_clone.cancel();
    });

    Ok(token)
}
