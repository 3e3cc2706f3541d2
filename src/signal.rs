/// Waits for SIGTERM or SIGINT. Falls back to Ctrl-C alone when the
/// unix handlers cannot be installed.
#[cfg(unix)]
pub async fn wait_for_stop_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(mut terminate), Ok(mut interrupt)) => tokio::select! {
            _ = terminate.recv() => "SIGTERM",
            _ = interrupt.recv() => "SIGINT",
        },
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!("install signal handler failed: {e}, waiting for ctrl-c");
            ctrl_c().await
        }
    }
}

#[cfg(not(unix))]
pub async fn wait_for_stop_signal() -> &'static str {
    ctrl_c().await
}

async fn ctrl_c() -> &'static str {
    match tokio::signal::ctrl_c().await {
        Ok(()) => "CTRL_C",
        Err(e) => {
            tracing::error!("listen for ctrl-c failed: {e}");
            std::future::pending().await
        }
    }
}
