//! Termination signal handling
//!
//! The coordinator future is raced against these signals. Dropping it kills
//! the control daemon and any spawned launcher (both are `kill_on_drop`).

/// Resolves when SIGINT or SIGTERM arrives, with the conventional
/// `128 + signal` exit code.
pub async fn shutdown_signal() -> i32 {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for SIGINT: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    {
        tokio::select! {
            () = ctrl_c => {
                tracing::warn!("Received SIGINT (Ctrl+C), stopping");
                130
            }
            () = terminate => {
                tracing::warn!("Received SIGTERM, stopping");
                143
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await;
        tracing::warn!("Received Ctrl+C, stopping");
        130
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_signal_is_send_future() {
        fn assert_send_future<T: std::future::Future<Output = i32> + Send>(_f: T) {}
        assert_send_future(shutdown_signal());
    }
}
