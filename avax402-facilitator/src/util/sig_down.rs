//! Shutdown signal handling.
//!
//! [`SigDown`] turns SIGTERM or SIGINT (Ctrl+C on Windows) into a cancelled
//! [`CancellationToken`]. The server passes [`SigDown::cancelled`] to
//! `axum::serve(..).with_graceful_shutdown`, so in-flight settlements finish
//! before the process exits.

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;

/// Cancels a token when the process is asked to stop.
#[derive(Debug, Clone)]
pub struct SigDown {
    token: CancellationToken,
}

impl SigDown {
    /// Installs the signal listeners on the current runtime.
    ///
    /// # Errors
    ///
    /// Returns an [`std::io::Error`] if a signal handler cannot be registered.
    #[allow(clippy::unnecessary_wraps)] // only fallible on Unix
    pub fn try_new() -> Result<Self, std::io::Error> {
        let token = CancellationToken::new();
        let trigger = token.clone();

        #[cfg(unix)]
        {
            let mut sigterm = signal(SignalKind::terminate())?;
            let mut sigint = signal(SignalKind::interrupt())?;
            tokio::spawn(async move {
                let name = tokio::select! {
                    _ = sigterm.recv() => "SIGTERM",
                    _ = sigint.recv() => "SIGINT",
                    () = trigger.cancelled() => return,
                };
                tracing::info!(signal = name, "shutdown requested");
                trigger.cancel();
            });
        }

        #[cfg(windows)]
        {
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!(signal = "ctrl-c", "shutdown requested");
                        trigger.cancel();
                    }
                    () = trigger.cancelled() => {}
                }
            });
        }

        Ok(Self { token })
    }

    /// Resolves once shutdown has been requested.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Requests shutdown without a signal. Also stops the listener task.
    pub fn shutdown(&self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn stays_armed_until_shutdown() {
        let sig_down = SigDown::try_new().unwrap();
        let waiting = tokio::time::timeout(Duration::from_secs(5), sig_down.cancelled()).await;
        assert!(waiting.is_err());

        sig_down.clone().shutdown();
        tokio::time::timeout(Duration::from_secs(5), sig_down.cancelled())
            .await
            .unwrap();
    }
}
