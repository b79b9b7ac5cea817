//! Termination signals.
//!
//! Handlers are installed before the first phase starts, which replaces the
//! default "die immediately" disposition: a signal that arrives while the
//! token is fetched or the agent is configured stays pending and preempts the
//! run phase as soon as it starts.

use crate::error::RunnerError;

pub const SIGINT: i32 = 2;
pub const SIGTERM: i32 = 15;

/// SIGINT and SIGTERM listener.
pub struct Shutdown {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl Shutdown {
    /// Must be called from within a tokio runtime.
    #[cfg(unix)]
    pub fn install() -> Result<Self, RunnerError> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt()).map_err(RunnerError::Signal)?,
            terminate: signal(SignalKind::terminate()).map_err(RunnerError::Signal)?,
        })
    }

    #[cfg(not(unix))]
    pub fn install() -> Result<Self, RunnerError> {
        Ok(Self {})
    }

    /// Resolves with the number of the first signal received.
    #[cfg(unix)]
    pub async fn recv(&mut self) -> i32 {
        tokio::select! {
            _ = self.interrupt.recv() => SIGINT,
            _ = self.terminate.recv() => SIGTERM,
        }
    }

    #[cfg(not(unix))]
    pub async fn recv(&mut self) -> i32 {
        match tokio::signal::ctrl_c().await {
            Ok(()) => SIGINT,
            Err(err) => {
                tracing::warn!(error = %err, "ctrl-c handler failed; run cannot be interrupted");
                std::future::pending().await
            }
        }
    }
}
