//! Signal handling for stopping the simulation cleanly.

use anyhow::Context;
use std::fmt;
use tokio::signal;

/// Which operator signal ended the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownSignal::Interrupt => write!(f, "interrupt"),
            ShutdownSignal::Terminate => write!(f, "terminate"),
        }
    }
}

/// Waits for SIGINT or SIGTERM (Ctrl+C on Windows) and reports which one
/// arrived.
pub async fn wait_for_shutdown() -> anyhow::Result<ShutdownSignal> {
    #[cfg(unix)]
    let received = {
        use signal::unix::{signal, SignalKind};

        let mut interrupt =
            signal(SignalKind::interrupt()).context("installing SIGINT handler")?;
        let mut terminate =
            signal(SignalKind::terminate()).context("installing SIGTERM handler")?;

        tokio::select! {
            _ = interrupt.recv() => ShutdownSignal::Interrupt,
            _ = terminate.recv() => ShutdownSignal::Terminate,
        }
    };

    #[cfg(not(unix))]
    let received = {
        signal::ctrl_c().await.context("waiting for Ctrl+C")?;
        ShutdownSignal::Interrupt
    };

    Ok(received)
}
