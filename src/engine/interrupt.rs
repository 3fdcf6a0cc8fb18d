// src/engine/interrupt.rs

//! Operator interrupt wiring.
//!
//! Signal handlers never touch the job directly: they flip a flag on an
//! [`InterruptHandle`] owned by the job and wake its poll loop, which then
//! escalates and terminates its own tasks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct InterruptHandle {
    requested: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl InterruptHandle {
    pub(crate) fn new(wake: Arc<Notify>) -> Self {
        Self {
            requested: Arc::new(AtomicBool::new(false)),
            wake,
        }
    }

    /// Ask the owning job to stop. Takes effect at its next poll tick.
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// Listen for SIGINT / SIGTERM / SIGHUP (Ctrl-C elsewhere) and forward the
/// first one to `handle`.
pub fn spawn_signal_listener(handle: InterruptHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        match wait_for_termination_signal().await {
            Ok(signal) => {
                warn!(signal, "keyboard interrupt or external termination signal");
                handle.request();
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for termination signals");
            }
        }
    })
}

#[cfg(unix)]
async fn wait_for_termination_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate())?;
    let mut hup = signal(SignalKind::hangup())?;

    tokio::select! {
        res = tokio::signal::ctrl_c() => res.map(|_| "SIGINT"),
        _ = term.recv() => Ok("SIGTERM"),
        _ = hup.recv() => Ok("SIGHUP"),
    }
}

#[cfg(not(unix))]
async fn wait_for_termination_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|_| "Ctrl-C")
}
