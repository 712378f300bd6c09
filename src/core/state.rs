//! Process-wide shutdown state.
//!
//! The Ctrl+C handler does not touch the server directly. It fires the
//! coordinator's [`ShutdownTrigger`], and the coordinator tears everything
//! down from its own thread. A second Ctrl+C while that is in progress
//! exits immediately.

use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam::channel::{Receiver, Sender, TrySendError};

/// Exit status for a forced exit (128 + SIGINT)
const FORCED_EXIT_CODE: i32 = 130;

/// Shutdown has been requested (Ctrl+C received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Cloneable handle that asks a running coordinator to stop.
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    tx: Sender<()>,
}

impl ShutdownTrigger {
    /// Trigger plus the receiving end the coordinator waits on.
    ///
    /// Capacity is one: firing twice before anyone listens is one request.
    pub fn channel() -> (Self, Receiver<()>) {
        let (tx, rx) = crossbeam::channel::bounded(1);
        (Self { tx }, rx)
    }

    /// Request shutdown. Never blocks.
    ///
    /// Returns `false` once the coordinator is gone.
    pub fn fire(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => true,
            Err(TrySendError::Disconnected(())) => false,
        }
    }
}

/// Setup the global Ctrl+C handler. Call once at program start
pub fn setup_shutdown_handler(trigger: ShutdownTrigger) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        if SHUTDOWN.swap(true, Ordering::SeqCst) {
            // Second Ctrl+C: stop waiting for a graceful shutdown
            std::process::exit(FORCED_EXIT_CODE);
        }

        crate::log!("serve"; "shutting down...");
        if !trigger.fire() {
            std::process::exit(0);
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}
