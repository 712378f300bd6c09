//! Relay thread: watcher events in, reload signals out.
//!
//! ```text
//! FileWatcher ──ChangeEvent──► Debouncer ──ReloadSignal──► ReloadBroadcaster
//! ```
//!
//! The loop wakes at least once per [`POLL_INTERVAL`] to keep the watch
//! healthy and to notice the stop channel.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender};
use crossbeam::select;

use super::lifecycle::join_with_timeout;
use crate::logger::status_success;
use crate::reload::{ChangeEvent, Debouncer, ReloadBroadcaster};
use crate::watch::{FileWatcher, WatchHealth};

/// Upper bound on how long the relay sleeps between checks.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long `stop` waits for the thread to exit.
const STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Handle on the running relay thread.
pub struct Relay {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    degraded: Arc<AtomicBool>,
}

impl Relay {
    /// Move the watcher onto its own thread and start relaying.
    pub fn spawn(
        watcher: FileWatcher,
        events: Receiver<ChangeEvent>,
        debouncer: Debouncer,
        broadcaster: Arc<ReloadBroadcaster>,
    ) -> io::Result<Self> {
        let (stop_tx, stop_rx) = channel::bounded::<()>(0);
        let degraded = Arc::new(AtomicBool::new(false));

        let worker = RelayLoop {
            watcher,
            events,
            debouncer,
            broadcaster,
            stop_rx,
            degraded: Arc::clone(&degraded),
        };
        let handle = thread::Builder::new()
            .name("hotserve-relay".into())
            .spawn(move || worker.run())?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
            degraded,
        })
    }

    /// The watch was lost for good; reloads no longer happen.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    /// Stop the loop and release the watcher. Safe to call more than once.
    pub fn stop(&mut self) {
        // Disconnecting the stop channel ends the loop
        self.stop_tx.take();

        if let Some(handle) = self.handle.take()
            && !join_with_timeout(handle, STOP_TIMEOUT)
        {
            crate::log!("watch"; "relay thread did not stop in time");
        }
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        self.stop();
    }
}

struct RelayLoop {
    watcher: FileWatcher,
    events: Receiver<ChangeEvent>,
    debouncer: Debouncer,
    broadcaster: Arc<ReloadBroadcaster>,
    stop_rx: Receiver<()>,
    degraded: Arc<AtomicBool>,
}

impl RelayLoop {
    fn run(mut self) {
        let mut last_check = Instant::now();

        loop {
            select! {
                recv(self.stop_rx) -> _ => break,
                recv(self.events) -> event => match event {
                    Ok(event) => self.relay(&event),
                    Err(_) => break,
                },
                default(POLL_INTERVAL) => {}
            }

            // A steady event stream must not starve maintenance
            if last_check.elapsed() >= POLL_INTERVAL {
                last_check = Instant::now();
                self.check_watch();
            }
        }

        self.watcher.stop();
        crate::debug!("watch"; "relay stopped");
    }

    fn relay(&self, event: &ChangeEvent) {
        let Some(signal) = self.debouncer.record(event) else {
            return;
        };

        let delivered = self.broadcaster.broadcast(signal);
        let name = event
            .path
            .strip_prefix(self.watcher.root())
            .unwrap_or(&event.path);
        status_success(&format!(
            "{} {}, reloading {} client(s)",
            event.kind.label(),
            name.display(),
            delivered
        ));
    }

    fn check_watch(&mut self) {
        if self.watcher.maintain() == WatchHealth::Degraded {
            self.degraded.store(true, Ordering::Release);
        }
    }
}
