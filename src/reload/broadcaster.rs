//! Reload Broadcaster - Connected Client Registry
//!
//! Each registered client owns the receiving end of an unbounded channel; the
//! registry keeps the sending ends. Broadcasting pushes one signal into every
//! channel, pruning clients whose receiver is gone.
//!
//! ```text
//! relay --broadcast--> ReloadBroadcaster --signal--> ClientConnection --> WebSocket session
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::types::ReloadSignal;

/// Identifies one registered client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Sending side kept by the registry
struct ClientSlot {
    tx: Sender<ReloadSignal>,
    open: Arc<AtomicBool>,
}

/// Tracks connected clients and fans reload signals out to them.
///
/// All access to the client set goes through a single mutex.
#[derive(Default)]
pub struct ReloadBroadcaster {
    clients: Mutex<FxHashMap<ClientId, ClientSlot>>,
    next_id: AtomicU64,
}

impl ReloadBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a client and hand back its signal sequence.
    pub fn register(&self) -> ClientConnection {
        let id = ClientId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = channel::unbounded();
        let open = Arc::new(AtomicBool::new(true));

        let mut clients = self.clients.lock();
        clients.insert(
            id,
            ClientSlot {
                tx,
                open: Arc::clone(&open),
            },
        );
        crate::debug!("reload"; "client {} registered (total: {})", id, clients.len());

        ClientConnection { id, rx, open }
    }

    /// Remove a client. Unknown or already removed ids are a no-op.
    ///
    /// Returns whether a client was actually removed.
    pub fn unregister(&self, id: ClientId) -> bool {
        let removed = self.clients.lock().remove(&id);
        match removed {
            Some(slot) => {
                slot.open.store(false, Ordering::Release);
                crate::debug!("reload"; "client {} unregistered", id);
                true
            }
            None => false,
        }
    }

    /// Deliver `signal` to every registered client.
    ///
    /// Clients whose receiving end is gone are dropped from the registry;
    /// the others still get the signal. Returns the number of deliveries.
    pub fn broadcast(&self, signal: ReloadSignal) -> usize {
        let mut clients = self.clients.lock();
        let count = clients.len();

        if count == 0 {
            crate::debug!("reload"; "no clients connected");
            return 0;
        }

        let mut delivered = 0;
        clients.retain(|id, slot| match slot.tx.send(signal) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(_) => {
                crate::debug!("reload"; "client {} disconnected", id);
                slot.open.store(false, Ordering::Release);
                false
            }
        });

        crate::debug!("reload"; "broadcast to {}/{} clients", delivered, count);
        delivered
    }

    /// Unregister every client, terminating all their sequences.
    pub fn close_all(&self) -> usize {
        let drained: Vec<_> = self.clients.lock().drain().collect();
        for (_, slot) in &drained {
            slot.open.store(false, Ordering::Release);
        }
        drained.len()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One client's notification channel.
///
/// Iterating yields signals as they arrive and ends once the client is
/// unregistered or the server shuts down (queued signals are yielded first).
pub struct ClientConnection {
    id: ClientId,
    rx: Receiver<ReloadSignal>,
    open: Arc<AtomicBool>,
}

impl ClientConnection {
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Still registered with the broadcaster.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Signals enqueued but not yet taken.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Take a queued signal without blocking.
    #[cfg(test)]
    pub fn try_recv(&self) -> Option<ReloadSignal> {
        self.rx.try_recv().ok()
    }

    /// Wait up to `timeout` for the next signal.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<ReloadSignal, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

impl Iterator for ClientConnection {
    type Item = ReloadSignal;

    fn next(&mut self) -> Option<Self::Item> {
        self.rx.recv().ok()
    }
}

impl std::fmt::Debug for ClientConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConnection")
            .field("id", &self.id)
            .field("open", &self.is_open())
            .field("pending", &self.pending())
            .finish()
    }
}
