//! Live reload channel: WebSocket sessions on the HTTP port.
//!
//! ```text
//! accept loop: check upgrade → register client → spawn session thread
//! session:     101 → "connected" → "reload" per signal, ping on idle → close
//! ```
//!
//! Registration happens on the accept loop, before the `101` is sent, so a
//! client can never miss a signal broadcast after its handshake completes.

use std::io::{Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::RecvTimeoutError;
use tiny_http::{Method, Request, Response, StatusCode};
use tungstenite::handshake::derive_accept_key;
use tungstenite::protocol::Role;
use tungstenite::{Message, WebSocket};

use super::ServeContext;
use super::path::url_path;
use super::response::{Reply, make_header};
use crate::embed::serve::WS_PATH;
use crate::reload::{ClientConnection, ReloadMessage};

/// Idle time after which a session pings its client.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Poll step while waiting for sessions to finish.
const WAIT_STEP: Duration = Duration::from_millis(50);

/// Whether the request is a `GET` on the live reload endpoint.
///
/// Other methods on the same path go through normal routing.
pub fn is_endpoint(request: &Request) -> bool {
    request.method() == &Method::Get && url_path(request.url()) == WS_PATH
}

/// Handle a `GET` for the live reload endpoint.
///
/// Called on the accept loop. Anything that is not a proper upgrade gets a
/// 400; a valid upgrade is registered and handed to its own thread.
pub fn accept(request: Request, ctx: &Arc<ServeContext>) {
    let key = match upgrade_key(&request) {
        Some(key) => key,
        None => {
            if let Err(e) = Reply::text(400, "Expected WebSocket upgrade").send(request) {
                crate::debug!("reload"; "failed to reject upgrade: {}", e);
            }
            return;
        }
    };

    let connection = ctx.broadcaster.register();
    let guard = ctx.sessions.enter();
    let id = connection.id();
    let session_ctx = Arc::clone(ctx);

    let spawned = thread::Builder::new()
        .name(format!("hotserve-ws-{id}"))
        .spawn(move || {
            let _guard = guard;
            run(request, &key, connection, &session_ctx);
        });

    if let Err(e) = spawned {
        crate::log!("reload"; "failed to spawn session thread: {}", e);
        ctx.broadcaster.unregister(id);
    }
}

fn run(request: Request, key: &str, connection: ClientConnection, ctx: &ServeContext) {
    let id = connection.id();

    let mut response = Response::empty(StatusCode(101));
    let accept = derive_accept_key(key.as_bytes());
    let headers = [
        ("Upgrade", "websocket"),
        ("Connection", "Upgrade"),
        ("Sec-WebSocket-Accept", accept.as_str()),
    ];
    for header in headers.into_iter().filter_map(|(k, v)| make_header(k, v)) {
        response.add_header(header);
    }

    let stream = request.upgrade("websocket", response);
    let mut socket = WebSocket::from_raw_socket(stream, Role::Server, None);
    crate::debug!("reload"; "client {} connected", id);

    match session(&mut socket, &connection) {
        Ok(()) => crate::debug!("reload"; "client {} closed by server", id),
        Err(e) => crate::debug!("reload"; "client {} dropped: {}", id, e),
    }

    ctx.broadcaster.unregister(id);
    // Best effort: the peer may already be gone
    let _ = socket.close(None);
    let _ = socket.flush();
}

/// Push messages until the client's sequence ends or a write fails.
fn session<S: Read + Write>(
    socket: &mut WebSocket<S>,
    connection: &ClientConnection,
) -> tungstenite::Result<()> {
    socket.send(Message::text(ReloadMessage::connected().to_json()))?;

    loop {
        match connection.recv_timeout(KEEPALIVE_INTERVAL) {
            Ok(_) => socket.send(Message::text(ReloadMessage::Reload.to_json()))?,
            // A dead peer surfaces as a failed write
            Err(RecvTimeoutError::Timeout) => socket.send(Message::Ping(Default::default()))?,
            Err(RecvTimeoutError::Disconnected) => return Ok(()),
        }
    }
}

/// `Sec-WebSocket-Key` of a well-formed upgrade request.
fn upgrade_key(request: &Request) -> Option<String> {
    let header = |name: &str| {
        request
            .headers()
            .iter()
            .find(|h| h.field.as_str().as_str().eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    };

    let upgrade = header("Upgrade")?;
    if !upgrade.eq_ignore_ascii_case("websocket") {
        return None;
    }
    header("Sec-WebSocket-Key").map(|key| key.trim().to_string())
}

/// Counts live session threads so shutdown can wait for them.
#[derive(Debug, Clone, Default)]
pub struct SessionSet {
    active: Arc<AtomicUsize>,
}

impl SessionSet {
    pub fn enter(&self) -> SessionGuard {
        self.active.fetch_add(1, Ordering::AcqRel);
        SessionGuard {
            active: Arc::clone(&self.active),
        }
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Wait until every session has finished. Returns `false` on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.active() > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(WAIT_STEP);
        }
        true
    }
}

/// Held by a session thread for its whole life.
#[derive(Debug)]
pub struct SessionGuard {
    active: Arc<AtomicUsize>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_set_counts_guards() {
        let sessions = SessionSet::default();
        let a = sessions.enter();
        let b = sessions.clone().enter();
        assert_eq!(sessions.active(), 2);

        drop(a);
        assert_eq!(sessions.active(), 1);
        assert!(!sessions.wait_idle(Duration::from_millis(60)));

        drop(b);
        assert!(sessions.wait_idle(Duration::ZERO));
    }

    #[test]
    fn test_wait_idle_sees_background_exit() {
        let sessions = SessionSet::default();
        let guard = sessions.enter();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            drop(guard);
        });

        assert!(sessions.wait_idle(Duration::from_secs(2)));
        handle.join().unwrap();
    }
}
