//! Server lifecycle: the coordinator state machine.
//!
//! ```text
//! Stopped ──start()──► Starting ──► Running ──shutdown()──► Stopping ──► Stopped
//!    ▲                    │
//!    └──── any failure ───┘
//! ```
//!
//! # Threads while running
//!
//! - `hotserve-http`: accept loop, feeds a small `rayon` pool
//! - `hotserve-relay`: watcher events → debouncer → broadcaster
//! - `hotserve-ws-#n`: one per WebSocket client
//!
//! # Shutdown order
//!
//! 1. stop the relay (and with it the file watcher)
//! 2. unblock the accept loop and wait for it
//! 3. close every client connection, which ends the WebSocket sessions
//! 4. wait for session threads, bounded by [`SHUTDOWN_TIMEOUT`]

mod lifecycle;
mod relay;

#[cfg(test)]
mod tests;

use std::fmt;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::Receiver;
use thiserror::Error;
use tiny_http::Server;

use crate::config::Config;
use crate::core::ShutdownTrigger;
use crate::log;
use crate::reload::{Debouncer, ReloadBroadcaster};
use crate::serve::{ServeContext, SessionSet, run_request_loop};
use crate::watch::{FileWatcher, WatchError};
use lifecycle::{bind_with_retry, join_with_timeout};
use relay::Relay;

/// Bound on each blocking step of shutdown.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Worker threads for ordinary HTTP requests.
const REQUEST_THREADS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

/// Startup failures. All of them leave the coordinator `Stopped`.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("served root is not a directory: {0}")]
    Root(PathBuf),

    #[error("invalid watch root")]
    WatchRoot(#[source] WatchError),

    #[error("could not bind {interface} after {attempts} attempts")]
    Bind {
        interface: IpAddr,
        attempts: u32,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("file watcher failed to start")]
    Watch(#[source] WatchError),

    #[error("cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: ServerState,
    },

    #[error("failed to build request thread pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("failed to spawn {0} thread")]
    Spawn(&'static str, #[source] io::Error),
}

impl From<WatchError> for ServeError {
    fn from(err: WatchError) -> Self {
        match err {
            WatchError::Missing(_) | WatchError::NotADirectory(_) => Self::WatchRoot(err),
            WatchError::Notify { .. } => Self::Watch(err),
        }
    }
}

/// Everything that exists only while running.
struct Running {
    addr: SocketAddr,
    server: Arc<Server>,
    http: Option<JoinHandle<()>>,
    relay: Option<Relay>,
    ctx: Arc<ServeContext>,
}

/// Owns the server, the watcher and the client registry.
pub struct Coordinator {
    config: Arc<Config>,
    state: ServerState,
    broadcaster: Arc<ReloadBroadcaster>,
    trigger: ShutdownTrigger,
    shutdown_rx: Receiver<()>,
    running: Option<Running>,
}

impl Coordinator {
    pub fn new(config: Config) -> Self {
        let (trigger, shutdown_rx) = ShutdownTrigger::channel();
        Self {
            config: Arc::new(config),
            state: ServerState::Stopped,
            broadcaster: Arc::new(ReloadBroadcaster::new()),
            trigger,
            shutdown_rx,
            running: None,
        }
    }

    /// Bind, start watching, and begin serving.
    ///
    /// Returns the address actually bound.
    pub fn start(&mut self) -> Result<SocketAddr, ServeError> {
        if self.state != ServerState::Stopped {
            return Err(ServeError::InvalidState {
                action: "start",
                state: self.state,
            });
        }

        self.state = ServerState::Starting;
        match self.launch() {
            Ok(running) => {
                let addr = running.addr;
                self.running = Some(running);
                self.state = ServerState::Running;
                crate::debug!("serve"; "running on {}", addr);
                Ok(addr)
            }
            Err(e) => {
                self.state = ServerState::Stopped;
                Err(e)
            }
        }
    }

    fn launch(&mut self) -> Result<Running, ServeError> {
        let config = Arc::clone(&self.config);
        let root = validate_root(config.serve_root())?;

        // Triggers fired while stopped belong to the previous run
        while self.shutdown_rx.try_recv().is_ok() {}

        let (server, addr) = bind_with_retry(config.serve.interface, config.serve.port)?;
        let server = Arc::new(server);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(REQUEST_THREADS)
            .thread_name(|i| format!("hotserve-worker-{i}"))
            .build()?;

        let live_reload = config.reload.enable;
        let mut relay = if live_reload {
            let (watcher, events) = FileWatcher::start(config.watch_root(), true)?;
            let debouncer = Debouncer::new(config.classifier(), config.debounce());
            let relay = Relay::spawn(watcher, events, debouncer, Arc::clone(&self.broadcaster))
                .map_err(|e| ServeError::Spawn("relay", e))?;
            Some(relay)
        } else {
            None
        };

        let ctx = Arc::new(ServeContext {
            root,
            index: config.serve.index.clone(),
            live_reload,
            broadcaster: Arc::clone(&self.broadcaster),
            sessions: SessionSet::default(),
        });

        let http = {
            let server = Arc::clone(&server);
            let ctx = Arc::clone(&ctx);
            thread::Builder::new()
                .name("hotserve-http".into())
                .spawn(move || run_request_loop(&server, &ctx, &pool))
        };
        let http = match http {
            Ok(handle) => handle,
            Err(e) => {
                if let Some(relay) = relay.as_mut() {
                    relay.stop();
                }
                return Err(ServeError::Spawn("http", e));
            }
        };

        Ok(Running {
            addr,
            server,
            http: Some(http),
            relay,
            ctx,
        })
    }

    /// Stop serving and release every resource. No-op unless running.
    pub fn shutdown(&mut self) {
        let Some(mut running) = self.running.take() else {
            return;
        };
        self.state = ServerState::Stopping;
        crate::debug!("serve"; "stopping server on {}", running.addr);

        if let Some(mut relay) = running.relay.take() {
            if relay.is_degraded() {
                log!("watch"; "live reload stayed disabled until shutdown");
            }
            relay.stop();
        }

        running.server.unblock();
        if let Some(http) = running.http.take()
            && !join_with_timeout(http, SHUTDOWN_TIMEOUT)
        {
            log!("serve"; "request loop did not stop in time");
        }

        // Registration happens on the accept loop, so nobody joins after this
        let closed = self.broadcaster.close_all();
        if closed > 0 {
            crate::debug!("reload"; "closed {} client(s)", closed);
        }
        if !running.ctx.sessions.wait_idle(SHUTDOWN_TIMEOUT) {
            log!(
                "reload";
                "{} session(s) still open after shutdown",
                running.ctx.sessions.active()
            );
        }

        while self.shutdown_rx.try_recv().is_ok() {}
        self.state = ServerState::Stopped;
    }

    /// Block until a shutdown trigger fires, then shut down.
    pub fn wait(&mut self) {
        if self.running.is_none() {
            return;
        }
        // The coordinator holds a sender itself, so this cannot disconnect
        let _ = self.shutdown_rx.recv();
        self.shutdown();
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle for stopping the server from another thread.
    pub fn shutdown_trigger(&self) -> ShutdownTrigger {
        self.trigger.clone()
    }
}

#[cfg(test)]
impl Coordinator {
    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Bound address while running.
    pub fn addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.addr)
    }

    pub fn broadcaster(&self) -> &Arc<ReloadBroadcaster> {
        &self.broadcaster
    }

    /// Live reload was enabled but the watch has been lost for good.
    pub fn is_reload_degraded(&self) -> bool {
        self.running
            .as_ref()
            .and_then(|r| r.relay.as_ref())
            .is_some_and(Relay::is_degraded)
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn validate_root(root: &Path) -> Result<PathBuf, ServeError> {
    if !root.is_dir() {
        return Err(ServeError::Root(root.to_path_buf()));
    }
    root.canonicalize()
        .map_err(|_| ServeError::Root(root.to_path_buf()))
}
