//! File Watcher
//!
//! Recursively observes the watch root and emits `ChangeEvent`s on a channel.
//!
//! ```text
//! notify backend thread → convert → crossbeam channel → relay thread
//! ```
//!
//! The relay thread calls [`FileWatcher::maintain`] once per polling interval.
//! A watch that reported an error, or whose root vanished or was replaced by
//! a new directory at the same path, is dropped and re-established; after [`MAX_REATTACH_ATTEMPTS`] consecutive failures the
//! watcher gives up and reports [`WatchHealth::Degraded`].

mod events;


use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crossbeam::channel::{self, Receiver, Sender};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;

use crate::reload::ChangeEvent;

/// Consecutive failed re-attach attempts before auto-reload is abandoned.
pub const MAX_REATTACH_ATTEMPTS: u32 = 30;

/// Which directory sits at the root path.
#[cfg(unix)]
type RootId = (u64, u64);
#[cfg(not(unix))]
type RootId = std::time::SystemTime;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("watch root does not exist: {0}")]
    Missing(PathBuf),

    #[error("watch root is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("failed to watch `{path}`")]
    Notify {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchHealth {
    Healthy,
    /// Watch lost for good. Static serving continues without auto-reload.
    Degraded,
}

/// Handle on an active recursive watch.
pub struct FileWatcher {
    root: PathBuf,
    mode: RecursiveMode,
    /// Kept alive while attached; dropping it releases the OS handles
    watcher: Option<RecommendedWatcher>,
    /// Identity of the directory the current watch was placed on
    root_id: Option<RootId>,
    events_tx: Sender<ChangeEvent>,
    /// Set by the backend thread when notify reports an error
    faulted: Arc<AtomicBool>,
    failures: u32,
    health: WatchHealth,
    stopped: bool,
}

impl FileWatcher {
    /// Validate `root` and start watching it.
    ///
    /// Events start buffering in the returned receiver immediately.
    pub fn start(
        root: impl AsRef<Path>,
        recursive: bool,
    ) -> Result<(Self, Receiver<ChangeEvent>), WatchError> {
        let root = validate_root(root.as_ref())?;
        let (events_tx, events_rx) = channel::unbounded();

        let mut watcher = Self {
            root,
            mode: if recursive {
                RecursiveMode::Recursive
            } else {
                RecursiveMode::NonRecursive
            },
            watcher: None,
            root_id: None,
            events_tx,
            faulted: Arc::new(AtomicBool::new(false)),
            failures: 0,
            health: WatchHealth::Healthy,
            stopped: false,
        };
        watcher.attach()?;

        crate::debug!("watch"; "watching {}", watcher.root.display());
        Ok((watcher, events_rx))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    #[cfg(test)]
    pub fn health(&self) -> WatchHealth {
        self.health
    }

    #[cfg(test)]
    pub fn is_attached(&self) -> bool {
        self.watcher.is_some()
    }

    /// Check the watch and re-establish it if it was lost.
    pub fn maintain(&mut self) -> WatchHealth {
        if self.stopped || self.health == WatchHealth::Degraded {
            return self.health;
        }

        let faulted = self.faulted.swap(false, Ordering::AcqRel);
        let replaced = root_identity(&self.root) != self.root_id;
        if self.watcher.is_some() && !faulted && !replaced && self.root.is_dir() {
            return self.health;
        }

        if self.watcher.take().is_some() {
            crate::log!("watch"; "lost watch on {}, re-attaching", self.root.display());
        }

        match self.attach() {
            Ok(()) => {
                self.failures = 0;
                crate::log!("watch"; "re-attached watch: {}", self.root.display());
            }
            Err(e) => {
                self.failures += 1;
                crate::debug!("watch"; "re-attach attempt {} failed: {}", self.failures, e);
                if self.failures >= MAX_REATTACH_ATTEMPTS {
                    self.health = WatchHealth::Degraded;
                    crate::logger::status_warning(&format!(
                        "watching {} failed, live reload disabled (still serving)",
                        self.root.display()
                    ));
                }
            }
        }

        self.health
    }

    /// Release the OS watch handles. Safe to call more than once.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.watcher = None;
        crate::debug!("watch"; "stopped watching {}", self.root.display());
    }

    fn attach(&mut self) -> Result<(), WatchError> {
        if !self.root.is_dir() {
            return Err(WatchError::Missing(self.root.clone()));
        }

        let tx = self.events_tx.clone();
        let faulted = Arc::clone(&self.faulted);
        let root = self.root.clone();
        let handler = move |res: notify::Result<notify::Event>| match res {
            Ok(event) => {
                if events::removes_root(&event, &root) {
                    faulted.store(true, Ordering::Release);
                }
                for change in events::convert(&event, Instant::now()) {
                    // Receiver gone means the relay has shut down
                    let _ = tx.send(change);
                }
            }
            Err(e) => {
                crate::log!("watch"; "notify error: {}", e);
                faulted.store(true, Ordering::Release);
            }
        };

        let notify_err = |source| WatchError::Notify {
            path: self.root.clone(),
            source,
        };
        // Taken before the watch goes on, so a swap in between is caught next time
        let root_id = root_identity(&self.root);
        let mut watcher = notify::recommended_watcher(handler).map_err(notify_err)?;
        watcher.watch(&self.root, self.mode).map_err(notify_err)?;

        self.watcher = Some(watcher);
        self.root_id = root_id;
        Ok(())
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(unix)]
fn root_identity(root: &Path) -> Option<RootId> {
    use std::os::unix::fs::MetadataExt;
    let meta = std::fs::metadata(root).ok()?;
    meta.is_dir().then(|| (meta.dev(), meta.ino()))
}

#[cfg(not(unix))]
fn root_identity(root: &Path) -> Option<RootId> {
    let meta = std::fs::metadata(root).ok()?;
    meta.is_dir().then(|| meta.created().ok()).flatten()
}

/// Fail fast on a missing or non-directory root, returning it canonicalized.
fn validate_root(root: &Path) -> Result<PathBuf, WatchError> {
    if !root.exists() {
        return Err(WatchError::Missing(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(WatchError::NotADirectory(root.to_path_buf()));
    }
    Ok(root.canonicalize().unwrap_or_else(|_| root.to_path_buf()))
}
