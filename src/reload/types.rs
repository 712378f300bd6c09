use std::path::PathBuf;
use std::time::Instant;

/// What happened to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

impl ChangeKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
        }
    }
}

/// A single filesystem mutation reported by the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
    /// The event concerns a directory rather than a file
    pub is_dir: bool,
    pub timestamp: Instant,
}

impl ChangeEvent {
    /// Event on a regular file, stamped now.
    pub fn file(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self::at(path, kind, Instant::now())
    }

    /// Event on a regular file with an explicit timestamp.
    pub fn at(path: impl Into<PathBuf>, kind: ChangeKind, timestamp: Instant) -> Self {
        Self {
            path: path.into(),
            kind,
            is_dir: false,
            timestamp,
        }
    }

    /// Event on a directory, stamped now.
    pub fn dir(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            is_dir: true,
            ..Self::file(path, kind)
        }
    }
}

/// "Served content may have changed."
///
/// Carries nothing but the moment it was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadSignal {
    pub emitted_at: Instant,
}

impl ReloadSignal {
    pub fn at(emitted_at: Instant) -> Self {
        Self { emitted_at }
    }

    pub fn now() -> Self {
        Self::at(Instant::now())
    }
}
