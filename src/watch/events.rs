//! notify events -> `ChangeEvent`s.

use std::path::Path;
use std::time::Instant;

use notify::EventKind;
use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};

use crate::reload::{ChangeEvent, ChangeKind};

/// Translate one raw notify event, stamping every change with `at`.
///
/// Metadata-only modifications (mtime/atime/chmod noise) and access events
/// produce nothing.
pub(super) fn convert(event: &notify::Event, at: Instant) -> Vec<ChangeEvent> {
    let paths = &event.paths;

    match event.kind {
        EventKind::Create(kind) => {
            let folder = matches!(kind, CreateKind::Folder);
            paths
                .iter()
                .map(|p| change(p, ChangeKind::Created, folder || p.is_dir(), at))
                .collect()
        }

        EventKind::Remove(kind) => {
            let folder = matches!(kind, RemoveKind::Folder);
            paths
                .iter()
                .map(|p| change(p, ChangeKind::Deleted, folder, at))
                .collect()
        }

        EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),

        EventKind::Modify(ModifyKind::Name(mode)) => renamed(paths, mode, at),

        EventKind::Modify(_) => paths
            .iter()
            .map(|p| change(p, ChangeKind::Modified, p.is_dir(), at))
            .collect(),

        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}

/// The watched root itself was removed or renamed away.
///
/// The OS watch is tied to the old directory, so it must be re-established
/// even if a new directory appears at the same path.
pub(super) fn removes_root(event: &notify::Event, root: &Path) -> bool {
    matches!(
        event.kind,
        EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_))
    ) && event.paths.iter().any(|p| p == root)
}

fn renamed(paths: &[std::path::PathBuf], mode: RenameMode, at: Instant) -> Vec<ChangeEvent> {
    match mode {
        RenameMode::From => paths
            .iter()
            .map(|p| change(p, ChangeKind::Deleted, false, at))
            .collect(),
        RenameMode::To => paths
            .iter()
            .map(|p| change(p, ChangeKind::Created, p.is_dir(), at))
            .collect(),
        // [from, to]
        RenameMode::Both => {
            let mut changes = Vec::with_capacity(2);
            if let Some(from) = paths.first() {
                changes.push(change(from, ChangeKind::Deleted, false, at));
            }
            if let Some(to) = paths.get(1) {
                changes.push(change(to, ChangeKind::Created, to.is_dir(), at));
            }
            changes
        }
        // Backend could not tell which side this is
        RenameMode::Any | RenameMode::Other => paths
            .iter()
            .map(|p| {
                if p.exists() {
                    change(p, ChangeKind::Modified, p.is_dir(), at)
                } else {
                    change(p, ChangeKind::Deleted, false, at)
                }
            })
            .collect(),
    }
}

fn change(path: &Path, kind: ChangeKind, is_dir: bool, at: Instant) -> ChangeEvent {
    ChangeEvent {
        is_dir,
        ..ChangeEvent::at(path, kind, at)
    }
}
