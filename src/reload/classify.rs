//! Path Classification
//!
//! Pure functions deciding whether a filesystem event should reload the page.
//! No watcher machinery, no side effects.

use std::path::Path;

use rustc_hash::FxHashSet;

use super::types::ChangeEvent;

/// Extensions watched when nothing else is configured.
pub const DEFAULT_EXTENSIONS: [&str; 3] = ["html", "js", "css"];

/// Outcome of classifying a change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relevance {
    Relevant,
    Irrelevant,
}

impl Relevance {
    pub fn is_relevant(self) -> bool {
        self == Self::Relevant
    }
}

/// Decides which changes are reload-relevant.
///
/// A change is relevant iff it is not on a directory and the path's
/// extension (ASCII case-insensitive) is in the watched set.
#[derive(Debug, Clone)]
pub struct PathClassifier {
    extensions: FxHashSet<String>,
}

impl PathClassifier {
    /// Build a classifier from extension names (`"css"` and `".css"` are equivalent).
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .filter_map(|ext| normalize_extension(ext.as_ref()))
            .collect();
        Self { extensions }
    }

    /// Classify a watcher event. Root and timestamp never matter.
    pub fn classify(&self, event: &ChangeEvent) -> Relevance {
        self.classify_path(&event.path, event.is_dir)
    }

    /// Classify a bare path with its directory flag.
    pub fn classify_path(&self, path: &Path, is_dir: bool) -> Relevance {
        if is_dir {
            return Relevance::Irrelevant;
        }

        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.contains(&ext.to_ascii_lowercase()));

        if matches {
            Relevance::Relevant
        } else {
            Relevance::Irrelevant
        }
    }

    /// Watched extensions, sorted (for display).
    pub fn extensions(&self) -> Vec<&str> {
        let mut exts: Vec<_> = self.extensions.iter().map(String::as_str).collect();
        exts.sort_unstable();
        exts
    }
}

impl Default for PathClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS)
    }
}

/// Strip a leading dot and lowercase; empty names are dropped.
pub fn normalize_extension(ext: &str) -> Option<String> {
    let ext = ext.trim().trim_start_matches('.');
    (!ext.is_empty()).then(|| ext.to_ascii_lowercase())
}
