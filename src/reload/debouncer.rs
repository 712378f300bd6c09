//! Leading-edge debounce for reload signals.
//!
//! The first relevant event of a quiet period fires immediately; everything
//! else inside `window` after that emission is dropped, not queued. A burst
//! whose tail lands inside the window therefore never produces a trailing
//! signal.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::classify::PathClassifier;
use super::types::{ChangeEvent, ReloadSignal};

pub const DEFAULT_WINDOW_MS: u64 = 500;

/// Coalesces bursts of change events into one `ReloadSignal` per window.
pub struct Debouncer {
    classifier: PathClassifier,
    window: Duration,
    /// Time of the last emitted signal; the check and update happen under one lock.
    last_emission: Mutex<Option<Instant>>,
}

impl Debouncer {
    pub fn new(classifier: PathClassifier, window: Duration) -> Self {
        Self {
            classifier,
            window,
            last_emission: Mutex::new(None),
        }
    }

    /// Record an event, returning the signal to broadcast if one fires.
    ///
    /// Time is taken from the event itself, so the outcome depends only on
    /// the sequence of events and not on when this is called.
    pub fn record(&self, event: &ChangeEvent) -> Option<ReloadSignal> {
        if !self.classifier.classify(event).is_relevant() {
            crate::debug!("watch"; "ignored {}: {}", event.kind.label(), event.path.display());
            return None;
        }

        let mut last = self.last_emission.lock();
        if let Some(previous) = *last
            && event.timestamp.saturating_duration_since(previous) < self.window
        {
            crate::debug!("watch"; "coalesced {}: {}", event.kind.label(), event.path.display());
            return None;
        }

        *last = Some(event.timestamp);
        Some(ReloadSignal::at(event.timestamp))
    }
}
