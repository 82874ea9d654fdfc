//! Per-identity access history.

use std::collections::VecDeque;
use std::time::Instant;

/// Ordered instants of admitted (or penalized) requests for one identity.
#[derive(Debug, Default, Clone)]
pub struct AccessLog {
    entries: VecDeque<Instant>,
}

impl AccessLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entry older than `cutoff` and return how many remain.
    ///
    /// Entries are kept if `entry >= cutoff`. Entries are not assumed to be
    /// sorted, so the whole log is scanned.
    pub fn retain_since(&mut self, cutoff: Instant) -> usize {
        self.entries.retain(|&at| at >= cutoff);
        self.entries.len()
    }

    /// Append an instant.
    pub fn record(&mut self, at: Instant) {
        self.entries.push_back(at);
    }

    /// Count entries at or after `cutoff` without mutating the log.
    pub fn count_since(&self, cutoff: Instant) -> usize {
        self.entries.iter().filter(|&&at| at >= cutoff).count()
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
