//! Bounded in-memory log of job-level validation outcomes.

use crate::core::result::ValidationResult;
use crate::validation::profiles::Profile;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use uuid::Uuid;

/// One recorded validation outcome.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    /// Unique id of the run.
    pub id: Uuid,
    /// When the run finished.
    pub timestamp: DateTime<Utc>,
    /// Profile the run used.
    pub profile: Profile,
    /// Outcome validity.
    pub is_valid: bool,
    /// Number of error diagnostics.
    pub error_count: usize,
    /// Number of warning diagnostics.
    pub warning_count: usize,
    /// The full result.
    pub result: ValidationResult,
}

impl HistoryEntry {
    /// Record a result produced by `profile` now.
    pub fn new(profile: Profile, result: ValidationResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            profile,
            is_valid: result.is_valid(),
            error_count: result.errors.len(),
            warning_count: result.warnings.len(),
            result,
        }
    }
}

/// Fixed-capacity history; the oldest entry is evicted first.
#[derive(Debug, Clone)]
pub struct ValidationHistory {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl ValidationHistory {
    /// Create an empty history holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    /// Append an entry, returning the evicted one when full.
    pub fn record(&mut self, entry: HistoryEntry) -> Option<HistoryEntry> {
        let evicted = if self.entries.len() == self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(entry);
        evicted
    }

    /// Entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// The newest entry.
    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    /// Drop every entry, returning how many were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the history is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
