//! Per-sender violation counters.
//!
//! Process-lifetime state only; counters are lost on restart. A sender
//! absent from the map has count 0.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Thread-safe violation counter keyed by sender id.
///
/// Uses a sync [`Mutex`] since every critical section is a single
/// read-modify-write with no awaits.
#[derive(Debug, Default)]
pub struct ViolationTracker {
    counts: Mutex<HashMap<u64, u32>>,
}

impl ViolationTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, u32>> {
        // Every update is a single insert, so a poisoned map is still consistent.
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Increment the sender's count and return the new value.
    pub fn record_offense(&self, sender: u64) -> u32 {
        let mut map = self.lock();
        let count = map.entry(sender).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    /// Increment the sender's count; once it reaches `threshold`, reset it
    /// to zero in the same critical section.
    ///
    /// Returns the count reached before any reset.
    pub fn record_offense_with_reset(&self, sender: u64, threshold: u32) -> u32 {
        let mut map = self.lock();
        let reached = map.get(&sender).copied().unwrap_or(0).saturating_add(1);
        if reached >= threshold {
            map.remove(&sender);
        } else {
            map.insert(sender, reached);
        }
        reached
    }

    /// Current count for `sender`.
    pub fn count(&self, sender: u64) -> u32 {
        self.lock().get(&sender).copied().unwrap_or(0)
    }

    /// Forget the sender's violations.
    pub fn reset(&self, sender: u64) {
        self.lock().remove(&sender);
    }

    /// Number of senders with a nonzero count.
    pub fn tracked_senders(&self) -> usize {
        self.lock().len()
    }
}
