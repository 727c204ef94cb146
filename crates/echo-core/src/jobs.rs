//! In-flight job tracking. Ephemeral, never persisted.

use std::collections::HashSet;
use std::sync::Mutex;

use crate::ids::EntryId;

/// The set of entries currently mid-pipeline. Its cardinality is what a UI
/// shows as "loading".
#[derive(Debug, Default)]
pub struct JobTracker {
    in_flight: Mutex<HashSet<EntryId>>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent add. Returns true if the id was not already tracked.
    pub fn mark_in_flight(&self, id: EntryId) -> bool {
        self.lock().insert(id)
    }

    /// Idempotent removal by value. Returns true if the id was tracked.
    pub fn mark_complete(&self, id: EntryId) -> bool {
        self.lock().remove(&id)
    }

    pub fn is_in_flight(&self, id: EntryId) -> bool {
        self.lock().contains(&id)
    }

    pub fn in_flight_count(&self) -> usize {
        self.lock().len()
    }

    /// Tracked ids, newest first.
    pub fn snapshot(&self) -> Vec<EntryId> {
        let mut ids: Vec<EntryId> = self.lock().iter().copied().collect();
        ids.sort_by(|a, b| b.cmp(a));
        ids
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<EntryId>> {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_in_flight_is_idempotent() {
        let jobs = JobTracker::new();
        assert!(jobs.mark_in_flight(EntryId::new(1)));
        assert!(!jobs.mark_in_flight(EntryId::new(1)));
        assert_eq!(jobs.in_flight_count(), 1);
    }

    #[test]
    fn test_mark_complete_removes_only_that_id() {
        let jobs = JobTracker::new();
        jobs.mark_in_flight(EntryId::new(1));
        jobs.mark_in_flight(EntryId::new(2));

        assert!(jobs.mark_complete(EntryId::new(1)));
        assert!(!jobs.is_in_flight(EntryId::new(1)));
        assert!(jobs.is_in_flight(EntryId::new(2)));
    }

    #[test]
    fn test_mark_complete_absent_is_noop() {
        let jobs = JobTracker::new();
        assert!(!jobs.mark_complete(EntryId::new(3)));
        assert_eq!(jobs.in_flight_count(), 0);
    }

    #[test]
    fn test_snapshot_newest_first() {
        let jobs = JobTracker::new();
        for raw in [10, 30, 20] {
            jobs.mark_in_flight(EntryId::new(raw));
        }
        let ids: Vec<u64> = jobs.snapshot().into_iter().map(|id| id.value()).collect();
        assert_eq!(ids, vec![30, 20, 10]);
    }
}
