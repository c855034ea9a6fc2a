//! Deferred-event scheduler for the forwarder thread.
//!
//! The scheduler is a plain priority queue polled by the event loop; nothing
//! fires spontaneously. Events with equal deadlines fire in the order they
//! were scheduled. Cancellation is synchronous and idempotent, and a fired
//! event must re-look-up its target, since the owning entry may already be
//! gone by the time the event runs.

use crate::face::lp_reassembler::ReassemblyKey;
use crate::face::FaceId;
use crate::table::pit::PitEntryId;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::Instant;

/// Identifier of a scheduled event. Never reused within a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId(u64);

/// The deferred actions the forwarder can schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    /// All in-records of the PIT entry have expired without Data.
    PitExpiry(PitEntryId),
    /// Straggler hold after satisfaction is over; delete the PIT entry.
    PitStraggler(PitEntryId),
    /// A partial packet has waited too long for its remaining fragments.
    ReassemblyTimeout { face: FaceId, key: ReassemblyKey },
}

#[derive(Debug)]
pub struct Scheduler<T> {
    // Min-heap over (deadline, id); the monotonically increasing id breaks
    // deadline ties in insertion order. Canceled entries are dropped lazily
    // when they surface.
    heap: BinaryHeap<Reverse<(Instant, u64)>>,
    pending: HashMap<u64, T>,
    next_id: u64,
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            pending: HashMap::new(),
            next_id: 0,
        }
    }

    /// Schedules `event` to fire at `deadline`.
    pub fn schedule(&mut self, deadline: Instant, event: T) -> EventId {
        let id = self.next_id;
        self.next_id += 1;
        self.heap.push(Reverse((deadline, id)));
        self.pending.insert(id, event);
        EventId(id)
    }

    /// Cancels a scheduled event. Returns false when the event already fired
    /// or was already canceled.
    pub fn cancel(&mut self, id: EventId) -> bool {
        self.pending.remove(&id.0).is_some()
    }

    /// Deadline of the earliest live event, if any.
    pub fn next_deadline(&mut self) -> Option<Instant> {
        while let Some(Reverse((deadline, id))) = self.heap.peek().copied() {
            if self.pending.contains_key(&id) {
                return Some(deadline);
            }
            self.heap.pop();
        }
        None
    }

    /// Pops the earliest event whose deadline is at or before `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<T> {
        while let Some(Reverse((deadline, id))) = self.heap.peek().copied() {
            if deadline > now {
                return None;
            }
            self.heap.pop();
            if let Some(event) = self.pending.remove(&id) {
                return Some(event);
            }
            // Canceled; keep draining.
        }
        None
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_fires_in_deadline_order() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.schedule(t0 + Duration::from_millis(20), "late");
        scheduler.schedule(t0 + Duration::from_millis(10), "early");

        assert_eq!(scheduler.next_deadline(), Some(t0 + Duration::from_millis(10)));
        assert_eq!(scheduler.pop_due(t0 + Duration::from_millis(30)), Some("early"));
        assert_eq!(scheduler.pop_due(t0 + Duration::from_millis(30)), Some("late"));
        assert_eq!(scheduler.pop_due(t0 + Duration::from_millis(30)), None);
    }

    #[test]
    fn test_ties_fire_in_insertion_order() {
        let t0 = Instant::now();
        let deadline = t0 + Duration::from_millis(5);
        let mut scheduler = Scheduler::new();
        scheduler.schedule(deadline, 1);
        scheduler.schedule(deadline, 2);
        scheduler.schedule(deadline, 3);

        assert_eq!(scheduler.pop_due(deadline), Some(1));
        assert_eq!(scheduler.pop_due(deadline), Some(2));
        assert_eq!(scheduler.pop_due(deadline), Some(3));
    }

    #[test]
    fn test_not_due_yet() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.schedule(t0 + Duration::from_millis(10), ());
        assert_eq!(scheduler.pop_due(t0), None);
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        let id = scheduler.schedule(t0, "x");

        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));
        assert_eq!(scheduler.pop_due(t0), None);
        assert_eq!(scheduler.next_deadline(), None);
    }
}
