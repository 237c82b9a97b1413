//! Event queue with deterministic ordering.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::Duration;

/// Key for ordering events in the queue.
///
/// Events are ordered by:
/// 1. Time (earlier first)
/// 2. Sequence number (FIFO for equal times)
///
/// The sequence number is assigned monotonically at insertion, so two events
/// scheduled for the same instant are delivered in the order they were
/// inserted. Replay depends on this being exact, not best-effort.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct EventKey {
    /// When this event should be processed.
    pub time: Duration,
    /// Insertion sequence, for deterministic FIFO ordering.
    pub sequence: u64,
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.time.cmp(&other.time) {
            Ordering::Equal => {}
            ord => return ord,
        }
        self.sequence.cmp(&other.sequence)
    }
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Time-ordered store of pending events.
///
/// Insert, pop-minimum and remove-by-key are all logarithmic in the number of
/// outstanding events; simulations routinely hold tens of thousands.
#[derive(Debug)]
pub struct EventQueue<E> {
    events: BTreeMap<EventKey, E>,
    sequence: u64,
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventQueue<E> {
    pub fn new() -> Self {
        Self {
            events: BTreeMap::new(),
            sequence: 0,
        }
    }

    /// Store an event for delivery at `time`. Returns the key under which it
    /// was stored, usable for cancellation via [`remove`](Self::remove).
    pub fn insert(&mut self, time: Duration, event: E) -> EventKey {
        self.sequence += 1;
        let key = EventKey {
            time,
            sequence: self.sequence,
        };
        self.events.insert(key, event);
        key
    }

    /// Remove and return the event with the smallest key. `None` means no
    /// more work: the simulation is done, not in error.
    pub fn pop_first(&mut self) -> Option<(EventKey, E)> {
        self.events.pop_first()
    }

    /// The smallest key without removing it.
    pub fn peek_min_key(&self) -> Option<EventKey> {
        self.events.first_key_value().map(|(key, _)| *key)
    }

    /// Cancel a pending event. Returns the event if it had not fired yet.
    pub fn remove(&mut self, key: &EventKey) -> Option<E> {
        self.events.remove(key)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
