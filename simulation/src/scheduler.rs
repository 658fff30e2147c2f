//! Discrete-event scheduler
//!
//! A min-heap of events keyed by simulated time. Events scheduled for the
//! same instant pop in the order they were scheduled. A cancelled event is
//! left in the heap and skipped when it reaches the top.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::time::Duration;

use manet_core::{Clock, SimTime};
use serde::{Deserialize, Serialize};

/// Handle for cancelling a scheduled event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(u64);

struct Scheduled<E> {
    at: SimTime,
    seq: u64,
    event: E,
}

impl<E> PartialEq for Scheduled<E> {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl<E> Eq for Scheduled<E> {}

impl<E> PartialOrd for Scheduled<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Scheduled<E> {
    // Reversed: BinaryHeap is a max-heap
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .at
            .cmp(&self.at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Event queue and simulation clock
pub struct Scheduler<E> {
    queue: BinaryHeap<Scheduled<E>>,
    /// Ids scheduled and neither fired nor cancelled
    live: HashSet<u64>,
    next_seq: u64,
    now: SimTime,
}

impl<E> Scheduler<E> {
    pub fn new() -> Self {
        Self {
            queue: BinaryHeap::new(),
            live: HashSet::new(),
            next_seq: 0,
            now: SimTime::ZERO,
        }
    }

    /// Schedule `event` at `at`; instants in the past run at the current time
    pub fn schedule_at(&mut self, at: SimTime, event: E) -> EventId {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Scheduled {
            at: at.max(self.now),
            seq,
            event,
        });
        self.live.insert(seq);
        EventId(seq)
    }

    /// Schedule `event` after `delay` from now
    pub fn schedule_in(&mut self, delay: Duration, event: E) -> EventId {
        self.schedule_at(self.now + delay, event)
    }

    /// Cancel a pending event; `false` if it already fired or was cancelled
    pub fn cancel(&mut self, id: EventId) -> bool {
        self.live.remove(&id.0)
    }

    /// Pop the next live event and advance the clock to it
    pub fn pop(&mut self) -> Option<(SimTime, E)> {
        while let Some(next) = self.queue.pop() {
            if self.live.remove(&next.seq) {
                self.now = next.at;
                return Some((next.at, next.event));
            }
        }
        None
    }

    /// Time of the next live event
    pub fn peek_time(&mut self) -> Option<SimTime> {
        while let Some(next) = self.queue.peek() {
            if self.live.contains(&next.seq) {
                return Some(next.at);
            }
            self.queue.pop();
        }
        None
    }

    /// Move the clock forward without running anything
    pub fn advance_to(&mut self, at: SimTime) {
        self.now = self.now.max(at);
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Live events still queued
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clock for Scheduler<E> {
    fn now(&self) -> SimTime {
        self.now
    }
}
