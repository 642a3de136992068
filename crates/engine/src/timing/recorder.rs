//! Event recorder: arena ownership plus the one-record handoff slot.
//!
//! The recorder owns the event arena for a thread's requests and carries at
//! most one pending [`TimingRecord`] at a time: a collaborator that resolved
//! a nested request (an eviction writeback, a fill from the next level)
//! pushes its record, and the enclosing engine pops it immediately to splice
//! the sub-graph into its own DAG.

use super::event::{EventArena, EventId, EventKind};
use super::record::TimingRecord;

/// Owns the event arena and threads nested timing records between levels.
#[derive(Debug, Default)]
pub struct EventRecorder {
    arena: EventArena,
    pending: Option<TimingRecord>,
}

impl EventRecorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if a nested record is waiting to be consumed.
    pub fn has_record(&self) -> bool {
        self.pending.is_some()
    }

    /// Takes the pending record, leaving the slot empty.
    pub fn pop_record(&mut self) -> Option<TimingRecord> {
        self.pending.take()
    }

    /// Deposits a record for the enclosing level.
    ///
    /// # Panics
    ///
    /// Panics if a record is already pending: the enclosing engine must
    /// consume each record before the next collaborator call.
    pub fn push_record(&mut self, record: TimingRecord) {
        assert!(
            self.pending.is_none(),
            "timing record pushed over an unconsumed record"
        );
        self.pending = Some(record);
    }

    /// Allocates an event node in the arena.
    pub fn alloc(&mut self, kind: EventKind, delay: u64) -> EventId {
        self.arena.alloc(kind, delay)
    }

    /// Sets a node's explicit minimum start cycle.
    pub fn set_min_start_cycle(&mut self, ev: EventId, cycle: u64) {
        self.arena.set_min_start_cycle(ev, cycle);
    }

    /// Adds a causal edge and returns the child for chaining.
    pub fn add_child(&mut self, parent: EventId, child: EventId) -> EventId {
        self.arena.add_child(parent, child)
    }

    /// Borrows the arena, e.g. to resolve the realized schedule.
    pub fn arena(&self) -> &EventArena {
        &self.arena
    }
}
