//! Fingerprint index.
//!
//! A small set-associative directory from content fingerprints to data
//! slots, used by the simple bank to find duplicate lines in O(1) instead of
//! scanning the store. Entries are hints: they are never invalidated when a
//! slot is reallocated, so a lookup must be confirmed against the slot's
//! actual content (a stale hit is how collisions are detected).

use crate::common::SlotId;
use crate::config::ReplacementPolicyKind;

use super::policies::{make_policy, ReplacementPolicy};

#[derive(Debug, Clone)]
struct HashEntry {
    hash: u64,
    slot: SlotId,
    valid: bool,
}

/// Set-associative fingerprint-to-slot index.
pub struct FingerprintIndex {
    entries: Vec<HashEntry>,
    sets: usize,
    ways: usize,
    policy: Box<dyn ReplacementPolicy>,
}

impl FingerprintIndex {
    /// Creates an index of `lines` entries with `ways`-way sets.
    pub fn new(lines: usize, ways: usize, policy: ReplacementPolicyKind) -> Self {
        debug_assert!(lines % ways == 0);
        let sets = lines / ways;
        Self {
            entries: vec![
                HashEntry {
                    hash: 0,
                    slot: 0,
                    valid: false,
                };
                lines
            ],
            sets,
            ways,
            policy: make_policy(policy, sets, ways),
        }
    }

    #[inline]
    fn set_of(&self, hash: u64) -> usize {
        (hash % self.sets as u64) as usize
    }

    /// Looks up `hash`; refreshes recency when `update` is set. The returned
    /// slot is a hint and must be verified by the caller.
    pub fn lookup(&mut self, hash: u64, update: bool) -> Option<SlotId> {
        let set = self.set_of(hash);
        for way in 0..self.ways {
            let id = set * self.ways + way;
            if self.entries[id].valid && self.entries[id].hash == hash {
                if update {
                    self.policy.update(set, way);
                }
                return Some(self.entries[id].slot);
            }
        }
        None
    }

    /// Records `hash -> slot`, displacing the policy victim in its set.
    pub fn insert(&mut self, hash: u64, slot: SlotId) {
        let set = self.set_of(hash);
        let way = self.policy.victim(set);
        let id = set * self.ways + way;
        self.entries[id] = HashEntry {
            hash,
            slot,
            valid: true,
        };
        self.policy.update(set, way);
    }
}
