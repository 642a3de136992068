//! First-In, First-Out (FIFO) Replacement Policy.
//!
//! Evicts the oldest entry in a set regardless of how recently it was
//! accessed, operating as a round-robin pointer per set.
//!
//! # Performance
//!
//! - `update()`: O(1)
//! - `victim()`: O(1)
//! - Space: O(S) where S is the number of sets

use super::ReplacementPolicy;

/// FIFO Policy state.
pub struct FifoPolicy {
    /// Tracks the next way to be evicted for each set.
    next_way: Vec<usize>,
    /// Number of ways in the array.
    ways: usize,
}

impl FifoPolicy {
    /// Creates a new FIFO policy instance.
    ///
    /// # Arguments
    ///
    /// * `sets` - The number of sets in the array.
    /// * `ways` - The associativity (number of ways) of the array.
    pub fn new(sets: usize, ways: usize) -> Self {
        Self {
            next_way: vec![0; sets],
            ways,
        }
    }
}

impl ReplacementPolicy for FifoPolicy {
    /// Advances the pointer when the accessed way matches it, preserving the
    /// first-in order as entries are filled.
    fn update(&mut self, set: usize, way: usize) {
        if self.next_way[set] == way {
            self.next_way[set] = (self.next_way[set] + 1) % self.ways;
        }
    }

    /// Returns the current round-robin pointer for the specified set.
    fn victim(&mut self, set: usize) -> usize {
        self.next_way[set]
    }
}
