//! Least Recently Used (LRU) Replacement Policy.
//!
//! Evicts the entry that has not been accessed for the longest time. Each set
//! keeps a usage stack: an access moves the way to the top (MRU position) and
//! the bottom of the stack is the victim.
//!
//! # Performance
//!
//! - `update()`: O(W) where W is the number of ways
//! - `victim()`: O(1)
//! - Space: O(S × W) where S is the number of sets

use super::ReplacementPolicy;

/// LRU Policy state.
pub struct LruPolicy {
    /// A vector of usage stacks (one per set).
    /// Index 0 is MRU, last index is LRU.
    usage: Vec<Vec<usize>>,
}

impl LruPolicy {
    /// Creates a new LRU policy instance.
    ///
    /// # Arguments
    ///
    /// * `sets` - The number of sets in the array.
    /// * `ways` - The associativity (number of ways) of the array.
    pub fn new(sets: usize, ways: usize) -> Self {
        let mut usage = Vec::with_capacity(sets);
        for _ in 0..sets {
            usage.push((0..ways).collect());
        }
        Self { usage }
    }
}

impl ReplacementPolicy for LruPolicy {
    /// Moves the accessed `way` to the front of the usage stack (MRU
    /// position), shifting other elements down.
    fn update(&mut self, set: usize, way: usize) {
        let stack = &mut self.usage[set];
        if let Some(pos) = stack.iter().position(|&x| x == way) {
            let _ = stack.remove(pos);
        }
        stack.insert(0, way);
    }

    /// Returns the way at the bottom of the usage stack (LRU position).
    fn victim(&mut self, set: usize) -> usize {
        self.usage[set][self.usage[set].len() - 1]
    }
}
