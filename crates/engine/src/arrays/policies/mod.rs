//! Replacement policy implementations for the set-associative arrays.

/// First In, First Out replacement.
pub mod fifo;
/// Least Recently Used replacement.
pub mod lru;

pub use fifo::FifoPolicy;
pub use lru::LruPolicy;

use crate::config::ReplacementPolicyKind;

/// Replacement policy over a `sets x ways` array.
///
/// Victim selection is advisory: the caller decides whether the returned way
/// is actually reclaimed (it may be skipped when it is mid-access or already
/// claimed in the current pass) and reports accesses back through `update`.
pub trait ReplacementPolicy {
    /// Records an access to `way` in `set`.
    fn update(&mut self, set: usize, way: usize);

    /// Picks the way to reclaim next in `set`.
    fn victim(&mut self, set: usize) -> usize;
}

/// Builds the configured policy for a `sets x ways` array.
pub fn make_policy(
    kind: ReplacementPolicyKind,
    sets: usize,
    ways: usize,
) -> Box<dyn ReplacementPolicy> {
    match kind {
        ReplacementPolicyKind::Lru => Box::new(LruPolicy::new(sets, ways)),
        ReplacementPolicyKind::Fifo => Box::new(FifoPolicy::new(sets, ways)),
    }
}
