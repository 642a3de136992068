//! Mock implementations of the bank's external collaborators.

/// Line-content source backed by a hash map.
pub mod memory;

pub use coherence::ScriptedCoherence;
pub use memory::ScriptedMemory;
