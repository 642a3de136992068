//! Deduplicated data store (simple variant).
//!
//! One slot per storable line, fully associative. A slot carries the line
//! content, a reference count, and the head of the sharing list of tags that
//! map to it. Slots with a zero count are free; their stale content is
//! harmless because every commit rewrites it.

use tracing::trace;

use crate::common::{SlotId, TagId};
use crate::config::ReplacementPolicyKind;

use super::policies::{make_policy, ReplacementPolicy};

#[derive(Debug, Clone)]
struct DataSlot {
    ref_count: u32,
    head: Option<TagId>,
    content: Box<[u8]>,
}

/// Fully associative, reference-counted line store.
pub struct DedupDataArray {
    slots: Vec<DataSlot>,
    line_bytes: usize,
    policy: Box<dyn ReplacementPolicy>,
    valid_lines: u32,
}

impl DedupDataArray {
    /// Creates a store of `lines` slots holding `line_bytes`-byte lines.
    pub fn new(lines: usize, line_bytes: usize, policy: ReplacementPolicyKind) -> Self {
        let slot = DataSlot {
            ref_count: 0,
            head: None,
            content: vec![0u8; line_bytes].into_boxed_slice(),
        };
        Self {
            slots: vec![slot; lines],
            line_bytes,
            policy: make_policy(policy, 1, lines),
            valid_lines: 0,
        }
    }

    /// Picks the slot to reclaim next. Returns the slot and, when occupied,
    /// the head of the sharing list that must be evicted first.
    pub fn select_victim(&mut self) -> (SlotId, Option<TagId>) {
        let way = self.policy.victim(0);
        (way as SlotId, self.slots[way].head)
    }

    /// Refreshes recency of `slot` when `update` is set.
    pub fn touch(&mut self, slot: SlotId, update: bool) {
        if update {
            self.policy.update(0, slot as usize);
        }
    }

    /// Installs a line into `slot` with `first_tag` heading a list of
    /// `ref_count` sharers, writing `content` when provided.
    pub fn commit(
        &mut self,
        slot: SlotId,
        first_tag: TagId,
        ref_count: u32,
        content: Option<&[u8]>,
        update: bool,
    ) {
        debug_assert!(ref_count >= 1);
        let s = &mut self.slots[slot as usize];
        if s.ref_count == 0 {
            self.valid_lines += 1;
        }
        s.ref_count = ref_count;
        s.head = Some(first_tag);
        if let Some(data) = content {
            debug_assert_eq!(data.len(), self.line_bytes);
            s.content.copy_from_slice(data);
        }
        self.touch(slot, update);
    }

    /// Rewrites the sharer count and list head of an occupied slot without
    /// touching its content.
    pub fn change_ref(&mut self, slot: SlotId, new_head: TagId, ref_count: u32) {
        debug_assert!(ref_count >= 1);
        let s = &mut self.slots[slot as usize];
        debug_assert!(s.ref_count > 0, "change_ref on free slot {slot}");
        s.ref_count = ref_count;
        s.head = Some(new_head);
    }

    /// Releases `slot`; its count drops to zero and its head is cleared.
    pub fn free(&mut self, slot: SlotId) {
        let s = &mut self.slots[slot as usize];
        if s.ref_count > 0 {
            self.valid_lines -= 1;
            trace!(slot, "data slot freed");
        }
        s.ref_count = 0;
        s.head = None;
    }

    /// Overwrites the content of an occupied slot in place.
    pub fn write_content(&mut self, slot: SlotId, content: &[u8]) {
        debug_assert_eq!(content.len(), self.line_bytes);
        self.slots[slot as usize].content.copy_from_slice(content);
    }

    /// Byte-compares `content` against what `slot` stores.
    pub fn is_same(&self, slot: SlotId, content: &[u8]) -> bool {
        &*self.slots[slot as usize].content == content
    }

    /// Sharer count of `slot`; zero means free.
    pub fn read_ref_count(&self, slot: SlotId) -> u32 {
        self.slots[slot as usize].ref_count
    }

    /// Head of the sharing list of `slot`.
    pub fn read_head(&self, slot: SlotId) -> Option<TagId> {
        self.slots[slot as usize].head
    }

    /// Number of occupied slots.
    pub fn valid_lines(&self) -> u32 {
        self.valid_lines
    }

    /// Total slots.
    pub fn num_lines(&self) -> usize {
        self.slots.len()
    }
}
