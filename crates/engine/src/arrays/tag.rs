//! Tag directory.
//!
//! The tag directory is the set-associative address side of a bank: each
//! entry maps a line address to its backing storage (a data slot in the
//! simple store, or an anchor segment plus encoding in the segmented store)
//! and carries the next-pointer of the sharing list it belongs to. Sharing
//! lists are singly linked through these next-pointers; the data side only
//! remembers each list's head.

use tracing::trace;

use crate::common::{LineAddr, SegmentId, SlotId, TagId};
use crate::config::ReplacementPolicyKind;
use crate::content::BdiEncoding;

use super::policies::{make_policy, ReplacementPolicy};

/// Result of removing a tag from its sharing list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlinkOutcome {
    /// The tag was the list's only member; its storage is now free.
    Freed,
    /// The tag was the head of a longer list; the named tag is the new head.
    NewHead(TagId),
    /// The tag was an interior or tail member; the head is unchanged.
    Interior,
}

#[derive(Debug, Clone)]
struct TagEntry {
    addr: LineAddr,
    valid: bool,
    slot: Option<SlotId>,
    segment: Option<SegmentId>,
    encoding: BdiEncoding,
    next: Option<TagId>,
}

impl TagEntry {
    fn empty() -> Self {
        Self {
            addr: LineAddr(0),
            valid: false,
            slot: None,
            segment: None,
            encoding: BdiEncoding::Uncompressed,
            next: None,
        }
    }
}

/// Set-associative tag directory shared by both bank variants.
pub struct TagArray {
    entries: Vec<TagEntry>,
    sets: usize,
    ways: usize,
    policy: Box<dyn ReplacementPolicy>,
    valid_lines: u32,
}

impl TagArray {
    /// Creates a directory of `lines` entries with `ways`-way sets.
    pub fn new(lines: usize, ways: usize, policy: ReplacementPolicyKind) -> Self {
        debug_assert!(lines % ways == 0);
        let sets = lines / ways;
        Self {
            entries: vec![TagEntry::empty(); lines],
            sets,
            ways,
            policy: make_policy(policy, sets, ways),
            valid_lines: 0,
        }
    }

    #[inline]
    fn set_of(&self, addr: LineAddr) -> usize {
        (addr.val() % self.sets as u64) as usize
    }

    /// Looks up `addr`; refreshes recency when `update` is set.
    pub fn lookup(&mut self, addr: LineAddr, update: bool) -> Option<TagId> {
        let set = self.set_of(addr);
        for way in 0..self.ways {
            let id = set * self.ways + way;
            if self.entries[id].valid && self.entries[id].addr == addr {
                if update {
                    self.policy.update(set, way);
                }
                return Some(id as TagId);
            }
        }
        None
    }

    /// Picks the entry `addr` would displace. Returns the victim tag and, if
    /// the victim currently holds a line, the address that must be evicted.
    pub fn select_victim(&mut self, addr: LineAddr) -> (TagId, Option<LineAddr>) {
        let set = self.set_of(addr);
        let way = self.policy.victim(set);
        let id = set * self.ways + way;
        let wb = self.entries[id].valid.then(|| self.entries[id].addr);
        (id as TagId, wb)
    }

    /// Installs `addr` into `tag`, recording its backing storage and splicing
    /// it in front of `next` in the sharing list. The entry must already have
    /// been invalidated (or never valid).
    pub fn commit(
        &mut self,
        tag: TagId,
        addr: LineAddr,
        slot: Option<SlotId>,
        segment: Option<SegmentId>,
        encoding: BdiEncoding,
        next: Option<TagId>,
        update: bool,
    ) {
        let e = &mut self.entries[tag as usize];
        debug_assert!(!e.valid, "tag {tag} committed while still valid");
        e.addr = addr;
        e.valid = true;
        e.slot = slot;
        e.segment = segment;
        e.encoding = encoding;
        e.next = next;
        self.valid_lines += 1;
        if update {
            let set = self.set_of(addr);
            self.policy.update(set, tag as usize % self.ways);
        }
    }

    /// Clears `tag`, releasing its directory entry. The caller is responsible
    /// for unlinking it from its sharing list first.
    pub fn invalidate(&mut self, tag: TagId) {
        let e = &mut self.entries[tag as usize];
        if e.valid {
            self.valid_lines -= 1;
            trace!(tag, addr = %e.addr, "tag invalidated");
        }
        *e = TagEntry::empty();
    }

    /// Overwrites the sharing-list next-pointer of `tag`.
    pub fn set_next(&mut self, tag: TagId, next: Option<TagId>) {
        self.entries[tag as usize].next = next;
    }

    /// Rewrites the storage binding of `tag` after a reallocation.
    pub fn rebind(
        &mut self,
        tag: TagId,
        slot: Option<SlotId>,
        segment: Option<SegmentId>,
        encoding: BdiEncoding,
        next: Option<TagId>,
    ) {
        let e = &mut self.entries[tag as usize];
        debug_assert!(e.valid, "rebind of invalid tag {tag}");
        e.slot = slot;
        e.segment = segment;
        e.encoding = encoding;
        e.next = next;
    }

    /// Removes `tag` from the sharing list headed by `head` and reports what
    /// the list looks like afterwards. The tag's own next-pointer is cleared.
    ///
    /// # Panics
    ///
    /// Panics if `tag` is not reachable from `head`; that means the directory
    /// and the data side disagree about list membership.
    pub fn unlink(&mut self, tag: TagId, head: TagId) -> UnlinkOutcome {
        if head == tag {
            let next = self.entries[tag as usize].next.take();
            return match next {
                None => UnlinkOutcome::Freed,
                Some(n) => UnlinkOutcome::NewHead(n),
            };
        }
        let mut cur = head;
        loop {
            let next = self.entries[cur as usize].next;
            match next {
                Some(n) if n == tag => {
                    let after = self.entries[tag as usize].next.take();
                    self.entries[cur as usize].next = after;
                    return UnlinkOutcome::Interior;
                }
                Some(n) => cur = n,
                None => panic!("tag {tag} not on sharing list headed by {head}"),
            }
        }
    }

    /// Sharing-list successor of `tag`.
    pub fn read_next(&self, tag: TagId) -> Option<TagId> {
        self.entries[tag as usize].next
    }

    /// Address held by `tag`.
    pub fn read_address(&self, tag: TagId) -> LineAddr {
        self.entries[tag as usize].addr
    }

    /// Data slot `tag` points at (simple store).
    pub fn read_slot(&self, tag: TagId) -> Option<SlotId> {
        self.entries[tag as usize].slot
    }

    /// Anchor segment `tag` points at (segmented store).
    pub fn read_segment(&self, tag: TagId) -> Option<SegmentId> {
        self.entries[tag as usize].segment
    }

    /// Stored encoding of the line `tag` holds (segmented store).
    pub fn read_encoding(&self, tag: TagId) -> BdiEncoding {
        self.entries[tag as usize].encoding
    }

    /// True if `tag` holds a line.
    pub fn is_valid(&self, tag: TagId) -> bool {
        self.entries[tag as usize].valid
    }

    /// Number of valid directory entries.
    pub fn valid_lines(&self) -> u32 {
        self.valid_lines
    }

    /// Total directory entries.
    pub fn num_lines(&self) -> usize {
        self.entries.len()
    }
}
