//! Deduplicated, compressed data store (segmented variant).
//!
//! Storage is organized as rows of 8-byte segments. A stored line is
//! anchored at one segment and accounted for by its compressed size; the
//! remaining bytes of the row are a shared budget, so a row holds more lines
//! the better they compress. Like the simple store, each anchored line
//! carries a reference count and the head of its sharing list.
//!
//! Space is accounting, not placement: occupancy of a row is the sum of the
//! compressed sizes of the lines anchored in it, and an allocation fits when
//! that sum plus the new line's size stays within the row budget.

use tracing::trace;

use crate::common::{SegmentId, SlotId, TagId};

#[derive(Debug, Clone)]
struct Segment {
    ref_count: u32,
    head: Option<TagId>,
    content: Option<Box<[u8]>>,
    last_use: u64,
}

impl Segment {
    fn empty() -> Self {
        Self {
            ref_count: 0,
            head: None,
            content: None,
            last_use: 0,
        }
    }
}

/// Row-of-segments line store with compressed-size accounting.
pub struct BdiDataArray {
    rows: Vec<Vec<Segment>>,
    segments_per_row: usize,
    line_bytes: usize,
    assoc: usize,
    tick: u64,
    row_last_use: Vec<u64>,
}

impl BdiDataArray {
    /// Creates a store equivalent to `lines` uncompressed lines grouped
    /// `assoc` to a row.
    pub fn new(lines: usize, assoc: usize, line_bytes: usize) -> Self {
        debug_assert!(lines % assoc == 0);
        let num_rows = lines / assoc;
        let segments_per_row = assoc * line_bytes / crate::common::SEGMENT_BYTES;
        Self {
            rows: vec![vec![Segment::empty(); segments_per_row]; num_rows],
            segments_per_row,
            line_bytes,
            assoc,
            tick: 0,
            row_last_use: vec![0; num_rows],
        }
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Segments per row.
    pub fn segments_per_row(&self) -> usize {
        self.segments_per_row
    }

    /// Byte budget of one row.
    pub fn row_capacity_bytes(&self) -> u64 {
        (self.assoc * self.line_bytes) as u64
    }

    /// Refreshes recency of a segment and its row.
    pub fn touch(&mut self, row: SlotId, seg: SegmentId) {
        self.tick += 1;
        self.rows[row as usize][seg as usize].last_use = self.tick;
        self.row_last_use[row as usize] = self.tick;
    }

    /// Picks the least recently used row for a new allocation.
    pub fn select_victim_row(&self) -> SlotId {
        let mut best = 0usize;
        for (i, &t) in self.row_last_use.iter().enumerate() {
            if t < self.row_last_use[best] {
                best = i;
            }
        }
        best as SlotId
    }

    /// Picks the next segment to claim in `row`, skipping segments in `keep`.
    /// Free segments are preferred (claiming one costs no eviction); among
    /// occupied segments the least recently used wins.
    ///
    /// # Panics
    ///
    /// Panics when every segment of the row is in `keep`; the allocation
    /// loop guarantees `keep` never grows that large.
    pub fn select_victim_segment(&self, row: SlotId, keep: &[SegmentId]) -> SegmentId {
        let segs = &self.rows[row as usize];
        let mut victim: Option<usize> = None;
        for (i, s) in segs.iter().enumerate() {
            if keep.contains(&(i as SegmentId)) {
                continue;
            }
            if s.ref_count == 0 {
                return i as SegmentId;
            }
            match victim {
                Some(v) if segs[v].last_use <= s.last_use => {}
                _ => victim = Some(i),
            }
        }
        match victim {
            Some(v) => v as SegmentId,
            None => panic!("no reclaimable segment in row {row}"),
        }
    }

    /// Scans the whole store for an anchored line with this exact content.
    pub fn find_match(&self, content: &[u8]) -> Option<(SlotId, SegmentId)> {
        for (r, row) in self.rows.iter().enumerate() {
            for (s, seg) in row.iter().enumerate() {
                if seg.ref_count > 0 && self.is_same(r as SlotId, s as SegmentId, content) {
                    return Some((r as SlotId, s as SegmentId));
                }
            }
        }
        None
    }

    /// Byte-compares `content` against the line anchored at `(row, seg)`.
    pub fn is_same(&self, row: SlotId, seg: SegmentId, content: &[u8]) -> bool {
        match &self.rows[row as usize][seg as usize].content {
            Some(stored) => &**stored == content,
            None => false,
        }
    }

    /// Anchors a line at `(row, seg)` with `first_tag` heading a list of
    /// `ref_count` sharers, writing `content` when provided.
    pub fn commit(
        &mut self,
        row: SlotId,
        seg: SegmentId,
        first_tag: TagId,
        ref_count: u32,
        content: Option<&[u8]>,
        update: bool,
    ) {
        debug_assert!(ref_count >= 1);
        let s = &mut self.rows[row as usize][seg as usize];
        s.ref_count = ref_count;
        s.head = Some(first_tag);
        if let Some(data) = content {
            debug_assert_eq!(data.len(), self.line_bytes);
            match &mut s.content {
                Some(buf) => buf.copy_from_slice(data),
                None => s.content = Some(data.to_vec().into_boxed_slice()),
            }
        }
        if update {
            self.touch(row, seg);
        }
    }

    /// Rewrites the sharer count and list head of an anchored line.
    pub fn change_ref(&mut self, row: SlotId, seg: SegmentId, new_head: TagId, ref_count: u32) {
        debug_assert!(ref_count >= 1);
        let s = &mut self.rows[row as usize][seg as usize];
        debug_assert!(s.ref_count > 0, "change_ref on free segment {row}/{seg}");
        s.ref_count = ref_count;
        s.head = Some(new_head);
    }

    /// Releases the anchor at `(row, seg)`.
    pub fn free(&mut self, row: SlotId, seg: SegmentId) {
        let s = &mut self.rows[row as usize][seg as usize];
        if s.ref_count > 0 {
            trace!(row, seg, "segment anchor freed");
        }
        s.ref_count = 0;
        s.head = None;
        s.content = None;
    }

    /// Sharer count of `(row, seg)`; zero means free.
    pub fn read_ref_count(&self, row: SlotId, seg: SegmentId) -> u32 {
        self.rows[row as usize][seg as usize].ref_count
    }

    /// Head of the sharing list anchored at `(row, seg)`.
    pub fn read_head(&self, row: SlotId, seg: SegmentId) -> Option<TagId> {
        self.rows[row as usize][seg as usize].head
    }

    /// Bytes occupied in `row`, summing `size_of(head)` over its anchors.
    pub fn occupied_bytes(&self, row: SlotId, size_of: impl Fn(TagId) -> u64) -> u64 {
        self.rows[row as usize]
            .iter()
            .filter_map(|s| s.head)
            .map(size_of)
            .sum()
    }

    /// Segments occupied across the store, summing `segs_of(head)` over all
    /// anchors.
    pub fn occupied_segments(&self, segs_of: impl Fn(TagId) -> u64) -> u64 {
        self.rows
            .iter()
            .flatten()
            .filter_map(|s| s.head)
            .map(segs_of)
            .sum()
    }

    /// Number of anchored lines.
    pub fn valid_lines(&self) -> u32 {
        self.rows
            .iter()
            .flatten()
            .filter(|s| s.ref_count > 0)
            .count() as u32
    }
}
