//! Deduplicating, compressing bank (segmented variant).
//!
//! Same state machine as the simple bank with two structural differences:
//!
//! 1. **No fingerprint index.** Content matching is a linear scan over the
//!    anchored lines, modeling an ideal content-addressable store.
//! 2. **Segmented storage.** Lines live in rows of 8-byte segments and are
//!    accounted at their compressed size, so allocation is a free-space
//!    search: victim segments are claimed one per round (each bringing its
//!    whole sharing list's eviction) until the accumulated free bytes cover
//!    the new line's encoded size.
//!
//! Because stored sizes change under writes, a content-changing write hit
//! never overwrites in place; it detaches and reallocates through the same
//! free-space loop.

use tracing::{debug, trace};

use crate::arrays::{BdiDataArray, TagArray, UnlinkOutcome};
use crate::common::{ConfigError, LineAddr, SegmentId, SlotId, TagId, SEGMENT_BYTES};
use crate::config::BankConfig;
use crate::content::{canonicalize, compress};
use crate::mem::{AccessType, MemReq};
use crate::stats::{BankStats, RunningStats};
use crate::timing::{build_hit_graph, build_miss_graph, TimingRecord, WritebackSplice};

use super::context::{SimContext, WritebackResume};

/// Segmented deduplicating cache bank with BDI size accounting.
pub struct DedupBdiBank {
    name: String,
    line_bytes: usize,
    data_lines: usize,
    acc_lat: u64,
    inv_lat: u64,
    tags: TagArray,
    data: BdiDataArray,
    stats: BankStats,
    /// Valid tags per stored line: the deduplication factor.
    dedup_factor: RunningStats,
    /// Occupied segments per stored line: the compression factor.
    stored_segments: RunningStats,
    wb_port_free: u64,
}

impl DedupBdiBank {
    /// Builds a bank from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the geometry is inconsistent.
    pub fn new(cfg: &BankConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self {
            name: cfg.name.clone(),
            line_bytes: cfg.line_bytes,
            data_lines: cfg.data_lines,
            acc_lat: cfg.acc_latency,
            inv_lat: cfg.inv_latency,
            tags: TagArray::new(cfg.tag_lines, cfg.tag_ways, cfg.policy),
            data: BdiDataArray::new(cfg.data_lines, cfg.data_ways, cfg.line_bytes),
            stats: BankStats::new(&cfg.name),
            dedup_factor: RunningStats::new(format!("{} dedup factor", cfg.name)),
            stored_segments: RunningStats::new(format!("{} segments per line", cfg.name)),
            wb_port_free: 0,
        })
    }

    /// Bank name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Statistics collected so far.
    pub fn stats(&self) -> &BankStats {
        &self.stats
    }

    /// Deduplication-factor aggregate (valid tags per stored line).
    pub fn dedup_factor(&self) -> &RunningStats {
        &self.dedup_factor
    }

    /// Compression aggregate (occupied segments per stored line).
    pub fn stored_segments(&self) -> &RunningStats {
        &self.stored_segments
    }

    /// Tag directory, exposed read-only for consistency checks.
    pub fn tags(&self) -> &TagArray {
        &self.tags
    }

    /// Data store, exposed read-only for consistency checks.
    pub fn data(&self) -> &BdiDataArray {
        &self.data
    }

    /// Resolves one request and returns its response cycle.
    ///
    /// # Panics
    ///
    /// Panics on invariant violations; see the exit assertions at the end,
    /// which bound valid tags and occupied segments on every access.
    pub fn access(&mut self, req: &mut MemReq, ctx: &mut SimContext<'_>) -> u64 {
        let mut resp_cycle = req.cycle;
        let mut evictions = 0u64;

        let skip = ctx.cc.start_access(req);
        if !skip {
            let update = req.kind.is_demand();
            let tag_hit = self.tags.lookup(req.line_addr, update);
            resp_cycle += self.acc_lat;

            let mut line = vec![0u8; self.line_bytes];
            ctx.read_line(req.line_addr, &mut line);
            let real = ctx.resolve_addr(req.line_addr);
            if let Some(dtype) = ctx.regions.classify(real, self.line_bytes) {
                canonicalize(&mut line, dtype);
            }

            let (record, resp) = match tag_hit {
                None => self.miss(req, &line, update, resp_cycle, ctx, &mut evictions),
                Some(tag) => self.hit(tag, req, &line, update, resp_cycle, ctx, &mut evictions),
            };
            resp_cycle = resp;
            ctx.recorder.push_record(record);
        } else {
            trace!(bank = %self.name, addr = %req.line_addr, "access skipped");
        }
        ctx.cc.end_access(req);

        self.sample_occupancy(req, evictions);
        self.stats.counters.evictions += evictions;
        assert!(
            resp_cycle >= req.cycle,
            "[{}] resp {resp_cycle} < req {} for {} to {}",
            self.name,
            req.cycle,
            req.kind.name(),
            req.line_addr,
        );
        resp_cycle
    }

    /// Drops `addr` from the bank, releasing its storage reference.
    /// Returns the cycle the invalidation completes.
    pub fn invalidate(&mut self, addr: LineAddr, cycle: u64) -> u64 {
        if let Some(tag) = self.tags.lookup(addr, false) {
            self.release_storage(tag);
            self.tags.invalidate(tag);
        }
        cycle + self.inv_lat
    }

    /// Retries a deferred hit writeback, requeuing one cycle later while the
    /// low-priority storage port is busy.
    pub fn resume_hit_writeback(&mut self, cycle: u64) -> WritebackResume {
        if cycle >= self.wb_port_free {
            self.wb_port_free = cycle + self.acc_lat;
            WritebackResume::Done(cycle)
        } else {
            WritebackResume::Retry(cycle + 1)
        }
    }

    /// Encoded size in bytes of the line held by `tag`.
    fn size_of(&self, tag: TagId) -> u64 {
        u64::from(self.tags.read_encoding(tag).size_bytes(self.line_bytes))
    }

    /// Unlinks `tag` from its sharing list; frees the anchor when it was the
    /// last sharer.
    fn release_storage(&mut self, tag: TagId) {
        let (Some(row), Some(seg)) = (self.tags.read_slot(tag), self.tags.read_segment(tag))
        else {
            return;
        };
        self.detach(tag, row, seg, true);
    }

    /// Removes `tag` from the list anchored at `(row, seg)` and fixes up the
    /// anchor. `allow_free` is false on paths where the caller has already
    /// established the list has other sharers.
    fn detach(&mut self, tag: TagId, row: SlotId, seg: SegmentId, allow_free: bool) {
        let Some(head) = self.data.read_head(row, seg) else {
            panic!("[{}] tag {tag} references free segment {row}/{seg}", self.name)
        };
        let count = self.data.read_ref_count(row, seg);
        match self.tags.unlink(tag, head) {
            UnlinkOutcome::Freed => {
                assert!(
                    allow_free,
                    "[{}] segment {row}/{seg} with {count} sharers freed by one unlink",
                    self.name
                );
                self.data.free(row, seg);
            }
            UnlinkOutcome::NewHead(h) => self.data.change_ref(row, seg, h, count - 1),
            UnlinkOutcome::Interior => self.data.change_ref(row, seg, head, count - 1),
        }
    }

    /// Claims segments in `row` until the free bytes cover `need`, evicting
    /// each claimed anchor's full sharing list. Segments claimed earlier in
    /// the pass are excluded from later rounds, and `skip` (the tag being
    /// re-homed, if any) is never evicted. Returns the anchor segment for the
    /// new line and the completion cycle of the last eviction.
    ///
    /// Runs at least one round even when space is already free: the new line
    /// still needs an anchor segment of its own.
    #[allow(clippy::too_many_arguments)]
    fn alloc_in_row(
        &mut self,
        req: &MemReq,
        row: SlotId,
        need: u64,
        mut ev_begin: u64,
        mut last_ev_done: u64,
        skip: Option<TagId>,
        ctx: &mut SimContext<'_>,
        writebacks: &mut Vec<WritebackSplice>,
        evictions: &mut u64,
    ) -> (SegmentId, u64) {
        let mut keep: Vec<SegmentId> = Vec::new();
        loop {
            let occupied = self.data.occupied_bytes(row, |t| self.size_of(t));
            let mut free = self.data.row_capacity_bytes() - occupied;
            let victim_seg = self.data.select_victim_segment(row, &keep);
            if let Some(head) = self.data.read_head(row, victim_seg) {
                free += self.size_of(head);
                debug!(bank = %self.name, row, seg = victim_seg, "reclaiming anchored segment");
            }
            keep.push(victim_seg);

            let mut head = self.data.read_head(row, victim_seg);
            while let Some(victim) = head {
                head = self.tags.read_next(victim);
                if Some(victim) == skip {
                    continue;
                }
                let wb_addr = self.tags.read_address(victim);
                let done = ctx.cc.process_eviction(req, wb_addr, victim, ev_begin, ctx.recorder);
                self.tags.invalidate(victim);
                if let Some(record) = ctx.recorder.pop_record() {
                    *evictions += 1;
                    writebacks.push(WritebackSplice {
                        record: Some(record),
                        start_cycle: ev_begin,
                        end_cycle: done,
                    });
                    last_ev_done = done;
                    ev_begin += self.acc_lat;
                }
            }
            self.data.free(row, victim_seg);

            if free >= need {
                return (keep[0], last_ev_done);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn miss(
        &mut self,
        req: &MemReq,
        line: &[u8],
        update: bool,
        resp_cycle: u64,
        ctx: &mut SimContext<'_>,
        evictions: &mut u64,
    ) -> (TimingRecord, u64) {
        assert!(ctx.cc.should_allocate(req));
        self.stats.counters.tag_misses += 1;
        let evict_cycle = req.cycle + self.acc_lat;

        let (victim_tag, wb_addr) = self.tags.select_victim(req.line_addr);
        let mut tag_ev_done = 0u64;
        let mut tag_wb_record = None;
        if let Some(wb) = wb_addr {
            debug!(bank = %self.name, addr = %wb, "evicting tag victim");
            tag_ev_done = ctx.cc.process_eviction(req, wb, victim_tag, evict_cycle, ctx.recorder);
            self.release_storage(victim_tag);
            if let Some(record) = ctx.recorder.pop_record() {
                *evictions += 1;
                tag_wb_record = Some(record);
            }
        }
        self.tags.invalidate(victim_tag);

        let mut data_done = resp_cycle;
        let resp_cycle =
            ctx.cc
                .process_access(req, victim_tag, resp_cycle, &mut data_done, ctx.recorder);
        let access_record = ctx.recorder.pop_record();
        debug_assert_eq!(data_done, resp_cycle);

        let (encoding, size) = compress(line);

        let (start, end) = match self.data.find_match(line) {
            Some((row, seg)) => {
                trace!(bank = %self.name, row, seg, "miss shares an anchored line");
                let old_head = self.data.read_head(row, seg);
                let count = self.data.read_ref_count(row, seg);
                self.tags.commit(
                    victim_tag,
                    req.line_addr,
                    Some(row),
                    Some(seg),
                    encoding,
                    old_head,
                    true,
                );
                self.data.commit(row, seg, victim_tag, count + 1, None, update);
                self.stats.counters.miss_shared += 1;
                build_miss_graph(
                    ctx.recorder,
                    self.acc_lat,
                    req.cycle,
                    resp_cycle,
                    tag_ev_done,
                    resp_cycle.max(tag_ev_done),
                    access_record.as_ref(),
                    tag_wb_record.as_ref(),
                    &[],
                )
            }
            None => {
                let ev_cycle = resp_cycle + self.acc_lat;
                let row = self.data.select_victim_row();
                let mut writebacks = Vec::new();
                let (anchor, last_ev_done) = self.alloc_in_row(
                    req,
                    row,
                    u64::from(size),
                    ev_cycle,
                    tag_ev_done,
                    None,
                    ctx,
                    &mut writebacks,
                    evictions,
                );
                self.tags.commit(
                    victim_tag,
                    req.line_addr,
                    Some(row),
                    Some(anchor),
                    encoding,
                    None,
                    update,
                );
                self.data.commit(row, anchor, victim_tag, 1, Some(line), update);
                self.stats.counters.miss_allocated += 1;
                build_miss_graph(
                    ctx.recorder,
                    self.acc_lat,
                    req.cycle,
                    resp_cycle,
                    tag_ev_done,
                    last_ev_done.max(tag_ev_done),
                    access_record.as_ref(),
                    tag_wb_record.as_ref(),
                    &writebacks,
                )
            }
        };

        let record = TimingRecord {
            addr: req.line_addr,
            req_cycle: req.cycle,
            resp_cycle,
            kind: req.kind,
            start,
            end,
        };
        (record, resp_cycle)
    }

    #[allow(clippy::too_many_arguments)]
    fn hit(
        &mut self,
        tag: TagId,
        req: &MemReq,
        line: &[u8],
        update: bool,
        mut resp_cycle: u64,
        ctx: &mut SimContext<'_>,
        evictions: &mut u64,
    ) -> (TimingRecord, u64) {
        self.stats.counters.tag_hits += 1;
        let (Some(row), Some(seg)) = (self.tags.read_slot(tag), self.tags.read_segment(tag))
        else {
            panic!("[{}] hit tag {tag} has no anchor", self.name)
        };

        if req.kind == AccessType::PutX && !self.data.is_same(row, seg, line) {
            return self.write_hit(tag, row, seg, req, line, update, resp_cycle, ctx, evictions);
        }

        // Read hit, clean writeback, or a write that left content unchanged.
        if update {
            self.data.touch(row, seg);
        }
        self.stats.counters.clean_hits += 1;
        resp_cycle += self.acc_lat;
        let mut data_done = resp_cycle;
        let resp_cycle = ctx
            .cc
            .process_access(req, tag, resp_cycle, &mut data_done, ctx.recorder);
        let _ = ctx.recorder.pop_record();
        let he = build_hit_graph(ctx.recorder, self.acc_lat, req.cycle, resp_cycle, None);
        let record = TimingRecord {
            addr: req.line_addr,
            req_cycle: req.cycle,
            resp_cycle,
            kind: req.kind,
            start: he,
            end: he,
        };
        (record, resp_cycle)
    }

    /// Content-changing write hit. Attaches to a matching anchored line when
    /// one exists; otherwise detaches and reallocates through the free-space
    /// loop (stored sizes change with content, so there is no in-place
    /// overwrite in the segmented store).
    #[allow(clippy::too_many_arguments)]
    fn write_hit(
        &mut self,
        tag: TagId,
        row: SlotId,
        seg: SegmentId,
        req: &MemReq,
        line: &[u8],
        update: bool,
        mut resp_cycle: u64,
        ctx: &mut SimContext<'_>,
        evictions: &mut u64,
    ) -> (TimingRecord, u64) {
        let (encoding, size) = compress(line);
        let old_count = self.data.read_ref_count(row, seg);

        if let Some((trow, tseg)) = self.data.find_match(line) {
            trace!(bank = %self.name, row = trow, seg = tseg, "write hit attaches to a match");
            resp_cycle += self.acc_lat;
            self.detach(tag, row, seg, true);
            let old_head = self.data.read_head(trow, tseg);
            let count = self.data.read_ref_count(trow, tseg);
            self.tags
                .rebind(tag, Some(trow), Some(tseg), encoding, old_head);
            self.data.commit(trow, tseg, tag, count + 1, None, update);
            self.stats.counters.write_hit_shared += 1;

            let mut data_done = resp_cycle;
            let resp_cycle = ctx
                .cc
                .process_access(req, tag, resp_cycle, &mut data_done, ctx.recorder);
            let _ = ctx.recorder.pop_record();
            let he = build_hit_graph(ctx.recorder, self.acc_lat, req.cycle, resp_cycle, None);
            let record = TimingRecord {
                addr: req.line_addr,
                req_cycle: req.cycle,
                resp_cycle,
                kind: req.kind,
                start: he,
                end: he,
            };
            return (record, resp_cycle);
        }

        // No match: detach and reallocate. A single-sharer unlink may free
        // the old anchor; a multi-sharer unlink must not.
        self.detach(tag, row, seg, old_count == 1);
        self.stats.counters.write_hit_realloc += 1;

        let ev_cycle = req.cycle + 2 * self.acc_lat;
        let victim_row = self.data.select_victim_row();
        let mut writebacks = Vec::new();
        let (anchor, last_ev_done) = self.alloc_in_row(
            req,
            victim_row,
            u64::from(size),
            ev_cycle,
            ev_cycle,
            Some(tag),
            ctx,
            &mut writebacks,
            evictions,
        );
        resp_cycle = resp_cycle.max(last_ev_done);
        self.tags
            .rebind(tag, Some(victim_row), Some(anchor), encoding, None);
        self.data
            .commit(victim_row, anchor, tag, 1, Some(line), update);

        let mut data_done = resp_cycle;
        let resp_cycle = ctx
            .cc
            .process_access(req, tag, resp_cycle, &mut data_done, ctx.recorder);
        let _ = ctx.recorder.pop_record();

        let he = build_hit_graph(
            ctx.recorder,
            self.acc_lat,
            req.cycle,
            resp_cycle,
            Some((last_ev_done, writebacks.as_slice())),
        );
        self.wb_port_free = self.wb_port_free.max(last_ev_done.max(resp_cycle));
        let record = TimingRecord {
            addr: req.line_addr,
            req_cycle: req.cycle,
            resp_cycle,
            kind: req.kind,
            start: he,
            end: he,
        };
        (record, resp_cycle)
    }

    /// Feeds the end-of-access aggregates and checks the occupancy bounds.
    #[allow(clippy::cast_precision_loss)]
    fn sample_occupancy(&mut self, req: &MemReq, evictions: u64) {
        let segs_per_line = (self.line_bytes / SEGMENT_BYTES) as u64;
        let occupied_segments = self
            .data
            .occupied_segments(|t| u64::from(self.tags.read_encoding(t).segments(self.line_bytes)));
        let valid_tags = u64::from(self.tags.valid_lines());
        let stored_lines = u64::from(self.data.valid_lines());

        assert!(
            valid_tags >= occupied_segments / segs_per_line,
            "[{}] fewer tags ({valid_tags}) than stored line-equivalents ({occupied_segments} segments)",
            self.name
        );
        assert!(valid_tags <= self.tags.num_lines() as u64);
        assert!(occupied_segments <= (self.data_lines as u64) * segs_per_line);

        let line_equiv = occupied_segments as f64 / segs_per_line as f64;
        self.stats
            .compression
            .add(line_equiv / valid_tags as f64, 1.0);
        if req.kind != AccessType::PutS {
            self.stats.evictions.add(evictions as f64, 1.0);
        }
        self.stats
            .data_utilization
            .add(line_equiv / self.data_lines as f64, 1.0);
        self.stats
            .tag_utilization
            .add(valid_tags as f64 / self.tags.num_lines() as f64, 1.0);
        self.dedup_factor
            .add(valid_tags as f64 / stored_lines as f64, 1.0);
        self.stored_segments
            .add(occupied_segments as f64 / stored_lines as f64, 1.0);
    }
}
