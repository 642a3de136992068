//! Deduplicating bank (simple variant).
//!
//! One access engine instance models one bank: a tag directory in front of a
//! reference-counted data store, with a fingerprint index to shortcut content
//! matching. Every request resolves through the same state machine:
//!
//! 1. **TagLookup** against the directory (recency refreshed on demand
//!    fetches only).
//! 2. **Miss**: evict a tag victim through the coherence controller, release
//!    its data reference, fetch and canonicalize the line, then resolve the
//!    content to a share, a collide-recover, or a fresh allocation with its
//!    eviction cascade.
//! 3. **Hit**: reads and content-preserving writes just refresh state; a
//!    content-changing write overwrites in place, attaches to a match, or
//!    detaches from its sharing list and reallocates.
//! 4. **Commit**: directory and store are updated together; no request ever
//!    observes them disagreeing.
//!
//! Alongside the state changes the engine emits a per-request timing DAG and
//! returns the response cycle, which is never before the request cycle.

use tracing::{debug, trace};

use crate::arrays::{DedupDataArray, FingerprintIndex, TagArray, UnlinkOutcome};
use crate::common::{ConfigError, SlotId, TagId};
use crate::config::BankConfig;
use crate::content::{canonicalize, fingerprint, BdiEncoding};
use crate::mem::{AccessType, MemReq};
use crate::stats::BankStats;
use crate::timing::{build_hit_graph, build_miss_graph, TimingRecord, WritebackSplice};

use super::context::{SimContext, WritebackResume};

/// How canonical content resolved against the store.
enum ContentMatch {
    /// Identical content in a live slot; attach to its sharing list.
    Share(SlotId),
    /// Fingerprint points at a slot whose list is empty; take it over.
    Recover(SlotId),
    /// Nothing matched; allocation required.
    NoMatch,
}

/// Simple deduplicating cache bank.
pub struct DedupBank {
    name: String,
    line_bytes: usize,
    acc_lat: u64,
    inv_lat: u64,
    tags: TagArray,
    data: DedupDataArray,
    index: FingerprintIndex,
    stats: BankStats,
    /// Cycle the low-priority writeback port frees up.
    wb_port_free: u64,
}

impl DedupBank {
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
            acc_lat: cfg.acc_latency,
            inv_lat: cfg.inv_latency,
            tags: TagArray::new(cfg.tag_lines, cfg.tag_ways, cfg.policy),
            data: DedupDataArray::new(cfg.data_lines, cfg.line_bytes, cfg.policy),
            index: FingerprintIndex::new(cfg.hash_lines, cfg.hash_ways, cfg.policy),
            stats: BankStats::new(&cfg.name),
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

    /// Tag directory, exposed read-only for consistency checks.
    pub fn tags(&self) -> &TagArray {
        &self.tags
    }

    /// Data store, exposed read-only for consistency checks.
    pub fn data(&self) -> &DedupDataArray {
        &self.data
    }

    /// Resolves one request and returns its response cycle.
    ///
    /// # Panics
    ///
    /// Panics on invariant violations: a response earlier than the request,
    /// an unreachable tag in a cascade, or directory/store disagreement.
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
            let hash = fingerprint(&line);

            let (record, resp) = match tag_hit {
                None => self.miss(req, &line, hash, update, resp_cycle, ctx, &mut evictions),
                Some(tag) => self.hit(tag, req, &line, hash, update, resp_cycle, ctx, &mut evictions),
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
    pub fn invalidate(&mut self, addr: crate::common::LineAddr, cycle: u64) -> u64 {
        if let Some(tag) = self.tags.lookup(addr, false) {
            self.release_storage(tag);
            self.tags.invalidate(tag);
        }
        cycle + self.inv_lat
    }

    /// Retries a deferred hit writeback. The writeback retires when a
    /// low-priority storage port is free, otherwise it requeues one cycle
    /// later.
    pub fn resume_hit_writeback(&mut self, cycle: u64) -> WritebackResume {
        if cycle >= self.wb_port_free {
            self.wb_port_free = cycle + self.acc_lat;
            WritebackResume::Done(cycle)
        } else {
            WritebackResume::Retry(cycle + 1)
        }
    }

    /// Unlinks `tag` from its sharing list, freeing the slot when it was the
    /// last sharer.
    fn release_storage(&mut self, tag: TagId) {
        let Some(slot) = self.tags.read_slot(tag) else {
            return;
        };
        let Some(head) = self.data.read_head(slot) else {
            panic!("[{}] tag {tag} references free slot {slot}", self.name)
        };
        let count = self.data.read_ref_count(slot);
        match self.tags.unlink(tag, head) {
            UnlinkOutcome::Freed => self.data.free(slot),
            UnlinkOutcome::NewHead(h) => self.data.change_ref(slot, h, count - 1),
            UnlinkOutcome::Interior => self.data.change_ref(slot, head, count - 1),
        }
    }

    /// Evicts every tag on the sharing list starting at `head`, collecting a
    /// writeback splice per eviction that produced a timing record. The next
    /// pointer is read before the tag is invalidated.
    #[allow(clippy::too_many_arguments)]
    fn evict_cascade(
        &mut self,
        req: &MemReq,
        mut head: Option<TagId>,
        mut ev_begin: u64,
        ctx: &mut SimContext<'_>,
        writebacks: &mut Vec<WritebackSplice>,
        last_ev_done: &mut u64,
        evictions: &mut u64,
    ) {
        while let Some(victim) = head {
            let wb_addr = self.tags.read_address(victim);
            debug!(bank = %self.name, tag = victim, addr = %wb_addr, "cascade eviction");
            let done = ctx.cc.process_eviction(req, wb_addr, victim, ev_begin, ctx.recorder);
            head = self.tags.read_next(victim);
            self.tags.invalidate(victim);
            if let Some(record) = ctx.recorder.pop_record() {
                *evictions += 1;
                writebacks.push(WritebackSplice {
                    record: Some(record),
                    start_cycle: ev_begin,
                    end_cycle: done,
                });
                *last_ev_done = done;
                ev_begin += self.acc_lat;
            }
        }
    }

    /// Classifies canonical content against the store via the fingerprint
    /// index. `exclude` masks the requester's own slot on the hit-write path.
    fn resolve_match(
        &mut self,
        hash: u64,
        line: &[u8],
        update: bool,
        exclude: Option<SlotId>,
    ) -> ContentMatch {
        match self.index.lookup(hash, update) {
            Some(slot) if self.data.read_head(slot).is_none() => ContentMatch::Recover(slot),
            Some(slot) if Some(slot) != exclude && self.data.is_same(slot, line) => {
                ContentMatch::Share(slot)
            }
            _ => ContentMatch::NoMatch,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn miss(
        &mut self,
        req: &MemReq,
        line: &[u8],
        hash: u64,
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

        // The index lookup is kept raw here: a stale entry with mismatched
        // content means a collision, which delays the data eviction by an
        // extra array access.
        let hint = self.index.lookup(hash, update);
        let matched = match hint {
            Some(slot) if self.data.read_head(slot).is_none() => ContentMatch::Recover(slot),
            Some(slot) if self.data.is_same(slot, line) => ContentMatch::Share(slot),
            Some(_) => ContentMatch::NoMatch,
            None => ContentMatch::NoMatch,
        };

        let (start, end) = match matched {
            ContentMatch::Recover(slot) => {
                trace!(bank = %self.name, slot, "miss recovered an evicted slot");
                self.tags.commit(
                    victim_tag,
                    req.line_addr,
                    Some(slot),
                    None,
                    BdiEncoding::Uncompressed,
                    None,
                    true,
                );
                self.data.commit(slot, victim_tag, 1, Some(line), true);
                self.stats.counters.miss_recovered += 1;
                build_miss_graph(
                    ctx.recorder,
                    self.acc_lat,
                    req.cycle,
                    resp_cycle,
                    tag_ev_done,
                    tag_ev_done,
                    access_record.as_ref(),
                    tag_wb_record.as_ref(),
                    &[],
                )
            }
            ContentMatch::Share(slot) => {
                trace!(bank = %self.name, slot, "miss shares an existing slot");
                let old_head = self.data.read_head(slot);
                let count = self.data.read_ref_count(slot);
                self.tags.commit(
                    victim_tag,
                    req.line_addr,
                    Some(slot),
                    None,
                    BdiEncoding::Uncompressed,
                    old_head,
                    update,
                );
                self.data.commit(slot, victim_tag, count + 1, None, update);
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
            ContentMatch::NoMatch => {
                // A stale fingerprint hit costs one extra access of conflict
                // resolution before the data eviction can begin.
                let collided = hint.is_some();
                let conflict_lat = if collided { 2 * self.acc_lat } else { self.acc_lat };
                let ev_cycle = resp_cycle + conflict_lat;
                let (victim_slot, list_head) = self.data.select_victim();
                let mut writebacks = Vec::new();
                let mut last_ev_done = tag_ev_done;
                self.evict_cascade(
                    req,
                    list_head,
                    ev_cycle,
                    ctx,
                    &mut writebacks,
                    &mut last_ev_done,
                    evictions,
                );
                self.data.free(victim_slot);
                self.tags.commit(
                    victim_tag,
                    req.line_addr,
                    Some(victim_slot),
                    None,
                    BdiEncoding::Uncompressed,
                    None,
                    update,
                );
                self.data.commit(victim_slot, victim_tag, 1, Some(line), update);
                if !collided {
                    self.index.insert(hash, victim_slot);
                }
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
        hash: u64,
        update: bool,
        resp_cycle: u64,
        ctx: &mut SimContext<'_>,
        evictions: &mut u64,
    ) -> (TimingRecord, u64) {
        self.stats.counters.tag_hits += 1;
        let Some(slot) = self.tags.read_slot(tag) else {
            panic!("[{}] hit tag {tag} has no data slot", self.name)
        };

        if req.kind == AccessType::PutX && !self.data.is_same(slot, line) {
            return self.write_hit(tag, slot, req, line, hash, update, resp_cycle, ctx, evictions);
        }

        // Read hit, clean writeback, or a write that left content unchanged.
        self.data.touch(slot, update);
        self.stats.counters.clean_hits += 1;
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

    /// Content-changing write hit: overwrite in place, attach to a match, or
    /// detach from the old sharing list and reallocate.
    #[allow(clippy::too_many_arguments)]
    fn write_hit(
        &mut self,
        tag: TagId,
        slot: SlotId,
        req: &MemReq,
        line: &[u8],
        hash: u64,
        update: bool,
        mut resp_cycle: u64,
        ctx: &mut SimContext<'_>,
        evictions: &mut u64,
    ) -> (TimingRecord, u64) {
        let old_count = self.data.read_ref_count(slot);
        let matched = self.resolve_match(hash, line, update, Some(slot));

        let mut writebacks = Vec::new();
        let mut wb_min_start = 0u64;
        let mut has_writeback = true;

        if old_count == 1 {
            match matched {
                ContentMatch::NoMatch => {
                    // Sole sharer and nothing to share with: cheapest path.
                    self.data.write_content(slot, line);
                    self.data.touch(slot, true);
                    self.stats.counters.write_hit_overwrite += 1;
                    has_writeback = false;
                }
                ContentMatch::Recover(other) => {
                    trace!(bank = %self.name, slot = other, "write hit recovers an evicted slot");
                    self.release_storage(tag);
                    self.tags
                        .rebind(tag, Some(other), None, BdiEncoding::Uncompressed, None);
                    self.data.commit(other, tag, 1, Some(line), true);
                    self.stats.counters.write_hit_shared += 1;
                    wb_min_start = resp_cycle;
                }
                ContentMatch::Share(other) => {
                    trace!(bank = %self.name, slot = other, "write hit attaches to a match");
                    self.release_storage(tag);
                    self.attach(tag, other, update);
                    self.stats.counters.write_hit_shared += 1;
                    resp_cycle += self.acc_lat;
                    wb_min_start = resp_cycle;
                }
            }
        } else {
            // Detach from the old list first; the slot stays live for the
            // remaining sharers.
            let Some(old_head) = self.data.read_head(slot) else {
                panic!("[{}] shared slot {slot} has no list head", self.name)
            };
            match self.tags.unlink(tag, old_head) {
                UnlinkOutcome::Freed => {
                    panic!("[{}] slot {slot} with {old_count} sharers freed by one unlink", self.name)
                }
                UnlinkOutcome::NewHead(h) => self.data.change_ref(slot, h, old_count - 1),
                UnlinkOutcome::Interior => self.data.change_ref(slot, old_head, old_count - 1),
            }

            match matched {
                ContentMatch::Recover(other) => {
                    self.tags
                        .rebind(tag, Some(other), None, BdiEncoding::Uncompressed, None);
                    self.data.commit(other, tag, 1, Some(line), true);
                    self.stats.counters.write_hit_shared += 1;
                    wb_min_start = resp_cycle;
                }
                ContentMatch::Share(other) => {
                    self.attach(tag, other, update);
                    self.stats.counters.write_hit_shared += 1;
                    resp_cycle += self.acc_lat;
                    wb_min_start = resp_cycle;
                }
                ContentMatch::NoMatch => {
                    let ev_cycle = resp_cycle + self.acc_lat;
                    resp_cycle += 2 * self.acc_lat;
                    // Re-pick until the victim is not the slot this tag just
                    // detached from.
                    let (mut victim_slot, mut list_head) = self.data.select_victim();
                    while victim_slot == slot {
                        self.data.touch(victim_slot, true);
                        let next = self.data.select_victim();
                        victim_slot = next.0;
                        list_head = next.1;
                    }
                    let mut last_ev_done = 0u64;
                    self.evict_cascade(
                        req,
                        list_head,
                        ev_cycle,
                        ctx,
                        &mut writebacks,
                        &mut last_ev_done,
                        evictions,
                    );
                    self.data.free(victim_slot);
                    self.tags.rebind(
                        tag,
                        Some(victim_slot),
                        None,
                        BdiEncoding::Uncompressed,
                        None,
                    );
                    self.data.commit(victim_slot, tag, 1, Some(line), update);
                    self.stats.counters.write_hit_realloc += 1;
                    resp_cycle += self.acc_lat;
                    wb_min_start = last_ev_done;
                }
            }
        }

        let mut data_done = resp_cycle;
        let resp_cycle = ctx
            .cc
            .process_access(req, tag, resp_cycle, &mut data_done, ctx.recorder);
        let _ = ctx.recorder.pop_record();

        let writeback = has_writeback.then_some((wb_min_start, writebacks.as_slice()));
        let he = build_hit_graph(ctx.recorder, self.acc_lat, req.cycle, resp_cycle, writeback);
        if has_writeback {
            self.wb_port_free = self.wb_port_free.max(wb_min_start.max(resp_cycle));
        }
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

    /// Splices `tag` onto the sharing list of `slot` as its new head.
    fn attach(&mut self, tag: TagId, slot: SlotId, update: bool) {
        let old_head = self.data.read_head(slot);
        let count = self.data.read_ref_count(slot);
        self.tags
            .rebind(tag, Some(slot), None, BdiEncoding::Uncompressed, old_head);
        self.data.commit(slot, tag, count + 1, None, update);
    }

    /// Feeds the end-of-access occupancy aggregates.
    fn sample_occupancy(&mut self, req: &MemReq, evictions: u64) {
        let data_valid = f64::from(self.data.valid_lines());
        let tag_valid = f64::from(self.tags.valid_lines());
        self.stats.compression.add(data_valid / tag_valid, 1.0);
        if req.kind != AccessType::PutS {
            #[allow(clippy::cast_precision_loss)]
            self.stats.evictions.add(evictions as f64, 1.0);
        }
        #[allow(clippy::cast_precision_loss)]
        {
            self.stats
                .data_utilization
                .add(data_valid / self.data.num_lines() as f64, 1.0);
            self.stats
                .tag_utilization
                .add(tag_valid / self.tags.num_lines() as f64, 1.0);
        }
    }
}
