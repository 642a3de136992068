use std::collections::HashMap;

use dedupsim_core::bank::{DedupBank, DedupBdiBank, SimContext};
use dedupsim_core::common::LineAddr;
use dedupsim_core::config::{BankConfig, RegionConfig};
use dedupsim_core::content::RegionTable;
use dedupsim_core::mem::{AccessType, MemReq};
use dedupsim_core::timing::{EventArena, EventRecorder, TimingRecord};

use super::mocks::{ScriptedCoherence, ScriptedMemory};

/// Everything one bank access needs, bundled behind one-call helpers.
///
/// The bench owns the mocks and the event recorder; after every access it
/// pops the request's top-level timing record into `last_record` so the
/// recorder is ready for the next request.
pub struct Bench {
    /// Scripted coherence controller.
    pub cc: ScriptedCoherence,
    /// Event recorder of the (single) issuing thread.
    pub recorder: EventRecorder,
    /// Approximate-region table.
    pub regions: RegionTable,
    /// Line-content source.
    pub memory: ScriptedMemory,
    /// Optional simulated-to-real address remap.
    pub real_addrs: Option<HashMap<u64, u64>>,
    /// Timing record of the most recent access, if it produced one.
    pub last_record: Option<TimingRecord>,
}

impl Bench {
    /// Bench with no approximate regions and untouched memory.
    pub fn new(line_bytes: usize) -> Self {
        Self {
            cc: ScriptedCoherence::new(),
            recorder: EventRecorder::new(),
            regions: RegionTable::default(),
            memory: ScriptedMemory::new(line_bytes),
            real_addrs: None,
            last_record: None,
        }
    }

    /// Bench with the given approximate regions installed.
    pub fn with_regions(line_bytes: usize, regions: Vec<RegionConfig>) -> Self {
        let mut bench = Self::new(line_bytes);
        bench.regions = RegionTable::new(regions);
        bench
    }

    /// Runs one access against a simple bank and returns its response cycle.
    pub fn run(&mut self, bank: &mut DedupBank, kind: AccessType, addr: u64, cycle: u64) -> u64 {
        let mut req = MemReq {
            line_addr: LineAddr(addr),
            kind,
            src_id: 0,
            cycle,
        };
        let mut ctx = SimContext {
            cc: &mut self.cc,
            recorder: &mut self.recorder,
            regions: &self.regions,
            memory: &self.memory,
            real_addrs: self.real_addrs.as_ref(),
        };
        let resp = bank.access(&mut req, &mut ctx);
        self.last_record = self.recorder.pop_record();
        resp
    }

    /// Runs one access against a segmented bank and returns its response
    /// cycle.
    pub fn run_bdi(
        &mut self,
        bank: &mut DedupBdiBank,
        kind: AccessType,
        addr: u64,
        cycle: u64,
    ) -> u64 {
        let mut req = MemReq {
            line_addr: LineAddr(addr),
            kind,
            src_id: 0,
            cycle,
        };
        let mut ctx = SimContext {
            cc: &mut self.cc,
            recorder: &mut self.recorder,
            regions: &self.regions,
            memory: &self.memory,
            real_addrs: self.real_addrs.as_ref(),
        };
        let resp = bank.access(&mut req, &mut ctx);
        self.last_record = self.recorder.pop_record();
        resp
    }

    /// Resolves every event recorded so far and checks causality: no event
    /// starts before its explicit minimum cycle or before any parent ends.
    pub fn assert_causal(&self) {
        assert_causal(self.recorder.arena());
    }
}

/// Resolves `arena` and checks the causality rules on every node.
pub fn assert_causal(arena: &EventArena) {
    let resolved = arena.resolve();
    for (id, node) in arena.iter() {
        let r = resolved[id.index()];
        assert!(
            r.start >= node.min_start_cycle,
            "event {id:?} starts at {} before its minimum {}",
            r.start,
            node.min_start_cycle
        );
        assert_eq!(r.end, r.start + node.delay);
        for child in &node.children {
            assert!(
                resolved[child.index()].start >= r.end,
                "child {child:?} starts at {} before parent {id:?} ends at {}",
                resolved[child.index()].start,
                r.end
            );
        }
    }
}

/// Small deterministic bank: 64-byte lines, 16 sets of 4 tag ways, 4 data
/// lines, 3-cycle arrays. Shared by most bank-level tests.
pub fn small_config() -> BankConfig {
    BankConfig {
        name: "test-bank".to_string(),
        line_bytes: 64,
        tag_lines: 64,
        tag_ways: 4,
        data_lines: 4,
        data_ways: 2,
        hash_lines: 8,
        hash_ways: 2,
        acc_latency: 3,
        inv_latency: 2,
        ..BankConfig::default()
    }
}

/// Array access latency of [`small_config`].
pub const ACC: u64 = 3;

/// Guaranteed-incompressible line: a byte ramp with a seeded first element.
pub fn ramp_line(line_bytes: usize, seed: u8) -> Vec<u8> {
    let mut line: Vec<u8> = (0..line_bytes).map(|i| i as u8).collect();
    line[0] = seed;
    line
}

/// Line whose 8-byte elements all hold `value`; compresses to one segment.
pub fn repeated_line(line_bytes: usize, value: u64) -> Vec<u8> {
    value
        .to_le_bytes()
        .iter()
        .copied()
        .cycle()
        .take(line_bytes)
        .collect()
}
