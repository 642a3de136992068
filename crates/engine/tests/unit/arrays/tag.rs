//! Tag Directory Unit Tests.
//!
//! Verifies lookup/commit/invalidate bookkeeping and the three-way unlink
//! outcome that keeps sharing lists and the data side consistent.

use dedupsim_core::arrays::{TagArray, UnlinkOutcome};
use dedupsim_core::common::LineAddr;
use dedupsim_core::config::ReplacementPolicyKind;
use dedupsim_core::content::BdiEncoding;
use pretty_assertions::assert_eq;

fn directory() -> TagArray {
    TagArray::new(8, 4, ReplacementPolicyKind::Lru)
}

/// Installs `addr` into the directory with no storage binding, splicing it
/// in front of `next`.
fn install(tags: &mut TagArray, tag: u32, addr: u64, next: Option<u32>) {
    tags.commit(
        tag,
        LineAddr(addr),
        Some(0),
        None,
        BdiEncoding::Uncompressed,
        next,
        true,
    );
}

// ══════════════════════════════════════════════════════════
// 1. Lookup / Commit / Invalidate
// ══════════════════════════════════════════════════════════

#[test]
fn lookup_misses_empty_directory() {
    let mut tags = directory();
    assert_eq!(tags.lookup(LineAddr(0x10), true), None);
    assert_eq!(tags.valid_lines(), 0);
}

#[test]
fn commit_then_lookup_hits() {
    let mut tags = directory();
    let (victim, wb) = tags.select_victim(LineAddr(0x10));
    assert_eq!(wb, None, "empty directory has nothing to write back");

    install(&mut tags, victim, 0x10, None);
    assert_eq!(tags.lookup(LineAddr(0x10), true), Some(victim));
    assert_eq!(tags.read_address(victim), LineAddr(0x10));
    assert_eq!(tags.valid_lines(), 1);
}

#[test]
fn invalidate_releases_the_entry() {
    let mut tags = directory();
    let (victim, _) = tags.select_victim(LineAddr(0x10));
    install(&mut tags, victim, 0x10, None);

    tags.invalidate(victim);
    assert_eq!(tags.lookup(LineAddr(0x10), false), None);
    assert_eq!(tags.valid_lines(), 0);
    assert!(!tags.is_valid(victim));
}

#[test]
fn select_victim_reports_the_displaced_address() {
    let mut tags = TagArray::new(2, 2, ReplacementPolicyKind::Lru);
    // One set of two ways; two commits fill it. The fresh LRU stack hands
    // out the bottom way first.
    for (tag, addr) in [(1u32, 2u64), (0u32, 4u64)] {
        let (victim, _) = tags.select_victim(LineAddr(addr));
        assert_eq!(victim, tag);
        install(&mut tags, victim, addr, None);
    }
    let (_, wb) = tags.select_victim(LineAddr(6));
    assert_eq!(wb, Some(LineAddr(2)), "LRU way holds the first address");
}

#[test]
fn rebind_rewrites_the_storage_binding() {
    let mut tags = directory();
    install(&mut tags, 0, 0x10, None);
    tags.rebind(0, Some(3), Some(7), BdiEncoding::Zero, None);

    assert_eq!(tags.read_slot(0), Some(3));
    assert_eq!(tags.read_segment(0), Some(7));
    assert_eq!(tags.read_encoding(0), BdiEncoding::Zero);
    assert_eq!(tags.read_address(0), LineAddr(0x10), "address is untouched");
}

// ══════════════════════════════════════════════════════════
// 2. Sharing-List Unlink
// ══════════════════════════════════════════════════════════

/// Builds the list 2 -> 1 -> 0 (head is tag 2).
fn three_sharers(tags: &mut TagArray) {
    install(tags, 0, 0x10, None);
    install(tags, 1, 0x20, Some(0));
    install(tags, 2, 0x30, Some(1));
}

#[test]
fn unlink_sole_member_frees() {
    let mut tags = directory();
    install(&mut tags, 0, 0x10, None);
    assert_eq!(tags.unlink(0, 0), UnlinkOutcome::Freed);
}

#[test]
fn unlink_head_promotes_successor() {
    let mut tags = directory();
    three_sharers(&mut tags);
    assert_eq!(tags.unlink(2, 2), UnlinkOutcome::NewHead(1));
    assert_eq!(tags.read_next(2), None, "unlinked tag leaves the list");
}

#[test]
fn unlink_interior_bridges_the_gap() {
    let mut tags = directory();
    three_sharers(&mut tags);
    assert_eq!(tags.unlink(1, 2), UnlinkOutcome::Interior);
    assert_eq!(tags.read_next(2), Some(0), "predecessor skips the removed tag");
    assert_eq!(tags.read_next(1), None);
}

#[test]
fn unlink_tail_is_interior() {
    let mut tags = directory();
    three_sharers(&mut tags);
    assert_eq!(tags.unlink(0, 2), UnlinkOutcome::Interior);
    assert_eq!(tags.read_next(1), None);
}

#[test]
#[should_panic(expected = "not on sharing list")]
fn unlink_unreachable_tag_panics() {
    let mut tags = directory();
    three_sharers(&mut tags);
    install(&mut tags, 5, 0x50, None);
    let _ = tags.unlink(5, 2);
}
