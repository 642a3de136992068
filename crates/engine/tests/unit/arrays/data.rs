//! Simple Data Store Unit Tests.
//!
//! Verifies reference counting, content compare, and victim selection of the
//! fully associative deduplicated line store.

use dedupsim_core::arrays::DedupDataArray;
use dedupsim_core::config::ReplacementPolicyKind;
use pretty_assertions::assert_eq;

const LINE: usize = 16;

fn store(lines: usize) -> DedupDataArray {
    DedupDataArray::new(lines, LINE, ReplacementPolicyKind::Lru)
}

#[test]
fn commit_occupies_a_slot() {
    let mut data = store(4);
    let content = [7u8; LINE];
    data.commit(0, 10, 1, Some(&content), true);

    assert_eq!(data.valid_lines(), 1);
    assert_eq!(data.read_ref_count(0), 1);
    assert_eq!(data.read_head(0), Some(10));
    assert!(data.is_same(0, &content));
}

#[test]
fn recommit_does_not_double_count() {
    let mut data = store(4);
    data.commit(0, 10, 1, Some(&[7u8; LINE]), true);
    data.commit(0, 11, 2, None, true);

    assert_eq!(data.valid_lines(), 1);
    assert_eq!(data.read_ref_count(0), 2);
    assert_eq!(data.read_head(0), Some(11));
    assert!(data.is_same(0, &[7u8; LINE]), "content survives a head change");
}

#[test]
fn change_ref_rewrites_count_and_head() {
    let mut data = store(4);
    data.commit(0, 10, 3, Some(&[7u8; LINE]), true);
    data.change_ref(0, 12, 2);

    assert_eq!(data.read_ref_count(0), 2);
    assert_eq!(data.read_head(0), Some(12));
    assert_eq!(data.valid_lines(), 1);
}

#[test]
fn free_releases_the_slot() {
    let mut data = store(4);
    data.commit(0, 10, 2, Some(&[7u8; LINE]), true);
    data.free(0);

    assert_eq!(data.valid_lines(), 0);
    assert_eq!(data.read_ref_count(0), 0);
    assert_eq!(data.read_head(0), None);
}

#[test]
fn write_content_changes_the_compare() {
    let mut data = store(4);
    data.commit(0, 10, 1, Some(&[7u8; LINE]), true);
    data.write_content(0, &[9u8; LINE]);

    assert!(!data.is_same(0, &[7u8; LINE]));
    assert!(data.is_same(0, &[9u8; LINE]));
}

#[test]
fn victim_reports_the_sharing_list_head() {
    let mut data = store(2);
    // Fill both slots, bottom of the LRU stack first.
    let (s1, head) = data.select_victim();
    assert_eq!(head, None);
    data.commit(s1, 10, 2, Some(&[1u8; LINE]), true);
    let (s2, _) = data.select_victim();
    assert_ne!(s2, s1);
    data.commit(s2, 20, 1, Some(&[2u8; LINE]), true);

    // The first-committed slot is now least recently used.
    let (victim, head) = data.select_victim();
    assert_eq!(victim, s1);
    assert_eq!(head, Some(10));
}

#[test]
fn touch_refreshes_recency() {
    let mut data = store(2);
    let (s1, _) = data.select_victim();
    data.commit(s1, 10, 1, Some(&[1u8; LINE]), true);
    let (s2, _) = data.select_victim();
    data.commit(s2, 20, 1, Some(&[2u8; LINE]), true);

    data.touch(s1, true);
    let (victim, _) = data.select_victim();
    assert_eq!(victim, s2, "the untouched slot becomes the victim");
}
