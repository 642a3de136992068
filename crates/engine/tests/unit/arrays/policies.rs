//! Replacement Policy Unit Tests.

use dedupsim_core::arrays::policies::{make_policy, FifoPolicy, LruPolicy, ReplacementPolicy};
use dedupsim_core::config::ReplacementPolicyKind;
use rstest::rstest;

// ══════════════════════════════════════════════════════════
// 1. Common contract
// ══════════════════════════════════════════════════════════

/// Whatever the policy, the victim way must stay in range for every set.
#[rstest]
#[case(ReplacementPolicyKind::Lru)]
#[case(ReplacementPolicyKind::Fifo)]
fn victim_stays_in_range(#[case] kind: ReplacementPolicyKind) {
    let mut policy = make_policy(kind, 4, 4);
    for set in 0..4 {
        for way in 0..4 {
            policy.update(set, way);
            assert!(policy.victim(set) < 4);
        }
    }
}

/// Filling a set way by way (touching each victim as an array would) visits
/// every way exactly once before repeating.
#[rstest]
#[case(ReplacementPolicyKind::Lru)]
#[case(ReplacementPolicyKind::Fifo)]
fn fill_pass_visits_every_way(#[case] kind: ReplacementPolicyKind) {
    let mut policy = make_policy(kind, 1, 4);
    let mut seen = [false; 4];
    for _ in 0..4 {
        let way = policy.victim(0);
        assert!(!seen[way], "way {way} handed out twice during the fill");
        seen[way] = true;
        policy.update(0, way);
    }
    assert!(seen.iter().all(|&s| s));
}

// ══════════════════════════════════════════════════════════
// 2. LRU specifics
// ══════════════════════════════════════════════════════════

#[test]
fn lru_evicts_the_least_recently_used_way() {
    let mut policy = LruPolicy::new(1, 4);
    for way in [3, 2, 1, 0] {
        policy.update(0, way);
    }
    // Way 3 has waited longest.
    assert_eq!(policy.victim(0), 3);

    policy.update(0, 3);
    assert_eq!(policy.victim(0), 2);
}

#[test]
fn lru_sets_are_independent() {
    let mut policy = LruPolicy::new(2, 2);
    policy.update(0, 1);
    policy.update(0, 0);
    // Set 1 was never touched; its fresh stack still bottoms out at way 1.
    assert_eq!(policy.victim(1), 1);
    assert_eq!(policy.victim(0), 1);
}

// ══════════════════════════════════════════════════════════
// 3. FIFO specifics
// ══════════════════════════════════════════════════════════

#[test]
fn fifo_ignores_reaccesses() {
    let mut policy = FifoPolicy::new(1, 4);
    for way in 0..4 {
        let victim = policy.victim(0);
        assert_eq!(victim, way);
        policy.update(0, victim);
    }
    // Re-touching way 1 must not move the round-robin pointer off way 0.
    policy.update(0, 1);
    assert_eq!(policy.victim(0), 0);
}
