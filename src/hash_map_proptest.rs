#![cfg(test)]

// Property tests for HashMap kept inside the crate so they can check the
// slot-level invariants after every step.

use crate::hash_map::HashMap;
use crate::tracking::TrackingAllocator;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap as StdMap};
use std::vec::Vec;

// Keys come from a small range so that runs of collisions and wraparound
// are common even at small capacities.
#[derive(Clone, Debug)]
enum Op {
    Insert(i32, u16),
    Erase(i32),
    Get(i32),
    Contains(i32),
    GetOrInsert(i32, u16),
    Mutate(i32, u16),
    Iterate,
    Clear,
    ClearAndShrink,
    Release,
}

fn arb_key() -> impl Strategy<Value = i32> {
    prop_oneof![-8i32..40, any::<i32>()]
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        8 => (arb_key(), any::<u16>()).prop_map(|(k, v)| Op::Insert(k, v)),
        5 => arb_key().prop_map(Op::Erase),
        3 => arb_key().prop_map(Op::Get),
        2 => arb_key().prop_map(Op::Contains),
        2 => (arb_key(), any::<u16>()).prop_map(|(k, v)| Op::GetOrInsert(k, v)),
        2 => (arb_key(), any::<u16>()).prop_map(|(k, d)| Op::Mutate(k, d)),
        1 => Just(Op::Iterate),
        1 => Just(Op::Clear),
        1 => Just(Op::ClearAndShrink),
        1 => Just(Op::Release),
    ]
}

fn initial_capacity() -> impl Strategy<Value = usize> {
    prop_oneof![Just(0usize), 1usize..20]
}

// Property: State-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - `insert` returns the previous value exactly when the model had one.
// - `erase` returns the model's value and leaves every other entry reachable.
// - `get`/`contains` parity with the model; `len` parity after each op.
// - Capacity is prime (or 0 after `release`), the load stays below the
//   threshold, and no free slot interrupts any entry's probe path.
// - Every block obtained is returned once the map is dropped.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine(cap in initial_capacity(), ops in proptest::collection::vec(arb_op(), 1..120)) {
        let tracker = TrackingAllocator::new();
        {
            let mut sut: HashMap<i32, u16, _> = HashMap::with_capacity_in(cap, &tracker);
            let mut model: StdMap<i32, u16> = StdMap::new();

            for op in ops {
                match op {
                    Op::Insert(k, v) => {
                        prop_assert_eq!(sut.insert(k, v), model.insert(k, v));
                    }
                    Op::Erase(k) => {
                        prop_assert_eq!(sut.erase(&k), model.remove(&k));
                        prop_assert!(!sut.contains(&k));
                    }
                    Op::Get(k) => {
                        prop_assert_eq!(sut.get(&k), model.get(&k));
                    }
                    Op::Contains(k) => {
                        prop_assert_eq!(sut.contains(&k), model.contains_key(&k));
                    }
                    Op::GetOrInsert(k, v) => {
                        let got = *sut.get_or_insert_with(k, || v);
                        let want = *model.entry(k).or_insert(v);
                        prop_assert_eq!(got, want);
                    }
                    Op::Mutate(k, d) => {
                        if let Some(v) = sut.get_mut(&k) {
                            *v = v.wrapping_add(d);
                        }
                        if let Some(v) = model.get_mut(&k) {
                            *v = v.wrapping_add(d);
                        }
                    }
                    Op::Iterate => {
                        let seen: Vec<(i32, u16)> = sut.iter().map(|(k, v)| (*k, *v)).collect();
                        prop_assert_eq!(seen.len(), model.len());
                        let keys: BTreeSet<i32> = seen.iter().map(|(k, _)| *k).collect();
                        prop_assert_eq!(keys.len(), seen.len(), "iteration repeated a key");
                        for (k, v) in seen {
                            prop_assert_eq!(model.get(&k), Some(&v));
                        }
                    }
                    Op::Clear => {
                        let cap_before = sut.capacity();
                        sut.clear();
                        model.clear();
                        prop_assert_eq!(sut.capacity(), cap_before);
                    }
                    Op::ClearAndShrink => {
                        sut.clear_and_shrink();
                        model.clear();
                        prop_assert_eq!(sut.capacity(), 2);
                    }
                    Op::Release => {
                        sut.release();
                        model.clear();
                        prop_assert_eq!(sut.capacity(), 0);
                        prop_assert_eq!(tracker.live_blocks(), 0);
                    }
                }
                sut.assert_invariants();
                prop_assert_eq!(sut.len(), model.len());
                prop_assert!(tracker.live_blocks() <= 1);
            }
        }
        prop_assert!(tracker.is_balanced());
    }
}

// Property: backward-shift deletion keeps survivors reachable.
// Fill a table past several growths with clustered keys, erase an
// arbitrary subset in arbitrary order, and check that exactly the
// survivors are found with their values.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_erase_keeps_survivors(
        keys in proptest::collection::btree_set(0u64..64, 1..40),
        picks in proptest::collection::vec(any::<prop::sample::Index>(), 0..40),
    ) {
        let keys: Vec<u64> = keys.into_iter().collect();
        let mut m: HashMap<u64, u64> = HashMap::new();
        for &k in &keys {
            m.insert(k, k * 3);
        }
        m.assert_invariants();

        let mut alive: BTreeSet<u64> = keys.iter().copied().collect();
        for pick in picks {
            let k = keys[pick.index(keys.len())];
            let expected = alive.remove(&k).then_some(k * 3);
            prop_assert_eq!(m.erase(&k), expected);
            m.assert_invariants();
        }
        prop_assert_eq!(m.len(), alive.len());
        for &k in &keys {
            let want = alive.contains(&k).then_some(k * 3);
            prop_assert_eq!(m.get(&k).copied(), want);
        }
    }
}

// Property: growth policy. After any insert that did not grow, the load is
// below the threshold; a growth moves to a strictly larger prime.
proptest! {
    #[test]
    fn prop_growth_is_prime_and_monotonic(keys in proptest::collection::vec(any::<u32>(), 1..300)) {
        let mut m: HashMap<u32, ()> = HashMap::new();
        let mut cap = m.capacity();
        for k in keys {
            m.insert(k, ());
            let now = m.capacity();
            prop_assert!(now >= cap);
            prop_assert!(crate::prime::is_prime(now));
            prop_assert!(!crate::prime::is_close_to_full(m.len(), now));
            cap = now;
        }
    }
}
