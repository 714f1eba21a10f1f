//! Property tests for variable soundness, non-duplication, and the
//! total_len bound

use std::collections::BTreeSet;

use proptest::prelude::*;
use zodd::{Context, Variable};

fn arb_batches() -> impl Strategy<Value = Vec<Vec<u16>>> {
    proptest::collection::vec(proptest::collection::vec(0u16..200, 0..40), 0..12)
}

proptest! {
    /// Inserting any multiset of batches and draining yields exactly the
    /// set union of the batches, however the rounds interleave.
    #[test]
    fn drained_set_is_the_union_of_insertions(
        batches in arb_batches(),
        advance_between in any::<bool>(),
    ) {
        let v: Variable<u16> = Variable::new(&Context::sequential(), "union");
        let mut expected: BTreeSet<u16> = BTreeSet::new();

        for batch in &batches {
            expected.extend(batch.iter().copied());
            v.insert(batch.clone());
            if advance_between {
                v.changed();
            }
        }
        while v.changed() {}

        let drained = v.complete();
        let actual: BTreeSet<u16> = drained.iter().copied().collect();
        prop_assert_eq!(actual, expected);
        prop_assert!(drained.windows(2).all(|w| w[0] < w[1]));
    }

    /// On every round, recent is disjoint from every stable batch, and
    /// the stable batches are disjoint from one another.
    #[test]
    fn compartments_never_overlap(batches in arb_batches()) {
        let v: Variable<u16> = Variable::new(&Context::sequential(), "disjoint");

        for batch in batches {
            v.insert(batch);
            v.changed();

            let recent = v.recent();
            let stable = v.stable();
            let mut seen: BTreeSet<u16> = recent.iter().copied().collect();
            for batch in stable.iter() {
                for element in batch.iter() {
                    prop_assert!(seen.insert(*element), "{} stored twice", element);
                }
            }
        }
    }

    /// total_len never undercounts the final set, and matches it exactly
    /// once the variable has stabilized.
    #[test]
    fn total_len_bounds_the_set_size(batches in arb_batches()) {
        let v: Variable<u16> = Variable::new(&Context::sequential(), "bound");
        let mut expected: BTreeSet<u16> = BTreeSet::new();

        for batch in &batches {
            expected.extend(batch.iter().copied());
            v.insert(batch.clone());
        }
        prop_assert!(v.total_len() >= expected.len());

        while v.changed() {}
        prop_assert_eq!(v.total_len(), expected.len());
        prop_assert_eq!(v.complete().len(), expected.len());
    }

    /// Once changed() reports false, re-asserting known tuples never
    /// reports a change again.
    #[test]
    fn fixed_point_is_stable_under_reinsertion(batch in proptest::collection::vec(0u16..100, 1..50)) {
        let v: Variable<u16> = Variable::new(&Context::sequential(), "fixed");
        v.insert(batch.clone());
        while v.changed() {}

        v.insert(batch);
        prop_assert!(!v.changed());
        prop_assert!(v.recent().is_empty());
    }
}
