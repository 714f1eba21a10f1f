//! Property tests for relation canonicality, the merge algebra, and the
//! gallop contract

use std::collections::BTreeSet;

use proptest::prelude::*;
use zodd::{gallop, Context, Relation};

fn arb_elements() -> impl Strategy<Value = Vec<u32>> {
    // Small domain so duplicates and overlaps are common.
    proptest::collection::vec(0u32..500, 0..200)
}

proptest! {
    /// Construction yields a strictly increasing sequence over exactly
    /// the input's distinct elements.
    #[test]
    fn construction_is_canonical(xs in arb_elements()) {
        let ctx = Context::sequential();
        let relation = Relation::from_vec(&ctx, xs.clone());

        prop_assert!(relation.windows(2).all(|w| w[0] < w[1]));

        let expected: BTreeSet<u32> = xs.into_iter().collect();
        let actual: BTreeSet<u32> = relation.iter().copied().collect();
        prop_assert_eq!(actual, expected);
        prop_assert_eq!(relation.len(), relation.iter().copied().collect::<BTreeSet<_>>().len());
    }

    /// merge(a, b) == merge(b, a), element for element.
    #[test]
    fn merge_is_commutative(a in arb_elements(), b in arb_elements()) {
        let left = Relation::from(a.clone()).merge(Relation::from(b.clone()));
        let right = Relation::from(b).merge(Relation::from(a));
        prop_assert_eq!(left, right);
    }

    /// merge(merge(a, b), c) == merge(a, merge(b, c)).
    #[test]
    fn merge_is_associative(
        a in arb_elements(),
        b in arb_elements(),
        c in arb_elements(),
    ) {
        let ra = || Relation::from(a.clone());
        let rb = || Relation::from(b.clone());
        let rc = || Relation::from(c.clone());

        let left = ra().merge(rb()).merge(rc());
        let right = ra().merge(rb().merge(rc()));
        prop_assert_eq!(left, right);
    }

    /// merge(a, a) == a.
    #[test]
    fn merge_is_idempotent(a in arb_elements()) {
        let relation = Relation::from(a);
        prop_assert_eq!(relation.clone().merge(relation.clone()), relation);
    }

    /// Parallel construction and merge agree with their sequential
    /// counterparts on arbitrary input.
    #[test]
    fn pooled_construction_agrees(a in arb_elements(), b in arb_elements()) {
        let pooled = Context::with_workers(2).unwrap();
        let sequential = Context::sequential();

        let from_pool = Relation::from_vec(&pooled, a.clone());
        let from_seq = Relation::from_vec(&sequential, a.clone());
        prop_assert_eq!(&from_pool, &from_seq);

        let merged = from_pool.merge(Relation::from_vec(&pooled, b.clone()));
        let expected = Relation::from(a.into_iter().chain(b).collect::<Vec<_>>());
        prop_assert_eq!(merged, expected);
    }

    /// The gallop suffix is exactly the elements at or above the target.
    #[test]
    fn gallop_returns_the_lower_bound_suffix(
        mut xs in proptest::collection::vec(any::<u32>(), 0..300),
        target in any::<u32>(),
    ) {
        // Sorted but possibly duplicated, as gallop requires.
        xs.sort_unstable();

        let suffix = gallop(&xs, |&x| x < target);
        prop_assert!(suffix.iter().all(|&x| x >= target));
        prop_assert_eq!(suffix.len(), xs.iter().filter(|&&x| x >= target).count());
    }
}
