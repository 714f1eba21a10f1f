//! Group-by folds over relations.

use crate::context::{Context, PARALLEL_CHUNK};
use crate::relation::Relation;
use crate::tuple::Tuple;

/// Fold the tuples of `input` grouped by `key_func`, producing one
/// `(key, accumulator)` pair per distinct key.
///
/// The input's ordering is by full tuple, which says nothing about an
/// arbitrary extracted key, so the pass first materializes `(key, &tuple)`
/// pairs (chunked across the pool when one is present) and stably sorts
/// them by key; tuples within a group therefore fold in their relation
/// order. A single walk then emits a pair at every key change.
pub fn aggregate<T, Key, Acc>(
    ctx: &Context,
    input: &Relation<T>,
    key_func: impl Fn(&T) -> Key + Send + Sync,
    init: Acc,
    fold: impl Fn(Acc, &T) -> Acc,
) -> Relation<(Key, Acc)>
where
    T: Tuple,
    Key: Tuple,
    Acc: Tuple,
{
    let chunks: Vec<&[T]> = input.chunks(PARALLEL_CHUNK).collect();
    let keyed = ctx.map_tasks(&chunks, |&chunk| {
        chunk
            .iter()
            .map(|tuple| (key_func(tuple), tuple))
            .collect::<Vec<_>>()
    });

    let mut pairs = Vec::with_capacity(input.len());
    for buffer in keyed {
        pairs.extend(buffer);
    }
    pairs.sort_by(|left, right| left.0.cmp(&right.0));

    let mut emitted = Vec::new();
    let mut pairs = pairs.into_iter();
    if let Some((first_key, first_tuple)) = pairs.next() {
        let mut current_key = first_key;
        let mut acc = fold(init.clone(), first_tuple);
        for (key, tuple) in pairs {
            if key != current_key {
                emitted.push((current_key, acc));
                current_key = key;
                acc = init.clone();
            }
            acc = fold(acc, tuple);
        }
        emitted.push((current_key, acc));
    }

    Relation::from_vec(ctx, emitted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_per_group() {
        let ctx = Context::sequential();
        let input: Relation<(u32, u64)> = Relation::from(vec![(1, 10), (1, 20), (2, 5)]);
        let sums = aggregate(&ctx, &input, |&(key, _)| key, 0u64, |acc, &(_, val)| acc + val);
        assert_eq!(sums.elements(), &[(1, 30), (2, 5)]);
    }

    #[test]
    fn empty_input_yields_empty_relation() {
        let ctx = Context::sequential();
        let input: Relation<u32> = Relation::empty();
        let counts = aggregate(&ctx, &input, |&x| x, 0u32, |acc, _| acc + 1);
        assert!(counts.is_empty());
    }

    #[test]
    fn key_not_a_prefix_of_tuple_order() {
        let ctx = Context::sequential();
        // Group by the second field: input order does not group these.
        let input: Relation<(u32, u32)> = Relation::from(vec![(1, 7), (2, 7), (3, 8)]);
        let counts = aggregate(&ctx, &input, |&(_, key)| key, 0u32, |acc, _| acc + 1);
        assert_eq!(counts.elements(), &[(7, 2), (8, 1)]);
    }
}
