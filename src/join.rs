//! Merge-join over sorted (key, value) relations, and the semi-naive
//! variants that read and feed [`Variable`] compartments.

use crate::context::{Context, PARALLEL_CHUNK};
use crate::gallop::gallop;
use crate::relation::Relation;
use crate::tuple::Tuple;
use crate::variable::Variable;

/// Enumerate matching pairs of two sorted `(key, value)` slices.
///
/// Both cursors always sit at the head of a block of equal keys. Whichever
/// side is behind gallops forward to the other's key; on a match the cross
/// product of the two equal-key blocks is fed to `result` in `(key, left
/// value, right value)` lexicographic order, and both cursors skip their
/// blocks. Cost is linear in the inputs plus a logarithmic factor per
/// matched block, far below the full cross product when keys are sparse.
///
/// The references passed to `result` point into the operand slices and
/// must not be retained past the call.
pub fn join_helper<Key, Val1, Val2>(
    mut left: &[(Key, Val1)],
    mut right: &[(Key, Val2)],
    mut result: impl FnMut(&Key, &Val1, &Val2),
) where
    Key: Ord,
{
    while !left.is_empty() && !right.is_empty() {
        use std::cmp::Ordering;
        match left[0].0.cmp(&right[0].0) {
            Ordering::Less => {
                left = gallop(left, |pair| pair.0 < right[0].0);
            }
            Ordering::Greater => {
                right = gallop(right, |pair| pair.0 < left[0].0);
            }
            Ordering::Equal => {
                let left_run = left.iter().take_while(|pair| pair.0 == left[0].0).count();
                let right_run = right.iter().take_while(|pair| pair.0 == right[0].0).count();
                for left_pair in &left[..left_run] {
                    for right_pair in &right[..right_run] {
                        result(&left_pair.0, &left_pair.1, &right_pair.1);
                    }
                }
                left = &left[left_run..];
                right = &right[right_run..];
            }
        }
    }
}

/// Join two variables on their first field and stage the mapped matches
/// into `output`.
///
/// Applies the semi-naive identity: only the pairings involving at least
/// one `recent` operand (`recent1 x stable2`, `stable1 x recent2`, and
/// `recent1 x recent2`) are enumerated, so tuples derivable in earlier
/// rounds are never re-derived. With a
/// worker pool, one task runs per stable-batch pairing and the per-task
/// buffers are concatenated in a fixed order before the output relation is
/// built, keeping the result deterministic.
pub fn join_into<Key, Val1, Val2, Out>(
    ctx: &Context,
    input1: &Variable<(Key, Val1)>,
    input2: &Variable<(Key, Val2)>,
    output: &Variable<Out>,
    logic: impl Fn(&Key, &Val1, &Val2) -> Out + Send + Sync,
) where
    Key: Tuple,
    Val1: Tuple,
    Val2: Tuple,
    Out: Tuple,
{
    let recent1 = input1.recent();
    let stable1 = input1.stable();
    let recent2 = input2.recent();
    let stable2 = input2.stable();

    let mut tasks: Vec<(&[(Key, Val1)], &[(Key, Val2)])> = Vec::new();
    for batch2 in stable2.iter() {
        tasks.push((recent1.elements(), batch2.elements()));
    }
    for batch1 in stable1.iter() {
        tasks.push((batch1.elements(), recent2.elements()));
    }
    tasks.push((recent1.elements(), recent2.elements()));

    let buffers = ctx.map_tasks(&tasks, |&(left, right)| {
        let mut buffer = Vec::new();
        join_helper(left, right, |key, val1, val2| {
            buffer.push(logic(key, val1, val2));
        });
        buffer
    });

    let mut results = Vec::with_capacity(buffers.iter().map(Vec::len).sum());
    for buffer in buffers {
        results.extend(buffer);
    }

    drop((recent1, stable1, recent2, stable2));
    output.insert_relation(Relation::from_vec(ctx, results));
}

/// Stage into `output` the recent tuples of `input` whose key does not
/// occur anywhere in `filter`, neither its recent relation nor any
/// stable batch.
///
/// Probes ascend in key order, so each batch keeps a gallop cursor that
/// only ever moves forward; a probe stops at the first batch containing
/// its key. With a worker pool the recent tuples are scanned in chunks,
/// each chunk with its own cursors.
pub fn join_anti<Key, Val, FilterVal, Out>(
    ctx: &Context,
    input: &Variable<(Key, Val)>,
    filter: &Variable<(Key, FilterVal)>,
    output: &Variable<Out>,
    logic: impl Fn(&Key, &Val) -> Out + Send + Sync,
) where
    Key: Tuple,
    Val: Tuple,
    FilterVal: Tuple,
    Out: Tuple,
{
    let recent = input.recent();
    let filter_recent = filter.recent();
    let filter_stable = filter.stable();

    let mut batches: Vec<&[(Key, FilterVal)]> =
        filter_stable.iter().map(|batch| batch.elements()).collect();
    batches.push(filter_recent.elements());

    let chunks: Vec<&[(Key, Val)]> = recent.chunks(PARALLEL_CHUNK).collect();
    let buffers = ctx.map_tasks(&chunks, |&chunk| {
        let mut cursors = batches.clone();
        let mut buffer = Vec::new();
        for (key, val) in chunk {
            let mut present = false;
            for cursor in cursors.iter_mut() {
                *cursor = gallop(cursor, |pair| pair.0 < *key);
                if cursor.first().is_some_and(|pair| pair.0 == *key) {
                    present = true;
                    break;
                }
            }
            if !present {
                buffer.push(logic(key, val));
            }
        }
        buffer
    });

    let mut results = Vec::with_capacity(buffers.iter().map(Vec::len).sum());
    for buffer in buffers {
        results.extend(buffer);
    }

    drop((recent, filter_recent, filter_stable));
    output.insert_relation(Relation::from_vec(ctx, results));
}
