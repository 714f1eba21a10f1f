//! Leapfrog trie join: multi-way intersection driven by per-prefix counts.
//!
//! A [`Leaper`] answers three questions about a prefix tuple: how many
//! values could you contribute (`count`), what are they (`propose`), and
//! which of these candidates do you also have (`intersect`). For each
//! recent source tuple, [`extend_into`] asks every leaper for its count,
//! lets the most selective one propose, and narrows the proposal through
//! the rest. Work per prefix is proportional to the smallest block plus a
//! logarithmic factor per leaper, which is what makes the multi-way join
//! worst-case optimal.
//!
//! This is the one place the engine uses dynamic dispatch: the three
//! leaper kinds are heterogeneous but need to live in a single array.

use crate::context::{Context, PARALLEL_CHUNK};
use crate::gallop::gallop;
use crate::relation::Relation;
use crate::tuple::Tuple;
use crate::variable::Variable;

/// Sentinel count for leapers that cannot propose values.
///
/// Anti-leapers report it so the driver never selects them as the
/// proposer; a prefix where every leaper reports it is skipped outright.
pub const UNBOUNDED: usize = usize::MAX;

/// One participant in a leapfrog join over prefixes of type `Prefix`,
/// contributing values of type `Value` borrowed from backing storage that
/// outlives `'leap`.
pub trait Leaper<'leap, Prefix, Value>: Send {
    /// Upper bound on the number of values for this prefix, or
    /// [`UNBOUNDED`] for filter-only leapers.
    fn count(&mut self, prefix: &Prefix) -> usize;

    /// Append this leaper's values for the prefix. Only invoked on the
    /// leaper whose `count` was the bounded minimum, immediately after
    /// that `count` call.
    fn propose(&mut self, prefix: &Prefix, values: &mut Vec<&'leap Value>);

    /// Restrict `values` to those this leaper accepts for the prefix.
    fn intersect(&mut self, prefix: &Prefix, values: &mut Vec<&'leap Value>);

    /// Clone for a worker. Clones carry their own cached block bounds, so
    /// workers never share a cursor.
    fn boxed_clone(&self) -> Box<dyn Leaper<'leap, Prefix, Value> + 'leap>;
}

/// Extend prefixes with the values stored under `key_func(prefix)`.
///
/// `count` locates the key's block with two gallops and caches its bounds;
/// `propose` and `intersect` reuse the cached block without searching
/// again.
pub struct ExtendWith<'leap, Key, Val, Func> {
    relation: &'leap Relation<(Key, Val)>,
    key_func: Func,
    start: usize,
    end: usize,
}

impl<'leap, Key, Val, Func> ExtendWith<'leap, Key, Val, Func> {
    /// Construct from a sorted `(key, value)` relation and an extractor
    /// mapping each prefix to the key to look up.
    pub fn new(relation: &'leap Relation<(Key, Val)>, key_func: Func) -> Self {
        Self {
            relation,
            key_func,
            start: 0,
            end: 0,
        }
    }
}

impl<'leap, Key, Val, Prefix, Func> Leaper<'leap, Prefix, Val>
    for ExtendWith<'leap, Key, Val, Func>
where
    Key: Ord + Sync + 'leap,
    Val: Ord + Sync + 'leap,
    Func: Fn(&Prefix) -> Key + Clone + Send + 'leap,
{
    fn count(&mut self, prefix: &Prefix) -> usize {
        let key = (self.key_func)(prefix);
        let head = gallop(self.relation, |pair| pair.0 < key);
        let tail = gallop(head, |pair| pair.0 <= key);
        self.start = self.relation.len() - head.len();
        self.end = self.relation.len() - tail.len();
        self.end - self.start
    }

    fn propose(&mut self, _prefix: &Prefix, values: &mut Vec<&'leap Val>) {
        values.extend(
            self.relation.elements()[self.start..self.end]
                .iter()
                .map(|(_, val)| val),
        );
    }

    fn intersect(&mut self, _prefix: &Prefix, values: &mut Vec<&'leap Val>) {
        let mut block = &self.relation.elements()[self.start..self.end];
        values.retain(|value| {
            block = gallop(block, |pair| &pair.1 < *value);
            block.first().is_some_and(|pair| &pair.1 == *value)
        });
    }

    fn boxed_clone(&self) -> Box<dyn Leaper<'leap, Prefix, Val> + 'leap> {
        Box::new(Self::new(self.relation, self.key_func.clone()))
    }
}

/// Reject prefixes whose full `(key, value)` image is present in the
/// relation. Never proposes; its `count` is zero exactly when the tuple
/// exists, which makes the driver drop the prefix.
pub struct FilterAnti<'leap, Key, Val, Func> {
    relation: &'leap Relation<(Key, Val)>,
    key_func: Func,
}

impl<'leap, Key, Val, Func> FilterAnti<'leap, Key, Val, Func> {
    /// Construct from a sorted relation and an extractor mapping each
    /// prefix to the full tuple whose absence is required.
    pub fn new(relation: &'leap Relation<(Key, Val)>, key_func: Func) -> Self {
        Self { relation, key_func }
    }
}

impl<'leap, Key, Val, Prefix, Func> Leaper<'leap, Prefix, Val>
    for FilterAnti<'leap, Key, Val, Func>
where
    Key: Ord + Sync + 'leap,
    Val: Ord + Sync + 'leap,
    Func: Fn(&Prefix) -> (Key, Val) + Clone + Send + 'leap,
{
    fn count(&mut self, prefix: &Prefix) -> usize {
        let tuple = (self.key_func)(prefix);
        let suffix = gallop(self.relation, |stored| stored < &tuple);
        if suffix.first().is_some_and(|stored| *stored == tuple) {
            0
        } else {
            UNBOUNDED
        }
    }

    fn propose(&mut self, _prefix: &Prefix, _values: &mut Vec<&'leap Val>) {
        unreachable!("filter leapers never have the minimum bounded count");
    }

    fn intersect(&mut self, _prefix: &Prefix, _values: &mut Vec<&'leap Val>) {
        // The prefix survived the count check; values are untouched.
    }

    fn boxed_clone(&self) -> Box<dyn Leaper<'leap, Prefix, Val> + 'leap> {
        Box::new(Self::new(self.relation, self.key_func.clone()))
    }
}

/// Remove proposed values that the relation stores under
/// `key_func(prefix)`: the negated counterpart of [`ExtendWith`].
pub struct ExtendAnti<'leap, Key, Val, Func> {
    relation: &'leap Relation<(Key, Val)>,
    key_func: Func,
}

impl<'leap, Key, Val, Func> ExtendAnti<'leap, Key, Val, Func> {
    /// Construct from a sorted `(key, value)` relation and an extractor
    /// mapping each prefix to the key to look up.
    pub fn new(relation: &'leap Relation<(Key, Val)>, key_func: Func) -> Self {
        Self { relation, key_func }
    }
}

impl<'leap, Key, Val, Prefix, Func> Leaper<'leap, Prefix, Val>
    for ExtendAnti<'leap, Key, Val, Func>
where
    Key: Ord + Sync + 'leap,
    Val: Ord + Sync + 'leap,
    Func: Fn(&Prefix) -> Key + Clone + Send + 'leap,
{
    fn count(&mut self, _prefix: &Prefix) -> usize {
        UNBOUNDED
    }

    fn propose(&mut self, _prefix: &Prefix, _values: &mut Vec<&'leap Val>) {
        unreachable!("anti leapers never have the minimum bounded count");
    }

    fn intersect(&mut self, prefix: &Prefix, values: &mut Vec<&'leap Val>) {
        let key = (self.key_func)(prefix);
        let head = gallop(self.relation, |pair| pair.0 < key);
        let tail = gallop(head, |pair| pair.0 <= key);
        let mut block = &head[..head.len() - tail.len()];
        values.retain(|value| {
            block = gallop(block, |pair| &pair.1 < *value);
            block.first().map_or(true, |pair| &pair.1 != *value)
        });
    }

    fn boxed_clone(&self) -> Box<dyn Leaper<'leap, Prefix, Val> + 'leap> {
        Box::new(Self::new(self.relation, self.key_func.clone()))
    }
}

/// For each recent tuple of `source`, intersect the leapers' value sets
/// and stage `logic(prefix, value)` for every survivor into `output`.
///
/// Per prefix: query every count, pick the smallest bounded one, skip the
/// prefix when that minimum is zero (some positive leaper is empty, or a
/// [`FilterAnti`] vetoed it) or when every leaper is unbounded (nothing
/// can propose). Otherwise the selected leaper proposes and the rest
/// narrow the proposal.
///
/// With a worker pool the recent tuples are processed in chunks, each
/// chunk against its own leaper clones; per-chunk buffers concatenate in
/// chunk order, so the staged relation is deterministic.
pub fn extend_into<'leap, Prefix, Value: 'leap, Out>(
    ctx: &Context,
    source: &Variable<Prefix>,
    leapers: &mut [Box<dyn Leaper<'leap, Prefix, Value> + 'leap>],
    output: &Variable<Out>,
    logic: impl Fn(&Prefix, &Value) -> Out + Send + Sync,
) where
    Prefix: Tuple,
    Out: Tuple,
{
    let recent = source.recent();

    let results = match ctx.pool() {
        Some(_) if recent.len() > PARALLEL_CHUNK => {
            let tasks: Vec<(&[Prefix], Vec<Box<dyn Leaper<'leap, Prefix, Value> + 'leap>>)> =
                recent
                    .chunks(PARALLEL_CHUNK)
                    .map(|chunk| (chunk, leapers.iter().map(|l| l.boxed_clone()).collect()))
                    .collect();
            let buffers = ctx.run_owned_tasks(tasks, |(chunk, mut clones)| {
                extend_chunk(chunk, &mut clones, &logic)
            });
            let mut results = Vec::with_capacity(buffers.iter().map(Vec::len).sum());
            for buffer in buffers {
                results.extend(buffer);
            }
            results
        }
        _ => extend_chunk(recent.elements(), leapers, &logic),
    };

    drop(recent);
    output.insert_relation(Relation::from_vec(ctx, results));
}

fn extend_chunk<'leap, Prefix, Value: 'leap, Out>(
    chunk: &[Prefix],
    leapers: &mut [Box<dyn Leaper<'leap, Prefix, Value> + 'leap>],
    logic: &(impl Fn(&Prefix, &Value) -> Out + Send + Sync),
) -> Vec<Out> {
    let mut buffer = Vec::new();
    let mut values: Vec<&'leap Value> = Vec::new();
    for prefix in chunk {
        let mut min_index = 0;
        let mut min_count = UNBOUNDED;
        for (index, leaper) in leapers.iter_mut().enumerate() {
            let count = leaper.count(prefix);
            if count < min_count {
                min_count = count;
                min_index = index;
            }
        }
        if min_count == 0 || min_count == UNBOUNDED {
            continue;
        }

        values.clear();
        leapers[min_index].propose(prefix, &mut values);
        for (index, leaper) in leapers.iter_mut().enumerate() {
            if index != min_index && !values.is_empty() {
                leaper.intersect(prefix, &mut values);
            }
        }
        for value in &values {
            buffer.push(logic(prefix, value));
        }
    }
    buffer
}
