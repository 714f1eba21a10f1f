//! Sorted, deduplicated tuple storage.

use std::cmp::Ordering;
use std::ops::Deref;

use crate::context::{Context, PARALLEL_MERGE_MIN, PARALLEL_SORT_MIN};
use crate::tuple::Tuple;

/// An immutable set of tuples, materialized as a strictly increasing
/// sequence in one contiguous buffer.
///
/// Relations are the unit of storage everywhere in the engine: a
/// [`Variable`](crate::Variable) is a handful of relations, every operator
/// finishes by building one, and the persistence layer reads and writes
/// them. Construction always sorts and deduplicates, so holding a
/// `Relation` is proof the invariant holds.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Relation<T> {
    pub(crate) elements: Vec<T>,
}

impl<T> Relation<T> {
    /// The empty relation. Does not allocate.
    pub fn empty() -> Self {
        Self {
            elements: Vec::new(),
        }
    }

    /// Number of tuples.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the relation holds no tuples.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Iterate over the tuples in ascending order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.elements.iter()
    }

    /// The sorted tuples as a slice.
    pub fn elements(&self) -> &[T] {
        &self.elements
    }

    /// Consume the relation, returning its buffer.
    pub fn into_vec(self) -> Vec<T> {
        self.elements
    }
}

impl<T: Tuple> Relation<T> {
    /// Build a relation from an unsorted, possibly duplicated buffer.
    ///
    /// Sorts (on the context's pool for large inputs) and compacts
    /// duplicates in one pass.
    pub fn from_vec(ctx: &Context, mut elements: Vec<T>) -> Self {
        match ctx.pool() {
            Some(pool) if elements.len() >= PARALLEL_SORT_MIN => {
                use rayon::prelude::*;
                pool.install(|| elements.par_sort_unstable());
            }
            _ => elements.sort_unstable(),
        }
        elements.dedup();
        Self { elements }
    }

    /// Set union of two relations, consuming both operands.
    ///
    /// Linear in-order merge; equal elements are written once. When one
    /// operand is empty or the key ranges do not overlap, the surviving
    /// buffer is handed back without copying elements one at a time.
    pub fn merge(self, other: Self) -> Self {
        let mut first = self.elements;
        let mut second = other.elements;
        if first.is_empty() {
            return Self { elements: second };
        }
        if second.is_empty() {
            return Self { elements: first };
        }
        if first.last() < second.first() {
            first.append(&mut second);
            return Self { elements: first };
        }
        if second.last() < first.first() {
            second.append(&mut first);
            return Self { elements: second };
        }
        Self {
            elements: merge_interleaved(first, second),
        }
    }

    /// Context-aware merge: large overlapping merges split in two across
    /// the pool, each half merged independently and concatenated.
    pub(crate) fn merge_ctx(self, other: Self, ctx: &Context) -> Self {
        let pool = match ctx.pool() {
            Some(pool) if self.len() >= PARALLEL_MERGE_MIN && other.len() >= PARALLEL_MERGE_MIN => {
                pool
            }
            _ => return self.merge(other),
        };

        // Orient so the pivot comes from the longer side.
        let (longer, shorter) = if self.len() >= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        let mid = longer.len() / 2;
        let split = shorter.partition_point(|x| x < &longer.elements[mid]);

        let mut long_el = longer.elements;
        let long_hi = long_el.split_off(mid);
        let mut short_el = shorter.elements;
        let short_hi = short_el.split_off(split);

        // Low halves are strictly below the pivot, high halves at or above
        // it, so no duplicate can straddle the seam.
        let (mut low, high) = pool.install(|| {
            rayon::join(
                || merge_interleaved(long_el, short_el),
                || merge_interleaved(long_hi, short_hi),
            )
        });
        low.extend(high);
        Self { elements: low }
    }
}

/// Merge two sorted deduplicated buffers whose ranges overlap.
fn merge_interleaved<T: Ord>(first: Vec<T>, second: Vec<T>) -> Vec<T> {
    let mut out = Vec::with_capacity(first.len() + second.len());
    let mut first = first.into_iter().peekable();
    let mut second = second.into_iter().peekable();
    while let (Some(x), Some(y)) = (first.peek(), second.peek()) {
        match x.cmp(y) {
            Ordering::Less => out.extend(first.next()),
            Ordering::Greater => out.extend(second.next()),
            Ordering::Equal => {
                out.extend(first.next());
                second.next();
            }
        }
    }
    out.extend(first);
    out.extend(second);
    out
}

impl<T: Tuple> From<Vec<T>> for Relation<T> {
    fn from(mut elements: Vec<T>) -> Self {
        elements.sort_unstable();
        elements.dedup();
        Self { elements }
    }
}

impl<T: Tuple> FromIterator<T> for Relation<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<T>>())
    }
}

impl<T> Deref for Relation<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.elements
    }
}

impl<'a, T> IntoIterator for &'a Relation<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}
