//! Secondary index: an ordered map from extracted keys to relation buckets.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use crate::context::Context;
use crate::relation::Relation;
use crate::tuple::Tuple;

/// An ordered map from `key_func(tuple)` to the bucket of tuples sharing
/// that key, for point and range lookups outside the fixed-point loop.
///
/// Buckets are relations, so each is sorted and deduplicated; inserting a
/// tuple merges a singleton into its bucket. Backed by the standard
/// B-tree map, which fixes its own branching.
pub struct SecondaryIndex<Key, T, Func>
where
    Key: Tuple,
    T: Tuple,
    Func: Fn(&T) -> Key,
{
    key_func: Func,
    buckets: BTreeMap<Key, Relation<T>>,
}

impl<Key, T, Func> SecondaryIndex<Key, T, Func>
where
    Key: Tuple,
    T: Tuple,
    Func: Fn(&T) -> Key,
{
    /// An empty index over the given extractor.
    pub fn new(key_func: Func) -> Self {
        Self {
            key_func,
            buckets: BTreeMap::new(),
        }
    }

    /// Index every tuple of a relation.
    pub fn from_relation(relation: &Relation<T>, key_func: Func) -> Self {
        let mut index = Self::new(key_func);
        for tuple in relation {
            index.insert(tuple.clone());
        }
        index
    }

    /// Insert one tuple under its extracted key.
    pub fn insert(&mut self, tuple: T) {
        let key = (self.key_func)(&tuple);
        let singleton = Relation::from(vec![tuple]);
        let bucket = self.buckets.remove(&key).unwrap_or_else(Relation::empty);
        self.buckets.insert(key, bucket.merge(singleton));
    }

    /// Insert a batch of tuples.
    pub fn extend(&mut self, tuples: impl IntoIterator<Item = T>) {
        for tuple in tuples {
            self.insert(tuple);
        }
    }

    /// The bucket stored under `key`, if any.
    pub fn get(&self, key: &Key) -> Option<&Relation<T>> {
        self.buckets.get(key)
    }

    /// A fresh relation holding every tuple whose key falls in the
    /// inclusive range, gathered in key order.
    pub fn get_range(&self, ctx: &Context, range: RangeInclusive<Key>) -> Relation<T> {
        let mut staged = Vec::new();
        for bucket in self.buckets.range(range).map(|(_, bucket)| bucket) {
            staged.extend(bucket.iter().cloned());
        }
        Relation::from_vec(ctx, staged)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether the index holds no tuples.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Iterate over `(key, bucket)` entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Relation<T>)> {
        self.buckets.iter()
    }
}
