//! Unit tests for the secondary index

use zodd::{Context, Relation, SecondaryIndex};

fn key_of(tuple: &(u32, u32)) -> u32 {
    tuple.0
}

#[test]
fn buckets_are_sorted_and_deduplicated() {
    let mut index = SecondaryIndex::new(key_of);
    index.extend(vec![(2, 21), (1, 10), (2, 20), (2, 21)]);

    let bucket = index.get(&2).expect("bucket for key 2");
    assert_eq!(bucket.elements(), &[(2, 20), (2, 21)]);
    assert_eq!(index.len(), 2);
}

#[test]
fn absent_key_returns_none() {
    let index: SecondaryIndex<u32, (u32, u32), _> = SecondaryIndex::new(key_of);
    assert!(index.get(&7).is_none());
    assert!(index.is_empty());
}

#[test]
fn from_relation_indexes_every_tuple() {
    let relation: Relation<(u32, u32)> =
        Relation::from(vec![(1, 10), (1, 11), (2, 20), (5, 50)]);
    let index = SecondaryIndex::from_relation(&relation, key_of);

    let total: usize = index.iter().map(|(_, bucket)| bucket.len()).sum();
    assert_eq!(total, relation.len());
    assert_eq!(index.get(&1).map(Relation::len), Some(2));
}

#[test]
fn range_query_gathers_buckets_in_key_order() {
    let ctx = Context::sequential();
    let mut index = SecondaryIndex::new(key_of);
    index.extend(vec![(5, 50), (1, 10), (3, 31), (3, 30), (9, 90)]);

    let middle = index.get_range(&ctx, 2..=5);
    assert_eq!(middle.elements(), &[(3, 30), (3, 31), (5, 50)]);

    let all = index.get_range(&ctx, 0..=u32::MAX);
    assert_eq!(all.len(), 5);

    let none = index.get_range(&ctx, 6..=8);
    assert!(none.is_empty());
}
