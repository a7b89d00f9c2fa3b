//! End-to-end scenarios exercising the public API of `chained_map`.

use chained_map::{ChainedMap, ChainedMapBuilder, Error};
use new_zealand::nz;

fn mod4(key: &u32) -> u64 {
    u64::from(*key % 4)
}

fn int_eq(a: &u32, b: &u32) -> bool {
    a == b
}

#[test]
fn colliding_keys_survive_deletion_of_neighbor() {
    let mut map = ChainedMap::new(nz!(4), mod4, int_eq).unwrap();

    map.set(1, "a").unwrap();
    map.set(5, "b").unwrap();

    assert_eq!(map.bucket_index(&1), map.bucket_index(&5));
    assert_eq!(map.get(&1).map(|pair| *pair.value()), Some("a"));
    assert_eq!(map.get(&5).map(|pair| *pair.value()), Some("b"));

    map.delete(&1);

    assert!(map.get(&1).is_none());
    assert_eq!(map.get(&5).map(|pair| *pair.value()), Some("b"));
}

#[test]
fn last_set_value_wins() {
    let first = String::from("first");
    let second = String::from("second");

    let mut map = ChainedMap::new(nz!(4), mod4, int_eq).unwrap();

    map.set(3, &first).unwrap();
    map.set(3, &second).unwrap();

    assert_eq!(map.len(), 1);
    assert_eq!(map.chain_len(3), 1);
    assert!(std::ptr::eq(*map.get(&3).unwrap().value(), &second));
}

#[test]
fn delete_shrinks_chain_by_one() {
    let mut map = ChainedMap::new(nz!(4), mod4, int_eq).unwrap();

    for key in [2, 6, 10, 14] {
        map.set(key, key).unwrap();
    }

    assert_eq!(map.chain_len(2), 4);

    map.delete(&10);
    assert_eq!(map.chain_len(2), 3);

    map.delete(&10);
    assert_eq!(map.chain_len(2), 3);
}

#[test]
fn round_trip_many_keys() {
    let mut map = ChainedMap::with_default_hasher(nz!(61)).unwrap();

    for key in 0..1000_u32 {
        map.set(key, key).unwrap();
    }

    // Overwrite every third key.
    for key in (0..1000_u32).step_by(3) {
        map.set(key, key + 1_000_000).unwrap();
    }

    assert_eq!(map.len(), 1000);

    for key in 0..1000_u32 {
        let expected = if key % 3 == 0 { key + 1_000_000 } else { key };
        assert_eq!(*map.get(&key).unwrap().value(), expected);
    }

    let total_chain_len: usize = (0..map.bucket_count()).map(|b| map.chain_len(b)).sum();
    assert_eq!(total_chain_len, 1000);
}

#[test]
fn single_bucket_map_is_a_list() {
    let mut map = ChainedMapBuilder::new()
        .bucket_count(nz!(1))
        .build(|_: &&str| 0, |a: &&str, b: &&str| a == b)
        .unwrap();

    for word in ["one", "two", "three", "four"] {
        map.set(word, word.len()).unwrap();
    }

    assert_eq!(map.chain_len(0), 4);
    assert_eq!(map.delete(&"two"), Some(("two", 3)));
    assert_eq!(map.get(&"four").map(|pair| *pair.value()), Some(4));
    assert_eq!(map.chain_len(0), 3);
}

#[test]
fn errors_are_distinguishable_from_not_found() {
    let map = ChainedMap::<u32, u32, _, _>::new(nz!(4), mod4, int_eq).unwrap();

    // Not found is an Option, never an Error.
    let not_found: Option<_> = map.get(&1);
    assert!(not_found.is_none());

    let overflow = ChainedMap::<u32, u32, _, _>::new(
        std::num::NonZero::new(usize::MAX).unwrap(),
        mod4,
        int_eq,
    );

    assert!(matches!(overflow, Err(Error::CapacityOverflow { .. })));
}
