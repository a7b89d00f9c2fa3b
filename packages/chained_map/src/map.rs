use std::alloc::Layout;
use std::fmt;
use std::hash::Hash;
use std::num::NonZero;

use new_zealand::nz;

use crate::{EqFn, Error, HashFn, Link, Pair, Result, default_eq, default_hash, try_box};

/// A hash table with a fixed number of buckets that resolves collisions by separate chaining.
///
/// Each bucket is the head of a singly linked chain of [`Pair`]s. The hash function `H` decides
/// the bucket of a key (`hash(key) mod bucket_count`) and the equality function `E` decides which
/// pair in that chain, if any, holds the key. The two functions must be consistent:
/// `eq(a, b)` implies `hash(a) == hash(b)`. The map imposes no other requirements on `K`.
///
/// The map stores keys and values exactly as given. It never clones them and never looks through
/// them, so `K` and `V` are typically cheap handles such as references or integer IDs whose
/// referents are owned elsewhere.
///
/// # Fixed capacity
///
/// The bucket count is chosen at creation time and never changes. The map does not rehash or
/// grow, so operations cost O(chain length). With a poor hash function or many more keys than
/// buckets, every operation degrades to O(n).
///
/// # Example
///
/// ```
/// use chained_map::ChainedMap;
/// use new_zealand::nz;
///
/// let mut map = ChainedMap::new(
///     nz!(4),
///     |key: &u32| u64::from(*key % 4),
///     |a: &u32, b: &u32| a == b,
/// )
/// .unwrap();
///
/// // 1 and 5 land in the same bucket.
/// map.set(1, "a").unwrap();
/// map.set(5, "b").unwrap();
///
/// assert_eq!(map.get(&1).map(|pair| *pair.value()), Some("a"));
/// assert_eq!(map.get(&5).map(|pair| *pair.value()), Some("b"));
///
/// map.delete(&1);
///
/// assert!(map.get(&1).is_none());
/// assert_eq!(map.get(&5).map(|pair| *pair.value()), Some("b"));
/// ```
///
/// # Thread safety
///
/// The map performs no internal synchronization. It is [`Send`] and [`Sync`] whenever its keys,
/// values and functions are, and shared mutation requires external locking.
pub struct ChainedMap<K, V, H, E> {
    /// Bucket heads. The length is `bucket_count` and never changes.
    buckets: Vec<Link<K, V>>,

    bucket_count: NonZero<usize>,

    hash: H,
    eq: E,

    /// Number of pairs across all chains. We track this explicitly to avoid walking every chain
    /// when calculating the length.
    length: usize,
}

/// A [`ChainedMap`] that hashes keys with `foldhash` and compares them with [`Eq`].
pub type DefaultChainedMap<K, V> = ChainedMap<K, V, HashFn<K>, EqFn<K>>;

/// The bucket count used by [`ChainedMapBuilder`][crate::ChainedMapBuilder] unless another one is specified.
pub const DEFAULT_BUCKET_COUNT: NonZero<usize> = nz!(64);

impl<K, V> DefaultChainedMap<K, V>
where
    K: Hash + Eq,
{
    /// Creates a map whose keys are hashed with `foldhash` (fixed seed) and compared with `==`.
    ///
    /// # Errors
    ///
    /// Returns an error if the bucket array cannot be allocated.
    ///
    /// # Example
    ///
    /// ```
    /// use chained_map::ChainedMap;
    /// use new_zealand::nz;
    ///
    /// let mut map = ChainedMap::with_default_hasher(nz!(32)).unwrap();
    ///
    /// map.set("apples", 3).unwrap();
    /// map.set("pears", 5).unwrap();
    ///
    /// assert_eq!(map.get(&"pears").map(|pair| *pair.value()), Some(5));
    /// ```
    pub fn with_default_hasher(bucket_count: NonZero<usize>) -> Result<Self> {
        Self::new(bucket_count, default_hash::<K>, default_eq::<K>)
    }
}

impl<K, V, H, E> ChainedMap<K, V, H, E>
where
    H: Fn(&K) -> u64,
    E: Fn(&K, &K) -> bool,
{
    /// Creates a map with `bucket_count` empty buckets that uses `hash` to pick the bucket of
    /// a key and `eq` to compare keys within a bucket.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityOverflow`] if the bucket array is too large to describe and
    /// [`Error::AllocationFailed`] if the allocator cannot provide it.
    pub fn new(bucket_count: NonZero<usize>, hash: H, eq: E) -> Result<Self> {
        let layout = Layout::array::<Link<K, V>>(bucket_count.get()).map_err(|layout_error| {
            tracing::warn!(
                bucket_count = bucket_count.get(),
                %layout_error,
                "bucket array size is not representable"
            );

            Error::CapacityOverflow {
                bucket_count: bucket_count.get(),
            }
        })?;

        let mut buckets = Vec::new();

        buckets
            .try_reserve_exact(bucket_count.get())
            .map_err(|reserve_error| {
                tracing::warn!(
                    bucket_count = bucket_count.get(),
                    %reserve_error,
                    "allocator refused memory for the bucket array"
                );

                Error::AllocationFailed { layout }
            })?;

        buckets.resize_with(bucket_count.get(), || None);

        tracing::debug!(bucket_count = bucket_count.get(), "created chained map");

        Ok(Self {
            buckets,
            bucket_count,
            hash,
            eq,
            length: 0,
        })
    }

    /// The number of pairs in the map.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether the map holds no pairs.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// The number of buckets, fixed when the map was created.
    #[must_use]
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.bucket_count.get()
    }

    /// The index of the bucket whose chain holds (or would hold) `key`.
    #[must_use]
    pub fn bucket_index(&self, key: &K) -> usize {
        bucket_of(&self.hash, self.bucket_count, key)
    }

    /// The number of pairs in the chain of the bucket at `bucket_index`.
    ///
    /// # Panics
    ///
    /// Panics if `bucket_index` is not less than [`bucket_count()`](Self::bucket_count).
    #[must_use]
    pub fn chain_len(&self, bucket_index: usize) -> usize {
        let head = self.buckets.get(bucket_index).unwrap_or_else(|| {
            panic!(
                "bucket {bucket_index} is out of bounds in map of {} buckets",
                self.bucket_count
            )
        });

        let mut count: usize = 0;
        let mut cursor = head.as_deref();

        while let Some(pair) = cursor {
            // Cannot overflow because every pair is a separate allocation.
            count = count.wrapping_add(1);
            cursor = pair.next.as_deref();
        }

        count
    }

    /// Associates `value` with `key` and returns the resident pair.
    ///
    /// If the chain already holds a key equal to `key`, only that pair's value is replaced; the
    /// stored key is kept and the given `key` is dropped. Otherwise a new pair is appended at the
    /// tail of the chain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailed`] if a new pair was needed but could not be allocated.
    /// The map is unchanged in that case.
    ///
    /// # Example
    ///
    /// ```
    /// use chained_map::ChainedMap;
    /// use new_zealand::nz;
    ///
    /// let mut map = ChainedMap::with_default_hasher(nz!(8)).unwrap();
    ///
    /// map.set(7, "first").unwrap();
    /// let pair = map.set(7, "second").unwrap();
    ///
    /// assert_eq!(*pair.value(), "second");
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn set(&mut self, key: K, value: V) -> Result<&mut Pair<K, V>> {
        let bucket_index = self.bucket_index(&key);

        #[cfg(debug_assertions)]
        self.chain_placement_check(bucket_index);

        let head = self
            .buckets
            .get_mut(bucket_index)
            .expect("bucket index is always less than bucket count");

        let slot = find_slot(head, &self.eq, &key);

        if let Some(pair) = slot.as_mut() {
            pair.replace_value(value);
        } else {
            // The slot is the `next` link of the chain's last pair or the empty bucket head,
            // so filling it is all it takes to append.
            *slot = Some(try_box(Pair::new(key, value))?);

            // Cannot overflow because every pair is a separate allocation.
            self.length = self.length.wrapping_add(1);
        }

        let pair = slot
            .as_deref_mut()
            .expect("slot was either occupied or filled above");

        // The rest of the chain was checked above and only this pair can have changed.
        debug_assert_eq!(
            bucket_of(&self.hash, self.bucket_count, pair.key()),
            bucket_index,
            "pair stored in bucket {bucket_index} hashes to a different bucket"
        );

        Ok(pair)
    }

    /// Returns the pair whose key is equal to `key`, if any.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&Pair<K, V>> {
        let mut cursor = self
            .buckets
            .get(self.bucket_index(key))
            .expect("bucket index is always less than bucket count")
            .as_deref();

        while let Some(pair) = cursor {
            if (self.eq)(pair.key(), key) {
                return Some(pair);
            }

            cursor = pair.next.as_deref();
        }

        None
    }

    /// Returns the pair whose key is equal to `key`, if any, with its value open for updates.
    #[must_use]
    pub fn get_mut(&mut self, key: &K) -> Option<&mut Pair<K, V>> {
        let bucket_index = self.bucket_index(key);

        let head = self
            .buckets
            .get_mut(bucket_index)
            .expect("bucket index is always less than bucket count");

        find_slot(head, &self.eq, key).as_deref_mut()
    }

    /// Removes the pair whose key is equal to `key` and hands its key and value back.
    ///
    /// Does nothing and returns `None` if there is no such pair.
    ///
    /// # Example
    ///
    /// ```
    /// use chained_map::ChainedMap;
    /// use new_zealand::nz;
    ///
    /// let mut map = ChainedMap::with_default_hasher(nz!(8)).unwrap();
    /// map.set("key", 1).unwrap();
    ///
    /// assert_eq!(map.delete(&"key"), Some(("key", 1)));
    /// assert_eq!(map.delete(&"key"), None);
    /// assert!(map.is_empty());
    /// ```
    pub fn delete(&mut self, key: &K) -> Option<(K, V)> {
        let bucket_index = self.bucket_index(key);

        let head = self
            .buckets
            .get_mut(bucket_index)
            .expect("bucket index is always less than bucket count");

        let slot = find_slot(head, &self.eq, key);

        let (stored_key, value, next) = slot.take()?.into_parts();

        // The slot is either the bucket head or the previous pair's `next` link.
        *slot = next;

        self.length = self
            .length
            .checked_sub(1)
            .expect("we just removed a pair, so the length must be non-zero");

        #[cfg(debug_assertions)]
        self.chain_placement_check(bucket_index);

        Some((stored_key, value))
    }

    /// Checks that every pair in one chain hashes to that chain's bucket and returns the
    /// chain length. Calls `hash` once per pair and never calls `eq`.
    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(debug_assertions)]
    fn chain_placement_check(&self, bucket_index: usize) -> usize {
        let head = self
            .buckets
            .get(bucket_index)
            .expect("bucket index is always less than bucket count");

        let mut chain_len: usize = 0;
        let mut cursor = head.as_deref();

        while let Some(pair) = cursor {
            assert_eq!(
                self.bucket_index(pair.key()),
                bucket_index,
                "pair found in bucket {bucket_index} hashes to a different bucket"
            );

            chain_len = chain_len.wrapping_add(1);
            cursor = pair.next.as_deref();
        }

        chain_len
    }

    /// Full validation: placement, key uniqueness within each chain and the tracked length.
    /// Quadratic in chain length.
    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(all(test, debug_assertions))]
    pub(crate) fn integrity_check(&self) {
        let mut observed_length: usize = 0;

        for (bucket_index, head) in self.buckets.iter().enumerate() {
            let chain_len = self.chain_placement_check(bucket_index);
            observed_length = observed_length.wrapping_add(chain_len);

            let mut cursor = head.as_deref();

            while let Some(pair) = cursor {
                let mut later = pair.next.as_deref();

                while let Some(later_pair) = later {
                    assert!(
                        !(self.eq)(pair.key(), later_pair.key()),
                        "bucket {bucket_index} holds two pairs with equal keys"
                    );

                    later = later_pair.next.as_deref();
                }

                cursor = pair.next.as_deref();
            }
        }

        assert_eq!(
            self.length, observed_length,
            "self.length {} does not match the observed pair count {}",
            self.length, observed_length
        );
    }
}

/// `hash(key) mod bucket_count`, as a bucket index.
fn bucket_of<K, H>(hash: &H, bucket_count: NonZero<usize>, key: &K) -> usize
where
    H: Fn(&K) -> u64,
{
    let bucket_count = u64::try_from(bucket_count.get()).expect("usize always fits in u64");

    let remainder = hash(key)
        .checked_rem(bucket_count)
        .expect("bucket count is non-zero");

    usize::try_from(remainder).expect("remainder is less than the bucket count, a usize")
}

/// Walks the chain starting at `head` and returns the link that holds the pair with a key equal
/// to `key`. If there is no such pair, returns the empty link at the end of the chain, which is
/// where a new pair for `key` belongs.
fn find_slot<'c, K, V, E>(mut cursor: &'c mut Link<K, V>, eq: &E, key: &K) -> &'c mut Link<K, V>
where
    E: Fn(&K, &K) -> bool,
{
    while cursor.as_ref().is_some_and(|pair| !eq(pair.key(), key)) {
        cursor = &mut cursor
            .as_mut()
            .expect("guarded by loop condition")
            .next;
    }

    cursor
}

impl<K, V, H, E> Drop for ChainedMap<K, V, H, E> {
    fn drop(&mut self) {
        // Unlink pairs one at a time. Dropping a head would otherwise drop its successors
        // recursively, which can overflow the stack on long chains.
        for head in &mut self.buckets {
            let mut link = head.take();

            while let Some(mut pair) = link {
                link = pair.next.take();
            }
        }
    }
}

impl<K, V, H, E> fmt::Debug for ChainedMap<K, V, H, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainedMap")
            .field("bucket_count", &self.bucket_count)
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(
    clippy::indexing_slicing,
    clippy::cast_possible_truncation,
    reason = "tests focus on succinct code and do not need to tick all the boxes"
)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use static_assertions::{assert_impl_all, assert_not_impl_any};
    use tracing_test::traced_test;

    use super::*;

    type ModMap<V> = ChainedMap<u32, V, fn(&u32) -> u64, fn(&u32, &u32) -> bool>;

    fn mod_map<V>(bucket_count: NonZero<usize>) -> ModMap<V> {
        fn hash(key: &u32) -> u64 {
            u64::from(*key)
        }

        fn eq(a: &u32, b: &u32) -> bool {
            a == b
        }

        ChainedMap::new(bucket_count, hash as fn(&u32) -> u64, eq as fn(&u32, &u32) -> bool)
            .unwrap()
    }

    assert_impl_all!(DefaultChainedMap<u32, &'static str>: Send, Sync, fmt::Debug);
    assert_not_impl_any!(DefaultChainedMap<Rc<u32>, u32>: Send, Sync);

    #[test]
    fn smoke_test() {
        let mut map = mod_map(nz!(4));

        assert!(map.is_empty());
        assert_eq!(map.bucket_count(), 4);

        map.set(1, "a").unwrap();
        map.set(5, "b").unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(map.chain_len(1), 2);

        assert_eq!(*map.get(&1).unwrap().value(), "a");
        assert_eq!(*map.get(&5).unwrap().value(), "b");

        assert_eq!(map.delete(&1), Some((1, "a")));

        assert!(map.get(&1).is_none());
        assert_eq!(*map.get(&5).unwrap().value(), "b");
        assert_eq!(map.chain_len(1), 1);
        assert_eq!(map.len(), 1);

        map.integrity_check();
    }

    #[test]
    fn set_existing_key_replaces_value_only() {
        // Keys are equal when they agree modulo 100, so the stored key must survive updates.
        let mut map = ChainedMap::new(
            nz!(4),
            |key: &u32| u64::from(*key % 100),
            |a: &u32, b: &u32| a % 100 == b % 100,
        )
        .unwrap();

        map.set(7, "first").unwrap();
        let pair = map.set(107, "second").unwrap();

        assert_eq!(*pair.key(), 7);
        assert_eq!(*pair.value(), "second");
        assert_eq!(map.len(), 1);
        assert_eq!(*map.get(&207).unwrap().value(), "second");
    }

    #[test]
    fn set_returns_resident_pair() {
        let mut map = mod_map(nz!(4));

        let pair = map.set(3, 30).unwrap();
        *pair.value_mut() += 1;

        assert_eq!(*map.get(&3).unwrap().value(), 31);
    }

    #[test]
    fn update_at_head_mid_and_tail_of_chain() {
        let mut map = mod_map(nz!(1));

        for key in 0..4 {
            map.set(key, key * 10).unwrap();
        }

        // Head, middle and tail of the single chain.
        map.set(0, 100).unwrap();
        map.set(2, 102).unwrap();
        map.set(3, 103).unwrap();

        assert_eq!(map.len(), 4);
        assert_eq!(map.chain_len(0), 4);

        assert_eq!(*map.get(&0).unwrap().value(), 100);
        assert_eq!(*map.get(&1).unwrap().value(), 10);
        assert_eq!(*map.get(&2).unwrap().value(), 102);
        assert_eq!(*map.get(&3).unwrap().value(), 103);
    }

    #[test]
    fn append_after_mismatch_links_new_pair() {
        let mut map = mod_map(nz!(2));

        // All even keys share bucket 0. Every insert after the first must be reachable.
        for key in (0..20).step_by(2) {
            map.set(key, key).unwrap();
            assert_eq!(*map.get(&key).unwrap().value(), key);
        }

        assert_eq!(map.chain_len(0), 10);
        assert_eq!(map.chain_len(1), 0);
    }

    #[test]
    fn delete_head_middle_and_tail() {
        let mut map = mod_map(nz!(1));

        for key in 0..5 {
            map.set(key, key).unwrap();
        }

        assert_eq!(map.delete(&0), Some((0, 0)));
        assert_eq!(map.delete(&2), Some((2, 2)));
        assert_eq!(map.delete(&4), Some((4, 4)));

        assert_eq!(map.chain_len(0), 2);
        assert_eq!(*map.get(&1).unwrap().value(), 1);
        assert_eq!(*map.get(&3).unwrap().value(), 3);

        // Appending after deleting the tail must still link up.
        map.set(9, 9).unwrap();
        assert_eq!(map.chain_len(0), 3);
        assert_eq!(*map.get(&9).unwrap().value(), 9);

        map.integrity_check();
    }

    #[test]
    fn delete_missing_key_is_noop() {
        let mut map = mod_map(nz!(4));

        map.set(1, "a").unwrap();
        map.set(5, "b").unwrap();

        assert_eq!(map.delete(&9), None);
        assert_eq!(map.delete(&2), None);

        assert_eq!(map.len(), 2);
        assert_eq!(map.chain_len(1), 2);
        assert_eq!(*map.get(&1).unwrap().value(), "a");
        assert_eq!(*map.get(&5).unwrap().value(), "b");
    }

    #[test]
    fn get_mut_updates_value() {
        let mut map = mod_map(nz!(4));

        map.set(1, String::from("a")).unwrap();
        map.get_mut(&1).unwrap().value_mut().push('b');

        assert_eq!(map.get(&1).unwrap().value(), "ab");
        assert!(map.get_mut(&2).is_none());
    }

    #[test]
    fn bucket_index_is_hash_modulo_bucket_count() {
        let map = mod_map::<()>(nz!(7));

        assert_eq!(map.bucket_index(&0), 0);
        assert_eq!(map.bucket_index(&6), 6);
        assert_eq!(map.bucket_index(&7), 0);
        assert_eq!(map.bucket_index(&23), 2);
    }

    #[test]
    fn full_range_hash_values_map_into_buckets() {
        let map: ChainedMap<u8, (), _, _> =
            ChainedMap::new(nz!(10), |_: &u8| u64::MAX, |a: &u8, b: &u8| a == b).unwrap();

        assert_eq!(map.bucket_index(&0), (u64::MAX % 10) as usize);
    }

    #[test]
    #[should_panic]
    fn chain_len_out_of_bounds_panics() {
        let map = mod_map::<()>(nz!(4));

        _ = map.chain_len(4);
    }

    #[test]
    fn borrowed_keys_and_values_are_not_copied() {
        let keys = [String::from("alpha"), String::from("beta")];
        let values = [vec![1, 2, 3], vec![4]];

        let mut map = ChainedMap::with_default_hasher(nz!(4)).unwrap();

        map.set(&keys[0], &values[0]).unwrap();
        map.set(&keys[1], &values[1]).unwrap();

        let stored = *map.get(&&keys[0]).unwrap().value();
        assert!(std::ptr::eq(stored, &values[0]));

        let stored_key = *map.get(&&keys[1]).unwrap().key();
        assert!(std::ptr::eq(stored_key, &keys[1]));
    }

    #[test]
    fn hash_and_eq_are_called_with_stored_keys() {
        let hash_calls = Cell::new(0_usize);
        let compared = RefCell::new(Vec::new());

        let mut map = ChainedMap::new(
            nz!(1),
            |_: &u32| {
                hash_calls.set(hash_calls.get() + 1);
                0
            },
            |stored: &u32, query: &u32| {
                compared.borrow_mut().push((*stored, *query));
                stored == query
            },
        )
        .unwrap();

        map.set(1, ()).unwrap();
        map.set(2, ()).unwrap();

        compared.borrow_mut().clear();
        assert!(map.get(&2).is_some());

        // Chain order is insertion order: 1 is visited before 2.
        assert_eq!(*compared.borrow(), vec![(1, 2), (2, 2)]);
        assert!(hash_calls.get() > 0);
    }

    #[test]
    fn appending_to_long_chain_compares_each_stored_key_once() {
        let hash_calls = Cell::new(0_usize);
        let eq_calls = Cell::new(0_usize);

        let mut map = ChainedMap::new(
            nz!(1),
            |_: &u32| {
                hash_calls.set(hash_calls.get() + 1);
                0
            },
            |a: &u32, b: &u32| {
                eq_calls.set(eq_calls.get() + 1);
                a == b
            },
        )
        .unwrap();

        for key in 0..1000 {
            map.set(key, ()).unwrap();
        }

        hash_calls.set(0);
        eq_calls.set(0);

        map.set(1000, ()).unwrap();

        assert_eq!(eq_calls.get(), 1000);

        // One call to pick the bucket. Debug builds add one per stored pair plus one for the
        // appended pair to check placement.
        assert!(hash_calls.get() <= 1002, "{} hash calls", hash_calls.get());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic]
    fn set_detects_pair_hashing_to_another_bucket() {
        let next_hash = Cell::new(0_u64);

        let mut map = ChainedMap::new(
            nz!(2),
            |_: &u32| {
                let hash = next_hash.get();
                next_hash.set(hash + 1);
                hash
            },
            |a: &u32, b: &u32| a == b,
        )
        .unwrap();

        // Goes into bucket 0 but hashes to bucket 1 when checked after the append.
        map.set(1, ()).unwrap();
    }

    #[test]
    fn drop_releases_all_pairs() {
        struct Droppable {
            drops: Rc<Cell<usize>>,
        }

        impl Drop for Droppable {
            fn drop(&mut self) {
                self.drops.set(self.drops.get() + 1);
            }
        }

        let drops = Rc::new(Cell::new(0));

        {
            let mut map = mod_map(nz!(3));

            for key in 0..10 {
                map.set(
                    key,
                    Droppable {
                        drops: Rc::clone(&drops),
                    },
                )
                .unwrap();
            }
        }

        assert_eq!(drops.get(), 10);
    }

    #[test]
    fn drop_long_chain_does_not_overflow_stack() {
        let mut map = ChainedMap::new(nz!(1), |_: &u32| 0, |a: &u32, b: &u32| a == b).unwrap();

        // Built by hand to skip the quadratic cost of appending to one chain.
        let mut link: Link<u32, ()> = None;

        for key in 0..200_000 {
            let mut pair = Box::new(Pair::new(key, ()));
            pair.next = link;
            link = Some(pair);
        }

        map.buckets[0] = link;
        map.length = 200_000;

        drop(map);
    }

    #[test]
    fn bucket_array_too_large_to_describe_is_error() {
        let result = ChainedMap::<u64, u64, _, _>::new(
            NonZero::new(usize::MAX).unwrap(),
            |key: &u64| *key,
            |a: &u64, b: &u64| a == b,
        );

        assert!(matches!(
            result,
            Err(Error::CapacityOverflow {
                bucket_count: usize::MAX
            })
        ));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    #[cfg_attr(miri, ignore = "Miri reports oversized allocations as errors")]
    #[traced_test]
    fn bucket_array_too_large_to_allocate_is_error() {
        // 2^58 buckets of 8 bytes each is a valid layout that no allocator can satisfy.
        let result = ChainedMap::<u64, u64, _, _>::new(
            NonZero::new(1_usize << 58).unwrap(),
            |key: &u64| *key,
            |a: &u64, b: &u64| a == b,
        );

        assert!(matches!(result, Err(Error::AllocationFailed { .. })));
        assert!(logs_contain("allocator refused memory for the bucket array"));
    }

    #[test]
    #[traced_test]
    fn creation_is_logged() {
        let _map = mod_map::<()>(nz!(4));

        assert!(logs_contain("created chained map"));
        assert!(logs_contain("bucket_count=4"));
    }

    #[test]
    fn debug_output_names_type() {
        let map = mod_map::<()>(nz!(2));

        let debug_output = format!("{map:?}");
        assert!(debug_output.contains("ChainedMap"));
        assert!(debug_output.contains("bucket_count"));
    }
}
