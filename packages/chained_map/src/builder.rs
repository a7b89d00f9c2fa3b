use std::cell::Cell;
use std::hash::Hash;
use std::marker::PhantomData;
use std::num::NonZero;

use crate::{ChainedMap, DEFAULT_BUCKET_COUNT, DefaultChainedMap, Result};

/// Builder for creating an instance of [`ChainedMap`].
///
/// All settings are optional. The hash and equality functions are supplied when building,
/// either explicitly via [`build()`](Self::build) or implicitly via
/// [`build_with_default_hasher()`](Self::build_with_default_hasher).
///
/// # Examples
///
/// ```
/// use chained_map::ChainedMapBuilder;
/// use new_zealand::nz;
///
/// let map = ChainedMapBuilder::new()
///     .bucket_count(nz!(128))
///     .build_with_default_hasher::<u64, &str>()
///     .unwrap();
///
/// assert_eq!(map.bucket_count(), 128);
/// ```
///
/// # Thread safety
///
/// The builder is thread-mobile ([`Send`]) but not thread-safe ([`Sync`]).
#[derive(Debug)]
#[must_use]
pub struct ChainedMapBuilder {
    bucket_count: NonZero<usize>,

    _not_sync: PhantomData<Cell<()>>,
}

impl ChainedMapBuilder {
    /// Creates a builder with [`DEFAULT_BUCKET_COUNT`] buckets.
    ///
    /// # Example
    ///
    /// ```
    /// use chained_map::ChainedMapBuilder;
    /// use new_zealand::nz;
    ///
    /// let mut map = ChainedMapBuilder::new()
    ///     .bucket_count(nz!(16))
    ///     .build(|key: &&str| key.len() as u64, |a: &&str, b: &&str| a == b)
    ///     .unwrap();
    ///
    /// map.set("hello", 1).unwrap();
    /// assert_eq!(map.bucket_count(), 16);
    /// ```
    #[inline]
    pub fn new() -> Self {
        Self {
            bucket_count: DEFAULT_BUCKET_COUNT,
            _not_sync: PhantomData,
        }
    }

    /// Sets the number of buckets. This never changes after the map is built.
    ///
    /// Defaults to [`DEFAULT_BUCKET_COUNT`].
    #[inline]
    pub fn bucket_count(mut self, bucket_count: NonZero<usize>) -> Self {
        self.bucket_count = bucket_count;
        self
    }

    /// Builds a map that uses `hash` to select buckets and `eq` to compare keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the bucket array cannot be allocated.
    pub fn build<K, V, H, E>(self, hash: H, eq: E) -> Result<ChainedMap<K, V, H, E>>
    where
        H: Fn(&K) -> u64,
        E: Fn(&K, &K) -> bool,
    {
        ChainedMap::new(self.bucket_count, hash, eq)
    }

    /// Builds a map that hashes keys with `foldhash` and compares them with `==`.
    ///
    /// # Errors
    ///
    /// Returns an error if the bucket array cannot be allocated.
    pub fn build_with_default_hasher<K, V>(self) -> Result<DefaultChainedMap<K, V>>
    where
        K: Hash + Eq,
    {
        DefaultChainedMap::with_default_hasher(self.bucket_count)
    }
}

impl Default for ChainedMapBuilder {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use new_zealand::nz;
    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    assert_impl_all!(ChainedMapBuilder: Send, std::fmt::Debug);
    assert_not_impl_any!(ChainedMapBuilder: Sync);

    #[test]
    fn builder_new_uses_default_bucket_count() {
        let builder = ChainedMapBuilder::new();
        assert_eq!(builder.bucket_count, DEFAULT_BUCKET_COUNT);
    }

    #[test]
    fn default_matches_new() {
        let builder = ChainedMapBuilder::default();
        assert_eq!(builder.bucket_count, DEFAULT_BUCKET_COUNT);
    }

    #[test]
    fn bucket_count_can_be_overridden() {
        let builder = ChainedMapBuilder::new()
            .bucket_count(nz!(3))
            .bucket_count(nz!(5));

        assert_eq!(builder.bucket_count, nz!(5));
    }

    #[test]
    fn build_uses_given_functions() {
        let mut map = ChainedMapBuilder::new()
            .bucket_count(nz!(2))
            .build(|_: &u8| 1, |a: &u8, b: &u8| a == b)
            .unwrap();

        map.set(10, ()).unwrap();
        map.set(20, ()).unwrap();

        assert_eq!(map.chain_len(0), 0);
        assert_eq!(map.chain_len(1), 2);
    }

    #[test]
    fn build_with_default_hasher_works() {
        let mut map = ChainedMapBuilder::new()
            .build_with_default_hasher::<String, u32>()
            .unwrap();

        map.set("one".to_string(), 1).unwrap();

        assert_eq!(map.bucket_count(), DEFAULT_BUCKET_COUNT.get());
        assert_eq!(*map.get(&"one".to_string()).unwrap().value(), 1);
    }

    #[test]
    fn builder_send_trait() {
        let builder = ChainedMapBuilder::new().bucket_count(nz!(4));

        let handle = std::thread::spawn(move || {
            builder
                .build_with_default_hasher::<u32, u32>()
                .map(|map| map.bucket_count())
        });

        assert_eq!(handle.join().unwrap().unwrap(), 4);
    }
}
