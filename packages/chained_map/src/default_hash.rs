use std::hash::{BuildHasher, Hash};

use foldhash::fast::FixedState;

/// Signature of the hash function used by [`DefaultChainedMap`][crate::DefaultChainedMap].
pub type HashFn<K> = fn(&K) -> u64;

/// Signature of the equality function used by [`DefaultChainedMap`][crate::DefaultChainedMap].
pub type EqFn<K> = fn(&K, &K) -> bool;

/// Hashes `key` with `foldhash` using a fixed seed.
///
/// The result is stable for the lifetime of the process, which is all a [`ChainedMap`] needs,
/// but is not guaranteed to be stable across `foldhash` versions.
///
/// [`ChainedMap`]: crate::ChainedMap
#[must_use]
pub fn default_hash<K: Hash + ?Sized>(key: &K) -> u64 {
    FixedState::default().hash_one(key)
}

/// Compares two keys with [`PartialEq`].
#[must_use]
pub fn default_eq<K: Eq + ?Sized>(a: &K, b: &K) -> bool {
    a == b
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(default_hash("hello"), default_hash("hello"));
        assert_eq!(default_hash(&42_u64), default_hash(&42_u64));
    }

    #[test]
    fn hash_distinguishes_simple_keys() {
        assert_ne!(default_hash(&1_u64), default_hash(&2_u64));
    }

    #[test]
    fn eq_follows_partial_eq() {
        assert!(default_eq("a", "a"));
        assert!(!default_eq("a", "b"));
    }

    #[test]
    fn coerces_to_fn_pointers() {
        let hash: HashFn<u32> = default_hash::<u32>;
        let eq: EqFn<u32> = default_eq::<u32>;

        assert_eq!(hash(&5), default_hash(&5_u32));
        assert!(eq(&5, &5));
    }
}
