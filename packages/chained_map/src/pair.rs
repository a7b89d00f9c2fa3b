use std::fmt;

/// Link from a bucket head or from a pair to the next pair in the same chain.
pub(crate) type Link<K, V> = Option<Box<Pair<K, V>>>;

/// A key/value pair stored in a [`ChainedMap`][crate::ChainedMap].
///
/// References to a pair are handed out by [`set()`][crate::ChainedMap::set],
/// [`get()`][crate::ChainedMap::get] and [`get_mut()`][crate::ChainedMap::get_mut]. The key of a
/// resident pair never changes; only the value can be replaced.
pub struct Pair<K, V> {
    key: K,
    value: V,

    /// Continuation of the chain this pair belongs to.
    pub(crate) next: Link<K, V>,
}

impl<K, V> Pair<K, V> {
    #[must_use]
    pub(crate) fn new(key: K, value: V) -> Self {
        Self {
            key,
            value,
            next: None,
        }
    }

    /// The key this pair was first stored under.
    #[must_use]
    #[inline]
    pub fn key(&self) -> &K {
        &self.key
    }

    /// The value currently associated with the key.
    #[must_use]
    #[inline]
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Exclusive access to the value, for updating it in place.
    #[must_use]
    #[inline]
    pub fn value_mut(&mut self) -> &mut V {
        &mut self.value
    }

    pub(crate) fn replace_value(&mut self, value: V) {
        self.value = value;
    }

    #[must_use]
    pub(crate) fn into_parts(self) -> (K, V, Link<K, V>) {
        (self.key, self.value, self.next)
    }
}

// `next` is omitted because printing it would walk the rest of the chain.
impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Pair<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pair")
            .field("key", &self.key)
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn accessors() {
        let mut pair = Pair::new("key", 1);

        assert_eq!(*pair.key(), "key");
        assert_eq!(*pair.value(), 1);

        *pair.value_mut() = 2;
        assert_eq!(*pair.value(), 2);

        pair.replace_value(3);
        assert_eq!(*pair.value(), 3);
        assert_eq!(*pair.key(), "key");
    }

    #[test]
    fn debug_does_not_follow_chain() {
        let mut pair = Pair::new(1, "a");
        pair.next = Some(Box::new(Pair::new(2, "b")));

        let debug_output = format!("{pair:?}");
        assert!(debug_output.contains("\"a\""));
        assert!(!debug_output.contains("\"b\""));
    }

    #[test]
    fn into_parts_returns_link() {
        let mut pair = Pair::new(1, "a");
        pair.next = Some(Box::new(Pair::new(2, "b")));

        let (key, value, next) = pair.into_parts();
        assert_eq!(key, 1);
        assert_eq!(value, "a");
        assert_eq!(*next.unwrap().key(), 2);
    }
}
