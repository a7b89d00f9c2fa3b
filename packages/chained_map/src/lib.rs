#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A hash table with a fixed number of buckets that resolves collisions by separate chaining,
//! using hash and equality functions supplied by the caller.
//!
//! This crate provides [`ChainedMap`], a small map intended as a building block inside larger
//! programs that need full control over how keys are hashed and compared. Keys and values are
//! stored as given, which makes the map a good fit for references and other cheap handles whose
//! referents are owned elsewhere: the map never clones them or looks through them.
//!
//! # Key Features
//!
//! - **Pluggable hashing**: any `Fn(&K) -> u64` and `Fn(&K, &K) -> bool` pair, including closures
//! - **Fixed bucket array**: allocated once at creation, never rehashed or grown
//! - **Separate chaining**: colliding keys share a bucket in a singly linked chain
//! - **Fallible allocation**: running out of memory is reported as [`Error`], not an abort
//! - **Default hashing**: [`ChainedMap::with_default_hasher()`] for keys that are [`Hash`] + [`Eq`]
//!
//! # Limitations
//!
//! The map has no load factor management. With more keys than buckets, or a hash function that
//! does not spread keys well, chains grow long and operations slow down linearly.
//! There is no iteration API and no internal synchronization.
//!
//! # Example
//!
//! ```
//! use chained_map::ChainedMap;
//! use new_zealand::nz;
//!
//! #[derive(Debug)]
//! struct Customer {
//!     name: String,
//! }
//!
//! let alice = Customer {
//!     name: "Alice".to_string(),
//! };
//! let bob = Customer {
//!     name: "Bob".to_string(),
//! };
//!
//! // The map only holds references to the customers.
//! let mut by_id = ChainedMap::new(
//!     nz!(16),
//!     |id: &u32| u64::from(*id),
//!     |a: &u32, b: &u32| a == b,
//! )
//! .unwrap();
//!
//! by_id.set(1001, &alice).unwrap();
//! by_id.set(2002, &bob).unwrap();
//!
//! assert_eq!(by_id.get(&1001).unwrap().value().name, "Alice");
//!
//! // Replacing the value keeps the original key.
//! by_id.set(1001, &bob).unwrap();
//! assert_eq!(by_id.get(&1001).unwrap().value().name, "Bob");
//!
//! assert_eq!(by_id.delete(&2002).map(|(id, _)| id), Some(2002));
//! assert_eq!(by_id.len(), 1);
//! ```
//!
//! [`Hash`]: std::hash::Hash
//! [`Eq`]: std::cmp::Eq

mod builder;
mod default_hash;
mod error;
mod fallible;
mod map;
mod pair;

pub use builder::*;
pub use default_hash::*;
pub use error::*;
pub(crate) use fallible::*;
pub use map::*;
pub use pair::Pair;
pub(crate) use pair::Link;
