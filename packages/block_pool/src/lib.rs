#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A pool of same-sized memory slots, carved out of blocks that are allocated on demand.
//!
//! This crate provides [`BlockPool`], which hands out raw storage for many small objects of one
//! size without going to the allocator for each of them. Memory is requested one block at a time
//! and every block is split into `objects_per_block` slots. Free slots are tracked with an
//! intrusive free list: the leading bytes of each unused slot record which slot is free next, so
//! the pool needs no side tables.
//!
//! # Key Features
//!
//! - **Lazy growth**: no memory is reserved until the first slot is acquired
//! - **Stable addresses**: blocks never move or shrink while the pool exists
//! - **Uniform alignment**: every slot is aligned to [`MAX_ALIGNMENT`], so any scalar fits
//! - **Ownership-checked handles**: a [`Slot`] is consumed on release and checked against the
//!   pool it came from
//! - **Fallible allocation**: running out of memory is reported as [`Error`], not an abort
//! - **Drop policies**: optionally panic when a pool is dropped with slots still in use
//!
//! # Limitations
//!
//! The pool hands out uninitialized bytes. It never runs constructors or destructors for the
//! objects callers place in slots, and reading or writing those objects requires unsafe code.
//! Blocks are only returned to the allocator when the whole pool is dropped.
//!
//! # Example
//!
//! ```
//! use block_pool::BlockPool;
//!
//! #[derive(Clone, Copy, Debug, PartialEq)]
//! struct Particle {
//!     position: [f32; 3],
//!     mass: f32,
//! }
//!
//! let mut pool = BlockPool::builder()
//!     .object_layout_of::<Particle>()
//!     .build()
//!     .unwrap();
//!
//! let slot = pool.acquire().unwrap();
//! let particle = slot.cast::<Particle>();
//!
//! // SAFETY: The slot is in use and sized for a Particle, so we have exclusive access.
//! unsafe {
//!     particle.write(Particle {
//!         position: [1.0, 2.0, 3.0],
//!         mass: 0.5,
//!     });
//!
//!     assert_eq!(particle.read().mass, 0.5);
//! }
//!
//! pool.release(slot);
//! assert!(pool.is_empty());
//! ```

mod block;
mod block_layout;
mod builder;
mod coordinates;
mod drop_policy;
mod error;
mod pool;
mod slot;

pub(crate) use block::*;
pub use block_layout::{MAX_ALIGNMENT, aligned_object_size};
pub(crate) use block_layout::BlockLayout;
pub use builder::*;
pub(crate) use coordinates::*;
pub use drop_policy::*;
pub use error::*;
pub use pool::*;
pub use slot::*;
