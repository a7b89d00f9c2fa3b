/// Determines what happens when a pool is dropped while slots are still acquired.
///
/// The pool never runs destructors for objects in its slots, so dropping a pool with acquired
/// slots simply makes their memory go away. By default that is allowed.
///
/// # Examples
///
/// ```
/// use block_pool::{BlockPool, DropPolicy};
///
/// // The drop policy is set at pool creation time.
/// let pool = BlockPool::builder()
///     .object_size(24)
///     .drop_policy(DropPolicy::MustNotDropInUseSlots)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DropPolicy {
    /// The pool may be dropped while slots are acquired. This is the default.
    ///
    /// Any outstanding [`Slot`][crate::Slot] handles dangle afterwards and must not be used.
    #[default]
    MayDropInUseSlots,

    /// The pool will panic if it is dropped while any slot is still acquired.
    ///
    /// This may be valuable if objects in the slots need explicit teardown before their memory
    /// can go away, to catch code paths that forget to release them.
    MustNotDropInUseSlots,
}
