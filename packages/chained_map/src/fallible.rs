use std::alloc::{Layout, alloc};
use std::ptr::NonNull;

use crate::{Error, Result};

/// Moves `value` into a new heap allocation, reporting allocator exhaustion as an error instead
/// of aborting the process the way `Box::new()` does.
///
/// # Panics
///
/// Panics if `T` is zero-sized. Every caller in this crate boxes a chain node, which is never
/// zero-sized because it contains the link to the next node.
pub(crate) fn try_box<T>(value: T) -> Result<Box<T>> {
    let layout = Layout::new::<T>();

    assert!(layout.size() > 0, "try_box() cannot allocate zero-sized values");

    // SAFETY: The layout is valid for T and not zero-sized (guarded by assertion above).
    let Some(ptr) = NonNull::new(unsafe { alloc(layout) }.cast::<T>()) else {
        tracing::warn!(
            size = layout.size(),
            align = layout.align(),
            "allocator refused memory for a chain node"
        );

        return Err(Error::AllocationFailed { layout });
    };

    // SAFETY: The pointer is valid for writes of T and properly aligned because it was just
    // allocated with the layout of T.
    unsafe {
        ptr.as_ptr().write(value);
    }

    // SAFETY: The memory was allocated by the global allocator with `Layout::new::<T>()` and
    // holds an initialized T, which is exactly what `Box` expects to take ownership of.
    Ok(unsafe { Box::from_raw(ptr.as_ptr()) })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn boxes_value() {
        let boxed = try_box(1234_u64).unwrap();
        assert_eq!(*boxed, 1234);
    }

    #[test]
    fn drops_value_with_box() {
        struct Droppable {
            dropped: Rc<Cell<bool>>,
        }

        impl Drop for Droppable {
            fn drop(&mut self) {
                self.dropped.set(true);
            }
        }

        let dropped = Rc::new(Cell::new(false));

        let boxed = try_box(Droppable {
            dropped: Rc::clone(&dropped),
        })
        .unwrap();

        assert!(!dropped.get());
        drop(boxed);
        assert!(dropped.get());
    }

    #[test]
    #[should_panic]
    fn zst_is_panic() {
        _ = try_box(());
    }
}
