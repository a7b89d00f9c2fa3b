//! Basic usage example for `BlockPool`.
//!
//! This example keeps a set of fixed-size messages in pool slots, releases some of them and shows
//! that the freed slots are handed out again before the pool grows.

use block_pool::BlockPool;
use new_zealand::nz;

#[derive(Clone, Copy, Debug)]
struct Message {
    id: u32,
    payload: [u8; 20],
}

fn main() {
    let mut pool = BlockPool::builder()
        .object_layout_of::<Message>()
        .objects_per_block(nz!(4))
        .build()
        .expect("a 24-byte object size is representable");

    println!(
        "Slots are {} bytes, {} per block",
        pool.object_size(),
        pool.objects_per_block()
    );

    let mut slots = Vec::new();

    for id in 0..6 {
        let slot = pool
            .acquire()
            .expect("allocating a small block is not expected to fail");

        // SAFETY: The slot is in use and sized for a Message.
        unsafe {
            slot.cast::<Message>().write(Message {
                id,
                payload: [0; 20],
            });
        }

        slots.push(slot);
    }

    println!(
        "{} messages stored in {} blocks",
        pool.len(),
        pool.block_count()
    );

    // Give back the even messages.
    let (even, odd): (Vec<_>, Vec<_>) = slots.into_iter().partition(|slot| {
        // SAFETY: Every slot in the list holds an initialized Message.
        unsafe { slot.cast::<Message>().read().id % 2 == 0 }
    });

    for slot in even {
        pool.release(slot);
    }

    let reused = pool
        .acquire()
        .expect("a free slot exists, so no allocation is needed");

    println!(
        "After releasing 3 messages: {} in use, {} blocks, capacity {}",
        pool.len(),
        pool.block_count(),
        pool.capacity()
    );

    for slot in &odd {
        // SAFETY: Odd slots were never released and still hold their Message.
        let message = unsafe { slot.cast::<Message>().read() };
        println!("Still holding message {} at {:p}", message.id, slot.ptr());
    }

    pool.release(reused);

    for slot in odd {
        pool.release(slot);
    }

    println!("Pool is empty: {}", pool.is_empty());
}
