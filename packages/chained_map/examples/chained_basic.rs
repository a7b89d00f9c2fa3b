//! Basic usage example for `ChainedMap`.
//!
//! This example indexes a set of records owned by a `Vec` by their name, storing only references
//! in the map, and shows how colliding keys share a bucket chain.

use chained_map::ChainedMap;
use new_zealand::nz;

#[derive(Debug)]
struct Record {
    name: &'static str,
    quantity: u32,
}

fn main() {
    let records = vec![
        Record {
            name: "bolts",
            quantity: 500,
        },
        Record {
            name: "nuts",
            quantity: 320,
        },
        Record {
            name: "washers",
            quantity: 1200,
        },
    ];

    let screws = Record {
        name: "screws",
        quantity: 75,
    };

    // Hashing by length is weak: every name of the same length lands in the same bucket.
    let mut by_name = ChainedMap::new(
        nz!(4),
        |name: &&str| name.len() as u64,
        |a: &&str, b: &&str| a == b,
    )
    .expect("allocating four buckets is not expected to fail");

    for record in &records {
        by_name
            .set(record.name, record)
            .expect("allocating a pair is not expected to fail");
    }

    println!("Stored {} records in {} buckets", by_name.len(), by_name.bucket_count());

    for bucket in 0..by_name.bucket_count() {
        println!("Bucket {bucket} chain length: {}", by_name.chain_len(bucket));
    }

    if let Some(pair) = by_name.get(&"nuts") {
        println!("Found {:?}", pair.value());
    }

    // Six letters, so this goes to bucket 2 while "washers" stays alone in bucket 3.
    by_name
        .set(screws.name, &screws)
        .expect("allocating a pair is not expected to fail");

    if let Some((name, record)) = by_name.delete(&"bolts") {
        println!("Removed {name} (quantity {})", record.quantity);
    }

    println!("{} records remain", by_name.len());
}
