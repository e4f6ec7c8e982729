use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;

use clap::Parser;
use probe_set::HashTable;
use probe_set::hash_table::Entry;

#[derive(Parser, Debug)]
struct Args {
    /// Number of values to insert.
    #[arg(short = 'c', long = "target_capacity", default_value_t = 1000)]
    target_capacity: usize,

    /// Fraction of the inserted values to remove again, leaving tombstones.
    #[arg(short = 'r', long = "remove_fraction", default_value_t = 0.25)]
    remove_fraction: f64,
}

fn hash_u64(value: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn main() {
    let args = Args::parse();

    println!("Creating HashTable for {} values", args.target_capacity);

    let mut table: HashTable<u64> = HashTable::new();
    println!("Initial capacity: {}", table.capacity());

    let mut num_failures = 0;
    let mut num_growths = 0;
    for i in 0..args.target_capacity {
        let value = i as u64;
        let hash = hash_u64(value);
        let before = table.capacity();

        match table.try_entry(hash, |&v| v == value) {
            Ok(Entry::Vacant(entry)) => {
                entry.insert(value);
            }
            Ok(Entry::Occupied(_)) => {
                panic!("Value already exists in table: {}", value);
            }
            Err(err) => {
                eprintln!("Failed to insert {}: {}", value, err);
                num_failures += 1;
            }
        }

        if table.capacity() != before {
            num_growths += 1;
        }
    }

    println!(
        "Inserted {} values, capacity {} after {} growth rehashes",
        table.len(),
        table.capacity(),
        num_growths
    );

    let to_remove = (args.target_capacity as f64 * args.remove_fraction.clamp(0.0, 1.0)) as u64;
    let mut num_compactions = 0;
    for value in 0..to_remove {
        let tombstones = table.tombstones();
        table.remove(hash_u64(value), |&v| v == value);
        if table.tombstones() < tombstones {
            num_compactions += 1;
        }
    }

    println!(
        "Removed {} values ({} compaction rehashes), {} remain",
        to_remove,
        num_compactions,
        table.len()
    );

    table.probe_histogram().print();
    table.debug_stats().print();
    println!("Number of failed try_entry attempts: {}", num_failures);
}
