//! Rehash allocation failures, driven by an allocator that refuses requests
//! on demand.

use std::alloc::GlobalAlloc;
use std::alloc::Layout;
use std::alloc::System;
use std::cell::Cell;
use std::hash::BuildHasher;

use probe_set::HashSet;
use probe_set::TryReserveError;
use probe_set::hash_table::MAX_LOAD_PERCENT;
use probe_set::hash_table::MAX_TOMBSTONE_PERCENT;
use probe_set::hash_table::MIN_CAPACITY;
use siphasher::sip::SipHasher;

/// Fails every allocation made on a thread while that thread's refusal flag
/// is set. Other test threads are unaffected.
struct RefusingAlloc;

thread_local! {
    static REFUSE: Cell<bool> = const { Cell::new(false) };
}

unsafe impl GlobalAlloc for RefusingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if REFUSE.try_with(Cell::get).unwrap_or(false) {
            return std::ptr::null_mut();
        }
        unsafe { System.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) }
    }
}

#[global_allocator]
static ALLOCATOR: RefusingAlloc = RefusingAlloc;

fn refusing_allocations<R>(f: impl FnOnce() -> R) -> R {
    REFUSE.with(|flag| flag.set(true));
    let result = f();
    REFUSE.with(|flag| flag.set(false));
    result
}

#[derive(Clone, Default)]
struct SipBuilder;

impl BuildHasher for SipBuilder {
    type Hasher = SipHasher;

    fn build_hasher(&self) -> Self::Hasher {
        SipHasher::new_with_keys(0x0123_4567, 0x89ab_cdef)
    }
}

const LOAD_BUDGET: u64 = (MIN_CAPACITY * MAX_LOAD_PERCENT / 100) as u64;
const TOMBSTONE_BUDGET: u64 = (MIN_CAPACITY * MAX_TOMBSTONE_PERCENT / 100) as u64;

fn full_minimum_set() -> HashSet<u64, SipBuilder> {
    let mut set = HashSet::with_hasher(SipBuilder);
    for key in 0..LOAD_BUDGET {
        assert_eq!(set.try_insert(key), Ok(true));
    }
    assert_eq!(set.capacity(), MIN_CAPACITY);
    set
}

#[test]
fn failed_growth_keeps_every_key() {
    let mut set = full_minimum_set();

    let result = refusing_allocations(|| set.try_insert(1000));
    match result {
        Err(TryReserveError::AllocError { layout }) => {
            assert!(layout.size() > 0);
        }
        other => panic!("expected an allocation failure, got {other:?}"),
    }

    assert_eq!(set.len(), LOAD_BUDGET as usize);
    assert_eq!(set.capacity(), MIN_CAPACITY);
    for key in 0..LOAD_BUDGET {
        assert!(set.contains(&key), "lost {key} after a failed growth");
    }
    assert!(!set.contains(&1000));

    // With memory available again the same insertion goes through.
    assert_eq!(set.try_insert(1000), Ok(true));
    assert_eq!(set.capacity(), MIN_CAPACITY * 2);
    assert!(set.contains(&1000));
}

#[test]
fn failed_compaction_keeps_the_value() {
    let mut set = full_minimum_set();

    // Stop one removal short of the compaction threshold.
    for key in 0..TOMBSTONE_BUDGET {
        let removed = refusing_allocations(|| set.try_remove(&key));
        assert_eq!(removed, Ok(true));
    }

    let victim = TOMBSTONE_BUDGET;
    let result = refusing_allocations(|| set.try_remove(&victim));
    assert!(
        matches!(result, Err(TryReserveError::AllocError { .. })),
        "{result:?}"
    );

    let survivors = LOAD_BUDGET - TOMBSTONE_BUDGET;
    assert_eq!(set.len(), survivors as usize);
    assert_eq!(set.capacity(), MIN_CAPACITY);
    for key in TOMBSTONE_BUDGET..LOAD_BUDGET {
        assert!(set.contains(&key), "lost {key} after a failed compaction");
    }

    assert_eq!(set.try_remove(&victim), Ok(true));
    assert!(!set.contains(&victim));
    assert_eq!(set.len(), survivors as usize - 1);
    assert_eq!(set.capacity(), MIN_CAPACITY);
}

#[test]
fn lookups_and_duplicates_never_allocate() {
    let mut set = full_minimum_set();

    refusing_allocations(|| {
        for key in 0..LOAD_BUDGET {
            assert!(set.contains(&key));
            assert_eq!(set.try_insert(key), Ok(false));
        }
        assert_eq!(set.try_remove(&u64::MAX), Ok(false));
    });
    assert_eq!(set.len(), LOAD_BUDGET as usize);
}
