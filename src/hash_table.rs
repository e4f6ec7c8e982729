//! The storage engine behind [`HashSet`](crate::HashSet).
//!
//! [`HashTable`] is a raw open-addressing table. Callers supply the 64-bit
//! hash and an equality predicate for every operation. Collisions are
//! resolved by linear probing and removals leave tombstones, which are
//! dropped whenever the bucket array is rebuilt.

use alloc::alloc::handle_alloc_error;
use alloc::vec::Vec;
use core::alloc::Layout;
use core::fmt::Debug;
use core::iter::FusedIterator;

use crate::TryReserveError;

/// Smallest bucket array the table will ever allocate.
pub const MIN_CAPACITY: usize = 8;

// Each tombstone limit sits below its load limit so compaction stays
// reachable.
cfg_if::cfg_if! {
    if #[cfg(feature = "density-fifty")] {
        /// Maximum share of non-empty slots (occupied plus tombstones), in
        /// percent of capacity, allowed after an insertion.
        pub const MAX_LOAD_PERCENT: usize = 50;
        /// Share of tombstones, in percent of capacity, above which a
        /// removal compacts the table in place.
        pub const MAX_TOMBSTONE_PERCENT: usize = 25;
    } else if #[cfg(feature = "density-eighty")] {
        /// Maximum share of non-empty slots (occupied plus tombstones), in
        /// percent of capacity, allowed after an insertion.
        pub const MAX_LOAD_PERCENT: usize = 80;
        /// Share of tombstones, in percent of capacity, above which a
        /// removal compacts the table in place.
        pub const MAX_TOMBSTONE_PERCENT: usize = 60;
    } else {
        /// Maximum share of non-empty slots (occupied plus tombstones), in
        /// percent of capacity, allowed after an insertion.
        pub const MAX_LOAD_PERCENT: usize = 70;
        /// Share of tombstones, in percent of capacity, above which a
        /// removal compacts the table in place.
        pub const MAX_TOMBSTONE_PERCENT: usize = 50;
    }
}

const _: () = assert!(MAX_TOMBSTONE_PERCENT < MAX_LOAD_PERCENT && MAX_LOAD_PERCENT < 100);

#[inline(always)]
fn max_used(capacity: usize) -> usize {
    ((capacity as u128 * MAX_LOAD_PERCENT as u128) / 100) as usize
}

#[inline(always)]
fn max_tombstones(capacity: usize) -> usize {
    ((capacity as u128 * MAX_TOMBSTONE_PERCENT as u128) / 100) as usize
}

/// Smallest power-of-two capacity whose load budget holds `items` entries.
fn capacity_for(items: usize) -> Option<usize> {
    let slots = (items as u128 * 100).div_ceil(MAX_LOAD_PERCENT as u128);
    usize::try_from(slots)
        .ok()?
        .max(MIN_CAPACITY)
        .checked_next_power_of_two()
}

/// MurmurHash3 `fmix64` finalizer.
///
/// Only the low `log2(capacity)` bits pick the home bucket, so entropy that
/// the caller's hasher left in the high bits has to be folded down first.
#[inline(always)]
fn mix(hash: u64) -> u64 {
    let mut h = hash;
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
    h ^= h >> 33;
    h = h.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    h ^ (h >> 33)
}

/// Whether memory allocation errors should return an error or abort.
#[derive(Clone, Copy)]
enum Fallibility {
    Fallible,
    Infallible,
}

impl Fallibility {
    #[cold]
    fn capacity_overflow(self) -> TryReserveError {
        match self {
            Fallibility::Fallible => TryReserveError::CapacityOverflow,
            Fallibility::Infallible => panic!("hash table capacity overflow"),
        }
    }

    #[cold]
    fn alloc_err(self, layout: Layout) -> TryReserveError {
        match self {
            Fallibility::Fallible => TryReserveError::AllocError { layout },
            Fallibility::Infallible => handle_alloc_error(layout),
        }
    }
}

#[derive(Clone)]
enum Slot<V> {
    Empty,
    Tombstone,
    Occupied { hash: u64, value: V },
}

/// Allocate a bucket array of `capacity` empty slots.
///
/// Nothing outside the returned vector is touched, so a failure here leaves
/// the caller's table exactly as it was.
fn allocate_slots<V>(
    capacity: usize,
    fallibility: Fallibility,
) -> Result<Vec<Slot<V>>, TryReserveError> {
    debug_assert!(capacity.is_power_of_two() && capacity >= MIN_CAPACITY);

    let layout =
        Layout::array::<Slot<V>>(capacity).map_err(|_| fallibility.capacity_overflow())?;
    let mut slots = Vec::new();
    if slots.try_reserve_exact(capacity).is_err() {
        log_warn!(
            "failed to allocate {} slots ({} bytes) for a rehash",
            capacity,
            layout.size()
        );
        return Err(fallibility.alloc_err(layout));
    }
    slots.resize_with(capacity, || Slot::Empty);

    Ok(slots)
}

enum Probe {
    Found(usize),
    Vacant(usize),
}

/// Debug statistics for hash table analysis.
///
/// Available in tests or with the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of live entries in the table
    pub populated: usize,
    /// Number of tombstoned slots
    pub tombstones: usize,
    /// Length of the bucket array
    pub capacity: usize,
    /// Maximum number of non-empty slots before a growth rehash
    pub max_load: usize,
    /// Load factor ((populated + tombstones) / capacity)
    pub load_factor: f64,
    /// Tombstone ratio (tombstones / capacity)
    pub tombstone_ratio: f64,
    /// Longest distance of any entry from its home bucket
    pub longest_probe: usize,
    /// Total memory in bytes used by the bucket array
    pub total_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Population: {} live + {} tombstones in {} slots ({:.2}% load factor)",
            self.populated,
            self.tombstones,
            self.capacity,
            self.load_factor * 100.0
        );
        println!(
            "Growth threshold: {} non-empty slots ({}%)",
            self.max_load, MAX_LOAD_PERCENT
        );
        println!(
            "Tombstones: {:.2}% of capacity (compaction above {}%)",
            self.tombstone_ratio * 100.0,
            MAX_TOMBSTONE_PERCENT
        );
        println!("Longest probe: {}", self.longest_probe);
        println!("Total Allocated: {} bytes", self.total_bytes);
    }
}

/// Histogram of probe distances: `bins[n]` counts entries stored `n` slots
/// past their home bucket.
///
/// Available in tests or with the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone, Default)]
pub struct ProbeHistogram {
    /// Entry counts per probe distance
    pub bins: Vec<usize>,
}

#[cfg(any(test, feature = "stats"))]
impl ProbeHistogram {
    /// Total number of entries counted.
    pub fn total(&self) -> usize {
        self.bins.iter().sum()
    }

    /// Pretty-prints the histogram horizontally using stdout.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        let max = self.bins.iter().copied().max().unwrap_or(0);
        if max == 0 {
            println!("probe histogram: empty");
            return;
        }

        let max_bar = 60usize;
        let total_units = max_bar * 8;
        println!("probe histogram ({} entries):", self.total());

        let make_bar = |count: usize| -> alloc::string::String {
            if count == 0 {
                return alloc::string::String::new();
            }
            let units = ((count as u128 * total_units as u128).div_ceil(max as u128)) as usize;
            let mut bar = "█".repeat(units / 8);
            let partial = match units % 8 {
                1 => Some('▏'),
                2 => Some('▎'),
                3 => Some('▍'),
                4 => Some('▌'),
                5 => Some('▋'),
                6 => Some('▊'),
                7 => Some('▉'),
                _ => None,
            };
            if let Some(ch) = partial {
                bar.push(ch);
            }
            bar
        };

        for (distance, &count) in self.bins.iter().enumerate() {
            println!("{:>3} | {} ({})", distance, make_bar(count), count);
        }
    }
}

/// A hash table using open addressing with linear probing.
///
/// `HashTable<V>` stores values of type `V` in a single contiguous array of
/// slots whose length is always a power of two. Like other raw tables, it
/// requires you to provide both the hash value and an equality predicate for
/// each operation; the table folds the hash through a finalizer before using
/// its low bits, so weak hashers still spread across buckets.
///
/// Removed entries become tombstones so the probe chains running through them
/// stay intact. Tombstones count toward the load factor and are discarded by
/// every rehash: growth when an insertion would exceed
/// [`MAX_LOAD_PERCENT`], and in-place compaction when removals push the
/// tombstone share above [`MAX_TOMBSTONE_PERCENT`].
///
/// Every rehash builds the new array completely before releasing the old one.
/// The `try_*` methods report allocation failure as a [`TryReserveError`]
/// and leave the table untouched; the other methods abort via
/// [`handle_alloc_error`].
///
/// ## Example
///
/// ```rust
/// # use core::hash::Hash;
/// # use core::hash::Hasher;
/// #
/// # use probe_set::hash_table::HashTable;
/// # use siphasher::sip::SipHasher;
/// #
/// # fn hash_id(id: u64) -> u64 {
/// #     let mut hasher = SipHasher::new();
/// #     id.hash(&mut hasher);
/// #     hasher.finish()
/// # }
///
/// let mut table = HashTable::new();
/// let hash = hash_id(123);
///
/// match table.entry(hash, |&id: &u64| id == 123) {
///     probe_set::hash_table::Entry::Vacant(entry) => {
///         entry.insert(123);
///     }
///     probe_set::hash_table::Entry::Occupied(_) => {
///         println!("Already present");
///     }
/// }
///
/// assert_eq!(table.find(hash, |&id| id == 123), Some(&123));
/// ```
#[derive(Clone)]
pub struct HashTable<V> {
    slots: Vec<Slot<V>>,
    populated: usize,
    tombstones: usize,
    mask: usize,
}

impl<V> Debug for HashTable<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use alloc::format;
        use alloc::string::String;
        use alloc::string::ToString;

        f.debug_struct("HashTable")
            .field(
                "slots",
                &self
                    .slots
                    .chunks(16)
                    .map(|row| {
                        row.iter()
                            .map(|slot| match slot {
                                Slot::Empty => "..".to_string(),
                                Slot::Tombstone => "xx".to_string(),
                                Slot::Occupied { hash, .. } => format!("{:02x}", hash >> 56),
                            })
                            .collect::<Vec<String>>()
                            .join(", ")
                    })
                    .collect::<Vec<_>>(),
            )
            .field("populated", &self.populated)
            .field("tombstones", &self.tombstones)
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl<V> Default for HashTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> HashTable<V> {
    /// Creates an empty table with the minimum capacity.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_set::hash_table::HashTable;
    /// # use probe_set::hash_table::MIN_CAPACITY;
    /// #
    /// let table: HashTable<u64> = HashTable::new();
    /// assert_eq!(table.capacity(), MIN_CAPACITY);
    /// ```
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates a new hash table able to hold at least `capacity` values
    /// without rehashing.
    ///
    /// The bucket array is the smallest power of two, no smaller than
    /// [`MIN_CAPACITY`], whose load budget covers `capacity` values.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_set::hash_table::HashTable;
    /// #
    /// let table: HashTable<String> = HashTable::with_capacity(100);
    /// assert!(table.capacity() >= 100);
    /// assert!(table.capacity().is_power_of_two());
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        match Self::fallible_with_capacity(capacity, Fallibility::Infallible) {
            Ok(table) => table,
            Err(_) => unreachable!(),
        }
    }

    /// Fallible version of [`with_capacity`](Self::with_capacity).
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_set::TryReserveError;
    /// # use probe_set::hash_table::HashTable;
    /// #
    /// assert!(HashTable::<u64>::try_with_capacity(100).is_ok());
    /// assert_eq!(
    ///     HashTable::<u64>::try_with_capacity(usize::MAX).unwrap_err(),
    ///     TryReserveError::CapacityOverflow
    /// );
    /// ```
    pub fn try_with_capacity(capacity: usize) -> Result<Self, TryReserveError> {
        Self::fallible_with_capacity(capacity, Fallibility::Fallible)
    }

    fn fallible_with_capacity(
        capacity: usize,
        fallibility: Fallibility,
    ) -> Result<Self, TryReserveError> {
        let slot_count = capacity_for(capacity).ok_or_else(|| fallibility.capacity_overflow())?;
        let slots = allocate_slots(slot_count, fallibility)?;

        Ok(Self {
            slots,
            populated: 0,
            tombstones: 0,
            mask: slot_count - 1,
        })
    }

    /// Returns `true` if the table contains no elements.
    pub fn is_empty(&self) -> bool {
        self.populated == 0
    }

    /// Returns the number of elements in the table.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_set::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// assert_eq!(table.len(), 0);
    ///
    /// table.entry(1, |&n: &u64| n == 1).or_insert(1);
    /// assert_eq!(table.len(), 1);
    /// ```
    pub fn len(&self) -> usize {
        self.populated
    }

    /// Returns the number of slots in the bucket array.
    ///
    /// This is always a power of two. The table grows once occupied slots
    /// plus tombstones would exceed [`MAX_LOAD_PERCENT`] of it.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of tombstoned slots left behind by removals.
    pub fn tombstones(&self) -> usize {
        self.tombstones
    }

    /// Removes all elements from the table.
    ///
    /// This operation preserves the table's allocated capacity and also
    /// clears tombstones.
    pub fn clear(&mut self) {
        if self.populated == 0 && self.tombstones == 0 {
            return;
        }

        for slot in self.slots.iter_mut() {
            *slot = Slot::Empty;
        }
        self.populated = 0;
        self.tombstones = 0;
    }

    /// Shrinks the bucket array to the smallest capacity that holds the
    /// current elements.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_set::HashTable;
    ///
    /// let mut table: HashTable<u64> = HashTable::with_capacity(1000);
    /// table.entry(42, |&v| v == 5).or_insert(5);
    /// table.entry(123, |&v| v == 10).or_insert(10);
    ///
    /// table.shrink_to_fit();
    /// assert!(table.capacity() < 1000);
    /// assert_eq!(table.len(), 2);
    /// ```
    pub fn shrink_to_fit(&mut self) {
        let Some(capacity) = capacity_for(self.populated) else {
            return;
        };
        if capacity < self.capacity() {
            match allocate_slots(capacity, Fallibility::Infallible) {
                Ok(slots) => {
                    log_debug!(
                        "shrinking hash table from {} to {} slots",
                        self.capacity(),
                        capacity
                    );
                    self.rehash_into(slots);
                }
                Err(_) => unreachable!(),
            }
        }
    }

    /// Reserves room for at least `additional` more insertions without a
    /// growth rehash.
    ///
    /// If a rehash is needed, tombstones are discarded along the way.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_set::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u64> = HashTable::new();
    /// table.reserve(50);
    /// let capacity = table.capacity();
    /// for i in 0..50 {
    ///     table.entry(i, |&n| n == i).or_insert(i);
    /// }
    /// assert_eq!(table.capacity(), capacity);
    /// ```
    pub fn reserve(&mut self, additional: usize) {
        match self.reserve_impl(additional, Fallibility::Infallible) {
            Ok(()) => {}
            Err(_) => unreachable!(),
        }
    }

    /// Fallible version of [`reserve`](Self::reserve).
    ///
    /// On error the table is left unchanged.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        self.reserve_impl(additional, Fallibility::Fallible)
    }

    fn reserve_impl(
        &mut self,
        additional: usize,
        fallibility: Fallibility,
    ) -> Result<(), TryReserveError> {
        let used = self.populated + self.tombstones;
        if used.saturating_add(additional) <= max_used(self.capacity()) {
            return Ok(());
        }

        let required = self
            .populated
            .checked_add(additional)
            .ok_or_else(|| fallibility.capacity_overflow())?;
        let capacity = capacity_for(required)
            .ok_or_else(|| fallibility.capacity_overflow())?
            .max(self.capacity());
        let slots = allocate_slots(capacity, fallibility)?;

        log_debug!(
            "reserving {} slots for {} more entries (was {} slots)",
            capacity,
            additional,
            self.capacity()
        );
        self.rehash_into(slots);

        Ok(())
    }

    /// Returns a reference to the value matching `hash` and `eq`, if any.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_set::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.entry(7, |&n: &u64| n == 42).or_insert(42);
    ///
    /// assert_eq!(table.find(7, |&n| n == 42), Some(&42));
    /// assert_eq!(table.find(7, |&n| n == 43), None);
    /// ```
    pub fn find(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&V> {
        let index = self.find_index(mix(hash), eq)?;
        match &self.slots[index] {
            Slot::Occupied { value, .. } => Some(value),
            _ => unreachable!(),
        }
    }

    /// Returns a mutable reference to the value matching `hash` and `eq`, if
    /// any.
    ///
    /// The value must keep hashing to `hash` and comparing equal under `eq`.
    pub fn find_mut(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&mut V> {
        let index = self.find_index(mix(hash), eq)?;
        match &mut self.slots[index] {
            Slot::Occupied { value, .. } => Some(value),
            _ => unreachable!(),
        }
    }

    /// Gets an entry for the given hash and equality predicate.
    ///
    /// If the value is absent and claiming its slot would push the table past
    /// its load factor, the table grows to twice its capacity before the
    /// vacant entry is returned. A present value never triggers a rehash.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_set::hash_table::Entry;
    /// # use probe_set::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    ///
    /// match table.entry(99, |s: &String| s == "hello") {
    ///     Entry::Vacant(entry) => {
    ///         entry.insert("hello".to_string());
    ///     }
    ///     Entry::Occupied(_) => unreachable!(),
    /// }
    ///
    /// assert!(matches!(
    ///     table.entry(99, |s: &String| s == "hello"),
    ///     Entry::Occupied(_)
    /// ));
    /// ```
    #[inline]
    pub fn entry(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Entry<'_, V> {
        match self.entry_impl(hash, eq, Fallibility::Infallible) {
            Ok(entry) => entry,
            Err(_) => unreachable!(),
        }
    }

    /// Fallible version of [`entry`](Self::entry).
    ///
    /// If the growth rehash cannot allocate, the error is returned and the
    /// table is left unchanged.
    #[inline]
    pub fn try_entry(
        &mut self,
        hash: u64,
        eq: impl Fn(&V) -> bool,
    ) -> Result<Entry<'_, V>, TryReserveError> {
        self.entry_impl(hash, eq, Fallibility::Fallible)
    }

    fn entry_impl(
        &mut self,
        hash: u64,
        eq: impl Fn(&V) -> bool,
        fallibility: Fallibility,
    ) -> Result<Entry<'_, V>, TryReserveError> {
        let hash = mix(hash);
        let index = match self.probe(hash, eq) {
            Probe::Found(index) => {
                return Ok(Entry::Occupied(OccupiedEntry { table: self, index }));
            }
            Probe::Vacant(index) => index,
        };

        // Reusing a tombstone leaves the non-empty count unchanged; only an
        // empty slot can push the table over its load factor.
        let index = if matches!(self.slots[index], Slot::Empty)
            && self.populated + self.tombstones >= max_used(self.capacity())
        {
            self.grow(fallibility)?;
            self.find_empty(hash)
        } else {
            index
        };

        Ok(Entry::Vacant(VacantEntry {
            table: self,
            hash,
            index,
        }))
    }

    /// Removes and returns the value matching `hash` and `eq`.
    ///
    /// The slot becomes a tombstone. If tombstones then exceed
    /// [`MAX_TOMBSTONE_PERCENT`] of the capacity, the table is compacted at
    /// its current capacity.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_set::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.entry(42, |&n: &u64| n == 42).or_insert(42);
    ///
    /// assert_eq!(table.remove(42, |&n| n == 42), Some(42));
    /// assert!(table.is_empty());
    /// assert_eq!(table.remove(42, |&n| n == 42), None);
    /// ```
    pub fn remove(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<V> {
        match self.remove_impl(hash, eq, Fallibility::Infallible) {
            Ok(value) => value,
            Err(_) => unreachable!(),
        }
    }

    /// Fallible version of [`remove`](Self::remove).
    ///
    /// If the compaction rehash cannot allocate, the error is returned and
    /// the value stays in the table.
    pub fn try_remove(
        &mut self,
        hash: u64,
        eq: impl Fn(&V) -> bool,
    ) -> Result<Option<V>, TryReserveError> {
        self.remove_impl(hash, eq, Fallibility::Fallible)
    }

    fn remove_impl(
        &mut self,
        hash: u64,
        eq: impl Fn(&V) -> bool,
        fallibility: Fallibility,
    ) -> Result<Option<V>, TryReserveError> {
        let hash = mix(hash);
        let Some(index) = self.find_index(hash, eq) else {
            return Ok(None);
        };

        let compacted = if self.tombstones + 1 > max_tombstones(self.capacity()) {
            Some(allocate_slots(self.capacity(), fallibility)?)
        } else {
            None
        };

        let value = self.take_slot(index);
        if let Some(slots) = compacted {
            log_debug!(
                "compacting hash table: dropping {} tombstones from {} slots",
                self.tombstones,
                self.capacity()
            );
            self.rehash_into(slots);
        }

        Ok(Some(value))
    }

    /// Retains only the values for which `f` returns `true`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_set::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// for i in 0..10u64 {
    ///     table.entry(i, |&n| n == i).or_insert(i);
    /// }
    ///
    /// table.retain(|&n| n % 2 == 0);
    /// assert_eq!(table.len(), 5);
    /// ```
    pub fn retain(&mut self, mut f: impl FnMut(&V) -> bool) {
        for slot in self.slots.iter_mut() {
            let keep = match slot {
                Slot::Occupied { value, .. } => f(value),
                _ => true,
            };
            if !keep {
                *slot = Slot::Tombstone;
                self.populated -= 1;
                self.tombstones += 1;
            }
        }

        if self.tombstones > max_tombstones(self.capacity()) {
            match allocate_slots(self.capacity(), Fallibility::Infallible) {
                Ok(slots) => self.rehash_into(slots),
                Err(_) => unreachable!(),
            }
        }
    }

    /// Returns an iterator over all values in the table.
    ///
    /// The iteration order is unspecified.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            inner: self.slots.iter(),
            remaining: self.populated,
        }
    }

    /// Returns an iterator that removes and yields all values from the table.
    ///
    /// The table keeps its capacity and is left with no tombstones. Values
    /// not yet yielded when the iterator is dropped are dropped with it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_set::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.entry(1, |s: &String| s == "key1").or_insert("key1".to_string());
    ///
    /// let values: Vec<String> = table.drain().collect();
    /// assert!(table.is_empty());
    /// assert_eq!(values.len(), 1);
    /// ```
    pub fn drain(&mut self) -> Drain<'_, V> {
        Drain {
            table: self,
            slot_index: 0,
        }
    }

    /// Probe for `hash`, remembering the first tombstone on the way so a
    /// vacant result reclaims it.
    #[inline]
    fn probe(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Probe {
        let mut index = hash as usize & self.mask;
        let mut first_tombstone = None;
        loop {
            match &self.slots[index] {
                Slot::Empty => return Probe::Vacant(first_tombstone.unwrap_or(index)),
                Slot::Tombstone => {
                    if first_tombstone.is_none() {
                        first_tombstone = Some(index);
                    }
                }
                Slot::Occupied {
                    hash: slot_hash,
                    value,
                } => {
                    if *slot_hash == hash && eq(value) {
                        return Probe::Found(index);
                    }
                }
            }
            index = (index + 1) & self.mask;
        }
    }

    /// Tombstones are skipped; only an empty slot ends an unsuccessful
    /// search.
    #[inline]
    fn find_index(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<usize> {
        let mut index = hash as usize & self.mask;
        loop {
            match &self.slots[index] {
                Slot::Empty => return None,
                Slot::Tombstone => {}
                Slot::Occupied {
                    hash: slot_hash,
                    value,
                } => {
                    if *slot_hash == hash && eq(value) {
                        return Some(index);
                    }
                }
            }
            index = (index + 1) & self.mask;
        }
    }

    #[inline]
    fn find_empty(&self, hash: u64) -> usize {
        let mut index = hash as usize & self.mask;
        while !matches!(self.slots[index], Slot::Empty) {
            index = (index + 1) & self.mask;
        }
        index
    }

    fn take_slot(&mut self, index: usize) -> V {
        match core::mem::replace(&mut self.slots[index], Slot::Tombstone) {
            Slot::Occupied { value, .. } => {
                self.populated -= 1;
                self.tombstones += 1;
                value
            }
            _ => unreachable!("taking a value from an unoccupied slot"),
        }
    }

    #[cold]
    #[inline(never)]
    fn grow(&mut self, fallibility: Fallibility) -> Result<(), TryReserveError> {
        let capacity = self
            .capacity()
            .checked_mul(2)
            .ok_or_else(|| fallibility.capacity_overflow())?;
        let slots = allocate_slots(capacity, fallibility)?;

        log_debug!(
            "growing hash table from {} to {} slots ({} live, {} tombstones)",
            self.capacity(),
            capacity,
            self.populated,
            self.tombstones
        );
        self.rehash_into(slots);

        Ok(())
    }

    /// Move every live value into `slots`, which must be empty, and adopt it
    /// as the bucket array. Tombstones are not carried over.
    fn rehash_into(&mut self, slots: Vec<Slot<V>>) {
        debug_assert!(self.populated <= max_used(slots.len()));

        let old_slots = core::mem::replace(&mut self.slots, slots);
        self.mask = self.slots.len() - 1;
        self.tombstones = 0;

        for slot in old_slots {
            if let Slot::Occupied { hash, value } = slot {
                let index = self.find_empty(hash);
                self.slots[index] = Slot::Occupied { hash, value };
            }
        }
    }

    /// Computes a histogram of probe distances for the current table state.
    ///
    /// The distance of an entry is how many slots past its home bucket it is
    /// stored, wrapping around the end of the array.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> ProbeHistogram {
        let mut bins = alloc::vec![0usize; 1];
        for (index, slot) in self.slots.iter().enumerate() {
            if let Slot::Occupied { hash, .. } = slot {
                let distance = index.wrapping_sub(*hash as usize & self.mask) & self.mask;
                if distance >= bins.len() {
                    bins.resize(distance + 1, 0);
                }
                bins[distance] += 1;
            }
        }

        ProbeHistogram { bins }
    }

    /// Returns detailed utilization statistics for debugging.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let capacity = self.capacity();
        let histogram = self.probe_histogram();
        let longest_probe = histogram
            .bins
            .iter()
            .rposition(|&count| count != 0)
            .unwrap_or(0);

        DebugStats {
            populated: self.populated,
            tombstones: self.tombstones,
            capacity,
            max_load: max_used(capacity),
            load_factor: (self.populated + self.tombstones) as f64 / capacity as f64,
            tombstone_ratio: self.tombstones as f64 / capacity as f64,
            longest_probe,
            total_bytes: capacity * core::mem::size_of::<Slot<V>>(),
        }
    }
}

/// A view into a single entry in the hash table, which may be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashTable`].
///
/// [`entry`]: HashTable::entry
pub enum Entry<'a, V> {
    /// An occupied entry.
    Occupied(OccupiedEntry<'a, V>),
    /// A vacant entry.
    Vacant(VacantEntry<'a, V>),
}

impl<'a, V> Entry<'a, V> {
    /// Ensures a value is in the entry by inserting the default if empty, and
    /// returns a mutable reference to the value in the entry.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_set::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// let value = table.entry(5, |&n: &u64| n == 5).or_insert(5);
    /// assert_eq!(*value, 5);
    /// ```
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Ensures a value is in the entry by inserting the result of `default`
    /// if empty, and returns a mutable reference to the value in the entry.
    pub fn or_insert_with(self, default: impl FnOnce() -> V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }
}

/// A view into a vacant entry in a `HashTable`.
///
/// Any rehash the insertion needs has already happened, so inserting cannot
/// fail.
pub struct VacantEntry<'a, V> {
    table: &'a mut HashTable<V>,
    hash: u64,
    index: usize,
}

impl<'a, V> VacantEntry<'a, V> {
    /// Inserts a value into the vacant entry and returns a mutable reference
    /// to it.
    pub fn insert(self, value: V) -> &'a mut V {
        let table = self.table;
        if matches!(table.slots[self.index], Slot::Tombstone) {
            table.tombstones -= 1;
        }
        table.populated += 1;
        debug_assert!(table.populated + table.tombstones <= max_used(table.capacity()));

        let slot = &mut table.slots[self.index];
        *slot = Slot::Occupied {
            hash: self.hash,
            value,
        };
        match slot {
            Slot::Occupied { value, .. } => value,
            _ => unreachable!(),
        }
    }
}

/// A view into an occupied entry in a `HashTable`.
pub struct OccupiedEntry<'a, V> {
    table: &'a mut HashTable<V>,
    index: usize,
}

impl<'a, V> OccupiedEntry<'a, V> {
    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        match &self.table.slots[self.index] {
            Slot::Occupied { value, .. } => value,
            _ => unreachable!(),
        }
    }

    /// Gets a mutable reference to the value in the entry.
    ///
    /// The value must keep hashing and comparing the same way.
    pub fn get_mut(&mut self) -> &mut V {
        match &mut self.table.slots[self.index] {
            Slot::Occupied { value, .. } => value,
            _ => unreachable!(),
        }
    }

    /// Converts the entry into a mutable reference to the value, bound to
    /// the table's lifetime.
    pub fn into_mut(self) -> &'a mut V {
        match &mut self.table.slots[self.index] {
            Slot::Occupied { value, .. } => value,
            _ => unreachable!(),
        }
    }
}

/// An iterator over the values of a `HashTable`.
pub struct Iter<'a, V> {
    inner: core::slice::Iter<'a, Slot<V>>,
    remaining: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        for slot in self.inner.by_ref() {
            if let Slot::Occupied { value, .. } = slot {
                self.remaining -= 1;
                return Some(value);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}

impl<V> FusedIterator for Iter<'_, V> {}

/// A draining iterator over the values of a `HashTable`.
pub struct Drain<'a, V> {
    table: &'a mut HashTable<V>,
    slot_index: usize,
}

impl<V> Iterator for Drain<'_, V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        while self.slot_index < self.table.slots.len() {
            if self.table.populated == 0 && self.table.tombstones == 0 {
                return None;
            }

            let index = self.slot_index;
            self.slot_index += 1;
            match core::mem::replace(&mut self.table.slots[index], Slot::Empty) {
                Slot::Empty => {}
                Slot::Tombstone => self.table.tombstones -= 1,
                Slot::Occupied { value, .. } => {
                    self.table.populated -= 1;
                    return Some(value);
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.table.populated, Some(self.table.populated))
    }
}

impl<V> ExactSizeIterator for Drain<'_, V> {}

impl<V> Drop for Drain<'_, V> {
    fn drop(&mut self) {
        for _ in self {}
    }
}

/// A consuming iterator over the values of a `HashTable`.
pub struct IntoIter<V> {
    inner: alloc::vec::IntoIter<Slot<V>>,
    remaining: usize,
}

impl<V> Iterator for IntoIter<V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        for slot in self.inner.by_ref() {
            if let Slot::Occupied { value, .. } = slot {
                self.remaining -= 1;
                return Some(value);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for IntoIter<V> {}

impl<V> IntoIterator for HashTable<V> {
    type IntoIter = IntoIter<V>;
    type Item = V;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            remaining: self.populated,
            inner: self.slots.into_iter(),
        }
    }
}

impl<'a, V> IntoIterator for &'a HashTable<V> {
    type IntoIter = Iter<'a, V>;
    type Item = &'a V;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
