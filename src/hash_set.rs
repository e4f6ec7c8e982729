use core::fmt;
use core::hash::BuildHasher;
use core::hash::Hash;

use crate::DefaultHashBuilder;
use crate::TryReserveError;
use crate::hash_table;
use crate::hash_table::Entry;
use crate::hash_table::HashTable;

/// An unordered set of unique values stored in a linear-probing
/// [`HashTable`].
///
/// Values are hashed once with `S` when they enter the set; the table keeps
/// that hash next to the value, so growing or compacting the bucket array
/// never calls the hasher again.
///
/// Operations that may rebuild the bucket array come in two flavours. The
/// plain ones ([`insert`](Self::insert), [`remove`](Self::remove), ...)
/// abort the process if memory runs out, like `std` collections do. The
/// `try_` ones report a [`TryReserveError`] instead, and the set is left
/// exactly as it was before the call.
///
/// The set does no locking of its own. Mutation through `&mut self` already
/// rules out concurrent writers.
#[derive(Clone)]
pub struct HashSet<T, S = DefaultHashBuilder> {
    table: HashTable<T>,
    hash_builder: S,
}

impl<T, S> HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    /// An empty set at [`MIN_CAPACITY`](hash_table::MIN_CAPACITY) slots that
    /// hashes with `hash_builder`.
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_capacity_and_hasher(0, hash_builder)
    }

    /// An empty set sized so that `capacity` values fit before the first
    /// growth.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(feature = "std")]
    /// # {
    /// use std::hash::RandomState;
    ///
    /// use probe_set::HashSet;
    ///
    /// let mut set = HashSet::with_capacity_and_hasher(20, RandomState::new());
    /// let slots = set.capacity();
    /// set.extend(0..20);
    /// assert_eq!(set.capacity(), slots);
    /// # }
    /// ```
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            table: HashTable::with_capacity(capacity),
            hash_builder,
        }
    }

    /// Like [`with_capacity_and_hasher`](Self::with_capacity_and_hasher), but
    /// reports an impossible or unsatisfiable size instead of aborting.
    pub fn try_with_capacity_and_hasher(
        capacity: usize,
        hash_builder: S,
    ) -> Result<Self, TryReserveError> {
        let table = HashTable::try_with_capacity(capacity)?;
        Ok(Self {
            table,
            hash_builder,
        })
    }

    /// The hasher builder values are hashed with.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    #[inline]
    fn hash(&self, value: &T) -> u64 {
        self.hash_builder.hash_one(value)
    }

    /// Number of values in the set. Tombstones are not counted.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// `true` when the set holds no values.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Length of the bucket array, always a power of two.
    ///
    /// This counts slots, not values. Only
    /// [`MAX_LOAD_PERCENT`](hash_table::MAX_LOAD_PERCENT) of them can be
    /// filled (tombstones included) before the array doubles.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Empties the set in place, tombstones included, without giving memory
    /// back.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Rebuilds the bucket array at the smallest capacity that still holds
    /// every value.
    pub fn shrink_to_fit(&mut self) {
        self.table.shrink_to_fit();
    }

    /// Makes sure `additional` more values can go in without a growth
    /// rehash.
    pub fn reserve(&mut self, additional: usize) {
        self.table.reserve(additional);
    }

    /// Fallible [`reserve`](Self::reserve). On error the set is unchanged.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        self.table.try_reserve(additional)
    }

    /// Adds `value`, returning `false` if an equal value was already present.
    ///
    /// A duplicate leaves the set untouched: the stored value is kept and
    /// `value` is dropped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use probe_set::HashSet;
    ///
    /// let mut set: HashSet<&str> = HashSet::new();
    /// assert!(set.insert("apple"));
    /// assert!(!set.insert("apple"));
    /// assert_eq!(set.len(), 1);
    /// # }
    /// ```
    pub fn insert(&mut self, value: T) -> bool {
        let hash = self.hash(&value);
        match self.table.entry(hash, |stored| *stored == value) {
            Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Fallible [`insert`](Self::insert).
    ///
    /// If placing `value` needs a growth rehash and the new bucket array
    /// cannot be allocated, the error is returned and `value` is dropped.
    /// The values already in the set stay where they were.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use probe_set::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// assert_eq!(set.try_insert(7), Ok(true));
    /// assert_eq!(set.try_insert(7), Ok(false));
    /// # }
    /// ```
    pub fn try_insert(&mut self, value: T) -> Result<bool, TryReserveError> {
        let hash = self.hash(&value);
        Ok(match self.table.try_entry(hash, |stored| *stored == value)? {
            Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
            Entry::Occupied(_) => false,
        })
    }

    /// Membership test. Probing walks past tombstones and stops at the first
    /// empty slot.
    pub fn contains(&self, value: &T) -> bool {
        self.get(value).is_some()
    }

    /// The stored value equal to `value`, if any.
    pub fn get(&self, value: &T) -> Option<&T> {
        self.table.find(self.hash(value), |stored| stored == value)
    }

    /// Removes `value`, returning whether it was present.
    ///
    /// The freed slot becomes a tombstone. Once tombstones pass
    /// [`MAX_TOMBSTONE_PERCENT`](hash_table::MAX_TOMBSTONE_PERCENT) of the
    /// slots the set is compacted at its current capacity.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use probe_set::HashSet;
    ///
    /// let mut set: HashSet<u32> = (0..10).collect();
    /// assert!(set.remove(&3));
    /// assert!(!set.remove(&3));
    /// assert_eq!(set.len(), 9);
    /// # }
    /// ```
    pub fn remove(&mut self, value: &T) -> bool {
        self.take(value).is_some()
    }

    /// Fallible [`remove`](Self::remove).
    ///
    /// If the removal needs a compaction rehash and the new bucket array
    /// cannot be allocated, the error is returned and `value` stays in the
    /// set.
    pub fn try_remove(&mut self, value: &T) -> Result<bool, TryReserveError> {
        let hash = self.hash(value);
        let removed = self.table.try_remove(hash, |stored| stored == value)?;
        Ok(removed.is_some())
    }

    /// Removes and hands back the stored value equal to `value`.
    pub fn take(&mut self, value: &T) -> Option<T> {
        let hash = self.hash(value);
        self.table.remove(hash, |stored| stored == value)
    }

    /// Stores `value`, handing back the equal value it displaced, if any.
    pub fn replace(&mut self, value: T) -> Option<T> {
        let hash = self.hash(&value);
        match self.table.entry(hash, |stored| *stored == value) {
            Entry::Occupied(mut slot) => Some(core::mem::replace(slot.get_mut(), value)),
            Entry::Vacant(slot) => {
                slot.insert(value);
                None
            }
        }
    }

    /// Keeps only the values `keep` accepts. Rejected values leave
    /// tombstones, compacted afterwards if there are too many.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use probe_set::HashSet;
    ///
    /// let mut set: HashSet<u32> = (0..100).collect();
    /// set.retain(|n| n % 25 == 0);
    /// assert_eq!(set.len(), 4);
    /// # }
    /// ```
    pub fn retain(&mut self, keep: impl FnMut(&T) -> bool) {
        self.table.retain(keep);
    }

    /// Borrowing iterator in slot order, which is unspecified.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter(self.table.iter())
    }

    /// Moves every value out, leaving an empty set of the same capacity.
    pub fn drain(&mut self) -> Drain<'_, T> {
        Drain(self.table.drain())
    }
}

impl<T, S> HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    /// An empty set at the minimum capacity with a default hasher.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use probe_set::HashSet;
    /// use probe_set::hash_table::MIN_CAPACITY;
    ///
    /// let set: HashSet<String> = HashSet::new();
    /// assert_eq!(set.capacity(), MIN_CAPACITY);
    /// # }
    /// ```
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// An empty set with room for `capacity` values and a default hasher.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, S::default())
    }

    /// Fallible [`with_capacity`](Self::with_capacity).
    pub fn try_with_capacity(capacity: usize) -> Result<Self, TryReserveError> {
        Self::try_with_capacity_and_hasher(capacity, S::default())
    }
}

impl<T, S> Default for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug, S> fmt::Debug for HashSet<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(&self.table).finish()
    }
}

/// Two sets are equal when they hold the same values, whatever their
/// capacities, tombstones or slot layout.
impl<T, S> PartialEq for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|value| other.contains(value))
    }
}

impl<T, S> Eq for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
}

impl<T, S> Extend<T> for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, values: I) {
        let values = values.into_iter();
        self.reserve(values.size_hint().0);
        values.for_each(|value| {
            self.insert(value);
        });
    }
}

impl<T, S> FromIterator<T> for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(values: I) -> Self {
        let mut set = Self::new();
        set.extend(values);
        set
    }
}

impl<T, S> IntoIterator for HashSet<T, S> {
    type IntoIter = IntoIter<T>;
    type Item = T;

    fn into_iter(self) -> IntoIter<T> {
        IntoIter(self.table.into_iter())
    }
}

impl<'a, T, S> IntoIterator for &'a HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    type IntoIter = Iter<'a, T>;
    type Item = &'a T;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

/// Borrowing iterator returned by [`HashSet::iter`].
pub struct Iter<'a, T>(hash_table::Iter<'a, T>);

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<&'a T> {
        self.0.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

/// Draining iterator returned by [`HashSet::drain`]. Values it never yields
/// are dropped along with it.
pub struct Drain<'a, T>(hash_table::Drain<'a, T>);

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        self.0.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<T> ExactSizeIterator for Drain<'_, T> {}

/// Owning iterator produced by `HashSet::into_iter`.
pub struct IntoIter<T>(hash_table::IntoIter<T>);

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        self.0.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}
