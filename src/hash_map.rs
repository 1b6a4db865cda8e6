//! A hash map that rehashes progressively instead of all at once.
//!
//! [`HashMap`] keeps two fixed-size tables, `current` and `old`. In the
//! steady state `old` is an empty placeholder and every operation talks
//! to `current` alone. When an insert pushes the load factor past 3/4
//! (or removals leave the table much too large), the map does not move
//! any entries: it swaps a fresh, resized table into `current` and
//! leaves every existing entry in `old`. From then on, each mutating
//! operation first migrates a single entry from `old` into `current`
//! before doing its own work, so the cost of the resize is spread one
//! entry at a time across the operations that follow it instead of being
//! paid in one latency spike. When the last entry has trickled across,
//! `old` is released and the map is back on its fast path.
//!
//! While a migration is in flight the two tables jointly hold the map's
//! contents, and a key lives in exactly one of them. An insert whose key
//! still sits in `old` is refused there rather than duplicated in
//! `current` (inserts never overwrite; in-place updates go through the
//! entry API); removals try both sides; lookups probe the table that
//! currently holds more entries first, since that is where a hit is most
//! likely. Lookups deliberately do not advance the migration, so a read
//! through a shared reference never mutates the map.
//!
//! Migration is fed by the fixed table's `steal_elements` primitive: a
//! persistent cursor walks the old table's buckets from the high end
//! down, so a full drain visits each bucket at most twice, and the
//! per-call scan bound keeps one operation from stalling on a long run
//! of empty buckets. A second resize cannot start while a migration is
//! in flight; the load check is suppressed until `old` runs dry.
//!
//! The memory cost of this scheme is that both tables coexist for the
//! length of the migration window, roughly tripling the steady-state
//! footprint at the moment of a doubling.

use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::marker::PhantomData;
use core::mem;
use core::ptr::NonNull;

use crate::fixed_map;
use crate::fixed_map::FixedMap;

/// Bucket count of a map constructed without a capacity hint.
const DEFAULT_BUCKET_COUNT: usize = 10;

/// Entries migrated from `old` to `current` per mutating operation.
/// One entry keeps the added worst-case latency constant.
const MIGRATE_BATCH: usize = 1;

/// Tables at or below this bucket count are never shrunk.
const SHRINK_MIN_BUCKETS: usize = 16;

/// A hash map with incremental rehashing and hybrid collision buckets.
///
/// `HashMap<K, V, S>` stores key-value pairs where keys implement
/// `Hash + Ord` and uses a caller-supplied hasher builder `S` to hash
/// keys. The `Ord` bound is what lets an overloaded bucket fall back to
/// a search tree, keeping lookups logarithmic per bucket even when the
/// hash function degenerates.
///
/// # Performance characteristics
///
/// - Insert, lookup, and removal are expected constant time, and a
///   resize never moves more than a single entry inside any one
///   operation.
/// - Worst-case lookup inside one bucket is logarithmic in the bucket's
///   length, not linear, under adversarial hashing.
pub struct HashMap<K, V, S> {
    current: FixedMap<K, V>,
    old: FixedMap<K, V>,
    rehashing: bool,
    hash_builder: S,
}

impl<K, V, S> Debug for HashMap<K, V, S>
where
    K: Debug + Hash + Ord,
    V: Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut map = f.debug_map();
        for (k, v) in self.iter() {
            map.entry(k, v);
        }
        map.finish()
    }
}

impl<K, V, S> HashMap<K, V, S>
where
    K: Hash + Ord,
    S: BuildHasher,
{
    /// Creates a new hash map with the given hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use trickle_map::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let map: HashMap<i32, String, _> = HashMap::with_hasher(SimpleHasher);
    /// assert!(map.is_empty());
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_capacity_and_hasher(0, hash_builder)
    }

    /// Creates a new hash map sized to hold `capacity` elements before
    /// the first rehash, with the given hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use trickle_map::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let map: HashMap<i32, String, _> = HashMap::with_capacity_and_hasher(100, SimpleHasher);
    /// assert!(map.capacity() >= 100);
    /// ```
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        let bucket_count = if capacity == 0 {
            DEFAULT_BUCKET_COUNT
        } else {
            // Sized so `capacity` entries stay under the 3/4 threshold.
            capacity.saturating_mul(4) / 3 + 1
        };
        Self {
            current: FixedMap::with_bucket_count(bucket_count),
            old: FixedMap::with_bucket_count(1),
            rehashing: false,
            hash_builder,
        }
    }

    /// Returns the number of elements in the map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use trickle_map::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let mut map = HashMap::with_hasher(SimpleHasher);
    /// assert_eq!(map.len(), 0);
    /// map.insert(1, "a");
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn len(&self) -> usize {
        self.current.len() + self.old.len()
    }

    /// Returns `true` if the map contains no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of elements the map can hold before the next
    /// grow is scheduled.
    pub fn capacity(&self) -> usize {
        self.current.bucket_count() * 3 / 4
    }

    /// Returns the bucket count of the active table.
    pub fn bucket_count(&self) -> usize {
        self.current.bucket_count()
    }

    /// Returns `true` while entries are still migrating out of the
    /// previous table.
    ///
    /// Purely introspective; useful for tests and instrumentation.
    pub fn is_rehashing(&self) -> bool {
        self.rehashing
    }

    #[inline]
    fn hash_of(&self, key: &K) -> u64 {
        self.hash_builder.hash_one(key)
    }

    /// Inserts a key-value pair into the map and returns `true`.
    ///
    /// If the key is already present, in whichever table currently
    /// holds it, the map is left unchanged, the offered pair is
    /// dropped, and `false` is returned. Updating a stored value in
    /// place goes through [`entry`](HashMap::entry).
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use trickle_map::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let mut map = HashMap::with_hasher(SimpleHasher);
    /// assert!(map.insert(37, "a"));
    /// assert!(!map.insert(37, "b"));
    /// assert_eq!(map.get(&37), Some(&"a"));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> bool {
        self.advance_migration();
        let hash = self.hash_of(&key);
        let inserted = if self.rehashing && self.old.contains(hash, &key) {
            // The key still sits in the previous table; refusing here is
            // what keeps it from existing on both sides at once.
            false
        } else {
            self.current.insert(hash, key, value)
        };
        self.maybe_rehash();
        inserted
    }

    /// Returns a reference to the value corresponding to the key.
    ///
    /// Lookups never advance the migration; this takes `&self` and does
    /// not mutate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use trickle_map::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let mut map = HashMap::with_hasher(SimpleHasher);
    /// map.insert(1, "a");
    /// assert_eq!(map.get(&1), Some(&"a"));
    /// assert_eq!(map.get(&2), None);
    /// ```
    pub fn get(&self, key: &K) -> Option<&V> {
        let hash = self.hash_of(key);
        if !self.rehashing {
            return self.current.get(hash, key);
        }
        // Probe whichever table holds more entries first.
        let (larger, smaller) = if self.current.len() >= self.old.len() {
            (&self.current, &self.old)
        } else {
            (&self.old, &self.current)
        };
        larger.get(hash, key).or_else(|| smaller.get(hash, key))
    }

    /// Returns a mutable reference to the value corresponding to the
    /// key.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let hash = self.hash_of(key);
        if !self.rehashing {
            return self.current.get_mut(hash, key);
        }
        if self.current.len() >= self.old.len() {
            if let Some(value) = self.current.get_mut(hash, key) {
                return Some(value);
            }
            self.old.get_mut(hash, key)
        } else {
            if let Some(value) = self.old.get_mut(hash, key) {
                return Some(value);
            }
            self.current.get_mut(hash, key)
        }
    }

    /// Returns `true` if the map contains a value for the key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use trickle_map::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let mut map = HashMap::with_hasher(SimpleHasher);
    /// map.insert(1, "a");
    /// assert!(map.contains_key(&1));
    /// assert!(!map.contains_key(&2));
    /// ```
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Removes a key from the map, returning its value if it was
    /// present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use trickle_map::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let mut map = HashMap::with_hasher(SimpleHasher);
    /// map.insert(1, "a");
    /// assert_eq!(map.remove(&1), Some("a"));
    /// assert_eq!(map.remove(&1), None);
    /// ```
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Removes a key from the map, returning the stored key and value if
    /// it was present.
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        self.advance_migration();
        let hash = self.hash_of(key);
        let removed = if self.rehashing {
            // A key lives on exactly one side; trying both keeps that an
            // implementation detail.
            let from_current = self.current.remove(hash, key);
            let from_old = self.old.remove(hash, key);
            from_current.or(from_old)
        } else {
            self.current.remove(hash, key)
        };
        self.maybe_rehash();
        removed
    }

    /// Removes all elements from the map.
    ///
    /// Any in-flight migration is abandoned; the active table keeps its
    /// allocation.
    pub fn clear(&mut self) {
        self.current.clear();
        self.old = FixedMap::with_bucket_count(1);
        self.rehashing = false;
    }

    /// Keeps only the entries for which `keep` returns `true`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use trickle_map::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let mut map = HashMap::with_hasher(SimpleHasher);
    /// for k in 0..8 {
    ///     map.insert(k, k * 10);
    /// }
    /// map.retain(|k, _| k % 2 == 0);
    /// assert_eq!(map.len(), 4);
    /// ```
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        self.advance_migration();
        self.current.retain(&mut keep);
        self.old.retain(&mut keep);
        self.maybe_rehash();
    }

    /// Gets the entry for `key` for in-place manipulation.
    ///
    /// This is a mutating operation: it advances any in-flight migration
    /// before locating the key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use trickle_map::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let mut map = HashMap::with_hasher(SimpleHasher);
    /// *map.entry("poneyland").or_insert(12) += 10;
    /// assert_eq!(map.get(&"poneyland"), Some(&22));
    /// ```
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V, S> {
        self.advance_migration();
        let hash = self.hash_of(&key);
        if self.rehashing {
            if let Some(value) = self.old.get_mut(hash, &key) {
                let value = NonNull::from(value);
                return Entry::Occupied(OccupiedEntry {
                    map: self,
                    key,
                    value,
                });
            }
        }
        if let Some(value) = self.current.get_mut(hash, &key) {
            let value = NonNull::from(value);
            return Entry::Occupied(OccupiedEntry {
                map: self,
                key,
                value,
            });
        }
        Entry::Vacant(VacantEntry {
            map: self,
            key,
            hash,
        })
    }

    /// Iterates over the map's entries in unspecified order.
    ///
    /// Each live entry is visited exactly once, including entries that
    /// have not yet migrated out of the previous table.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use trickle_map::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let mut map = HashMap::with_hasher(SimpleHasher);
    /// map.insert(1, "one");
    /// map.insert(2, "two");
    /// assert_eq!(map.iter().count(), 2);
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            current: self.current.iter(),
            old: self.old.iter(),
        }
    }

    /// Iterates over the map's entries with mutable access to the
    /// values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            current: self.current.iter_mut(),
            old: self.old.iter_mut(),
        }
    }

    /// Iterates over the map's keys in unspecified order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Iterates over the map's values in unspecified order.
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// Iterates over the map's values with mutable access.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    /// Removes and yields every entry, leaving the map empty.
    ///
    /// The map is emptied even if the iterator is dropped without being
    /// exhausted.
    pub fn drain(&mut self) -> Drain<'_, K, V> {
        let bucket_count = self.current.bucket_count();
        let current = mem::replace(&mut self.current, FixedMap::with_bucket_count(bucket_count));
        let old = mem::replace(&mut self.old, FixedMap::with_bucket_count(1));
        self.rehashing = false;
        Drain {
            current: current.into_iter(),
            old: old.into_iter(),
            _map: PhantomData,
        }
    }

    /// Moves one entry from `old` into `current`, or finishes the
    /// migration when nothing is left.
    fn advance_migration(&mut self) {
        if !self.rehashing {
            return;
        }
        let stolen = self.old.steal_elements(MIGRATE_BATCH);
        if stolen.is_empty() && self.old.is_empty() {
            self.rehashing = false;
            // Release the drained table's storage.
            self.old = FixedMap::with_bucket_count(1);
            return;
        }
        for (key, value) in stolen {
            let hash = self.hash_of(&key);
            // Stolen keys were just removed from `old` and were never in
            // `current`, so no duplicate scan is needed.
            self.current.insert_unique(hash, key, value);
        }
    }

    /// Schedules a resize when the active table's load is out of range.
    /// Suppressed while a migration is already in flight.
    fn maybe_rehash(&mut self) {
        if self.rehashing {
            return;
        }
        let len = self.current.len();
        let buckets = self.current.bucket_count();
        if len * 4 >= buckets * 3 {
            self.rehash(buckets * 2);
        } else if buckets > len * 4 && buckets > SHRINK_MIN_BUCKETS {
            // A shrink lands at three buckets per entry, far enough from
            // both triggers that churn near the boundary stays quiet.
            self.rehash(len * 3);
        }
    }

    /// Swaps in a fresh table of `bucket_count` buckets and leaves every
    /// existing entry behind in `old`.
    fn rehash(&mut self, bucket_count: usize) {
        debug_assert!(self.old.is_empty());
        self.old = FixedMap::with_bucket_count(bucket_count);
        mem::swap(&mut self.current, &mut self.old);
        self.rehashing = true;
    }
}

impl<K, V, S> HashMap<K, V, S>
where
    K: Hash + Ord,
    S: BuildHasher + Default,
{
    /// Creates a new hash map using the default hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use trickle_map::HashMap;
    /// #
    /// # #[derive(Default)]
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let map: HashMap<i32, String, SimpleHasher> = HashMap::new();
    /// assert!(map.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// Creates a new hash map sized for `capacity` elements using the
    /// default hasher builder.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, S::default())
    }
}

impl<K, V, S> Default for HashMap<K, V, S>
where
    K: Hash + Ord,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

/// A view into a single entry in the map, which may either be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashMap`].
///
/// [`entry`]: HashMap::entry
pub enum Entry<'a, K, V, S> {
    /// A vacant entry.
    Vacant(VacantEntry<'a, K, V, S>),
    /// An occupied entry.
    Occupied(OccupiedEntry<'a, K, V, S>),
}

impl<'a, K, V, S> Entry<'a, K, V, S>
where
    K: Hash + Ord,
    S: BuildHasher,
{
    /// Inserts a default value if the entry is vacant and returns a
    /// mutable reference.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts a value computed from a closure if the entry is vacant
    /// and returns a mutable reference.
    pub fn or_insert_with<F>(self, default: F) -> &'a mut V
    where
        F: FnOnce() -> V,
    {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Provides in-place mutable access to an occupied entry before any
    /// potential inserts.
    pub fn and_modify<F>(self, f: F) -> Self
    where
        F: FnOnce(&mut V),
    {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            Entry::Vacant(entry) => Entry::Vacant(entry),
        }
    }

    /// Returns a reference to this entry's key.
    pub fn key(&self) -> &K {
        match self {
            Entry::Occupied(entry) => entry.key(),
            Entry::Vacant(entry) => entry.key(),
        }
    }
}

impl<'a, K, V, S> Entry<'a, K, V, S>
where
    K: Hash + Ord,
    V: Default,
    S: BuildHasher,
{
    /// Inserts the default value if the entry is vacant and returns a
    /// mutable reference.
    pub fn or_default(self) -> &'a mut V {
        self.or_insert_with(Default::default)
    }
}

/// A view into a vacant entry in the map.
pub struct VacantEntry<'a, K, V, S> {
    map: &'a mut HashMap<K, V, S>,
    key: K,
    hash: u64,
}

impl<'a, K, V, S> VacantEntry<'a, K, V, S>
where
    K: Hash + Ord,
    S: BuildHasher,
{
    /// Gets a reference to the key that would be used when inserting a
    /// value.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Takes ownership of the key.
    pub fn into_key(self) -> K {
        self.key
    }

    /// Inserts the value into the map and returns a mutable reference to
    /// it.
    pub fn insert(self, value: V) -> &'a mut V {
        let VacantEntry { map, key, hash } = self;
        // The key was absent from both tables when the entry was formed
        // and the map has not been touched since.
        let slot = NonNull::from(map.current.insert_unique(hash, key, value));
        map.maybe_rehash();
        // SAFETY: a rehash swaps the table headers but entry nodes are
        // separate heap allocations and never move, so `slot` still
        // points at the value inserted above, borrowed for 'a.
        unsafe { &mut *slot.as_ptr() }
    }
}

/// A view into an occupied entry in the map.
//
// An `OccupiedEntry` is only constructed by `entry` after locating the
// key, and it exclusively borrows the map for its whole lifetime. No
// operation can run between that lookup and the accessors below, and
// entry nodes are stable heap allocations, so `value` stays valid.
pub struct OccupiedEntry<'a, K, V, S> {
    map: &'a mut HashMap<K, V, S>,
    key: K,
    value: NonNull<V>,
}

impl<'a, K, V, S> OccupiedEntry<'a, K, V, S>
where
    K: Hash + Ord,
    S: BuildHasher,
{
    /// Gets a reference to the key used to locate the entry.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        // SAFETY: see the type-level invariant above.
        unsafe { self.value.as_ref() }
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        // SAFETY: see the type-level invariant above.
        unsafe { self.value.as_mut() }
    }

    /// Converts the entry into a mutable reference to the value with the
    /// lifetime of the map borrow.
    pub fn into_mut(self) -> &'a mut V {
        // SAFETY: see the type-level invariant above; the exclusive map
        // borrow is consumed into the returned reference.
        unsafe { &mut *self.value.as_ptr() }
    }

    /// Inserts a value into the entry and returns the old value.
    pub fn insert(&mut self, value: V) -> V {
        mem::replace(self.get_mut(), value)
    }

    /// Removes the entry from the map and returns the value.
    pub fn remove(self) -> V {
        self.remove_entry().1
    }

    /// Removes the entry from the map and returns the stored key and
    /// value.
    pub fn remove_entry(self) -> (K, V) {
        let OccupiedEntry { map, key, .. } = self;
        match map.remove_entry(&key) {
            Some(entry) => entry,
            None => unreachable!("occupied entry refers to a present key"),
        }
    }
}

/// An iterator over the key-value pairs of a [`HashMap`].
///
/// Yields the active table's entries first, then whatever has not yet
/// migrated out of the previous table.
pub struct Iter<'a, K, V> {
    current: fixed_map::Iter<'a, K, V>,
    old: fixed_map::Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.current.next().or_else(|| self.old.next())
    }
}

/// A mutable iterator over the key-value pairs of a [`HashMap`].
pub struct IterMut<'a, K, V> {
    current: fixed_map::IterMut<'a, K, V>,
    old: fixed_map::IterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        self.current.next().or_else(|| self.old.next())
    }
}

/// An iterator over the keys of a [`HashMap`].
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }
}

/// An iterator over the values of a [`HashMap`].
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }
}

/// A mutable iterator over the values of a [`HashMap`].
pub struct ValuesMut<'a, K, V> {
    inner: IterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }
}

/// A draining iterator over the key-value pairs of a [`HashMap`].
pub struct Drain<'a, K, V> {
    current: fixed_map::IntoIter<K, V>,
    old: fixed_map::IntoIter<K, V>,
    _map: PhantomData<&'a mut (K, V)>,
}

impl<K: Ord, V> Iterator for Drain<'_, K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.current.next().or_else(|| self.old.next())
    }
}

/// An owning iterator over the key-value pairs of a [`HashMap`].
pub struct IntoIter<K, V> {
    current: fixed_map::IntoIter<K, V>,
    old: fixed_map::IntoIter<K, V>,
}

impl<K: Ord, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.current.next().or_else(|| self.old.next())
    }
}

impl<K, V, S> IntoIterator for HashMap<K, V, S>
where
    K: Hash + Ord,
    S: BuildHasher,
{
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            current: self.current.into_iter(),
            old: self.old.into_iter(),
        }
    }
}

impl<'a, K, V, S> IntoIterator for &'a HashMap<K, V, S>
where
    K: Hash + Ord,
    S: BuildHasher,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a mut HashMap<K, V, S>
where
    K: Hash + Ord,
    S: BuildHasher,
{
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K, V, S> Extend<(K, V)> for HashMap<K, V, S>
where
    K: Hash + Ord,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for HashMap<K, V, S>
where
    K: Hash + Ord,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::with_hasher(S::default());
        map.extend(iter);
        map
    }
}

impl<K, V, S, const N: usize> From<[(K, V); N]> for HashMap<K, V, S>
where
    K: Hash + Ord,
    S: BuildHasher + Default,
{
    fn from(entries: [(K, V); N]) -> Self {
        Self::from_iter(entries)
    }
}
