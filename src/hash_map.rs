//! HashMap: open addressing over keys that are their own hash.
//!
//! Slots live in a `RawTable` whose capacity is always prime. A key's home
//! slot is `key % capacity`; collisions walk forward one slot at a time,
//! wrapping at the end. The table grows to the next prime at least two
//! slots larger once occupancy reaches `LOAD_FACTOR`, so at least one slot
//! is always free and every probe terminates.
//!
//! Probe invariant: for every occupied slot `i`, the walk from the home slot
//! of `key[i]` to `i` crosses no free slot. Lookups stop at the first free
//! slot, so every operation must leave this intact. Removal therefore does
//! not leave tombstones; it shifts later entries of the same run back into
//! the gap (see `erase`).

use crate::allocator::{Allocator, Global};
use crate::error::AllocError;
use crate::key::{home_of, ProbeKey};
use crate::prime::{
    capacity_floor, capacity_for, is_close_to_full, next_capacity, smallest_prime_at_least,
    MIN_CAPACITY,
};
use crate::raw_table::{RawTable, TableLayout};
use crate::reentrancy::ReentrancyCheck;
use core::fmt;
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::mem;
use core::ops::Index;

pub struct HashMap<K, V, A: Allocator = Global> {
    table: RawTable<K, V, A>,
    size: usize,
    reentrancy: ReentrancyCheck,
}

/// Whether `home` lies on the circular arc `(gap, scan]`.
///
/// An entry at `scan` whose home is on that arc never needed to pass `gap`
/// and must stay put; any other entry probed across `gap` and may move back.
#[inline]
fn home_between(gap: usize, home: usize, scan: usize) -> bool {
    if gap <= scan {
        gap < home && home <= scan
    } else {
        gap < home || home <= scan
    }
}

impl<K: ProbeKey, V> HashMap<K, V> {
    /// Empty map at the minimum capacity, backed by the global allocator.
    pub fn new() -> Self {
        Self::new_in(Global)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_in(capacity, Global)
    }
}

impl<K: ProbeKey, V> Default for HashMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, A: Allocator> HashMap<K, V, A> {
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Slot count; prime while allocated, 0 after `release`.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    pub fn allocator(&self) -> &A {
        self.table.allocator()
    }

    /// Drop all entries, keeping the block. O(capacity).
    pub fn clear(&mut self) {
        self.table.drop_entries();
        self.size = 0;
    }

    /// Drop all entries and return the block; capacity becomes 0.
    ///
    /// Calling this again is a no-op. The next insert reallocates at the
    /// minimum capacity.
    pub fn release(&mut self) {
        self.table.release();
        self.size = 0;
    }

    /// Visit every entry in slot order.
    ///
    /// The order follows slot positions, not insertion, and changes when
    /// the table grows.
    pub fn for_each<F>(&mut self, mut visit: F)
    where
        F: FnMut(&K, &mut V),
    {
        for (k, v) in self.iter_mut() {
            visit(k, v);
        }
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        let (flags, keys, values) = self.table.columns();
        Iter {
            flags,
            keys,
            values,
            index: 0,
            capacity: self.table.capacity(),
            remaining: self.size,
            _pd: PhantomData,
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        let (flags, keys, values) = self.table.columns();
        IterMut {
            flags,
            keys,
            values,
            index: 0,
            capacity: self.table.capacity(),
            remaining: self.size,
            _pd: PhantomData,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }
}

impl<K: ProbeKey, V, A: Allocator> HashMap<K, V, A> {
    /// Empty map at the minimum capacity.
    pub fn new_in(alloc: A) -> Self {
        Self::with_capacity_in(0, alloc)
    }

    /// Empty map with at least `capacity` slots, rounded up to a prime
    /// (never below 2).
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        let mut table = RawTable::new_in(alloc);
        table.grow(smallest_prime_at_least(capacity));
        Self {
            table,
            size: 0,
            reentrancy: ReentrancyCheck::new(),
        }
    }

    pub fn try_with_capacity_in(capacity: usize, alloc: A) -> Result<Self, AllocError> {
        let mut table = RawTable::new_in(alloc);
        table.try_grow(smallest_prime_at_least(capacity))?;
        Ok(Self {
            table,
            size: 0,
            reentrancy: ReentrancyCheck::new(),
        })
    }

    pub fn contains(&self, key: &K) -> bool {
        let _g = self.reentrancy.enter("contains");
        self.table.lookup(key).is_some()
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let _g = self.reentrancy.enter("get");
        let slot = self.table.lookup(key)?;
        // SAFETY: `lookup` only returns occupied slots.
        Some(unsafe { self.table.value(slot) })
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let _g = self.reentrancy.enter("get_mut");
        let slot = self.table.lookup(key)?;
        // SAFETY: `lookup` only returns occupied slots.
        Some(unsafe { self.table.value_mut(slot) })
    }

    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        let _g = self.reentrancy.enter("get_key_value");
        let slot = self.table.lookup(key)?;
        // SAFETY: `lookup` only returns occupied slots.
        Some(unsafe { (self.table.key(slot), self.table.value(slot)) })
    }

    /// Slot for a key about to be added, growing first if the new entry
    /// would reach the load factor. The probe is re-run after growth since
    /// the modulus changed.
    fn vacant_slot_after_growth(
        table: &mut RawTable<K, V, A>,
        size: usize,
        key: &K,
        probed: usize,
    ) -> usize {
        let capacity = table.capacity();
        if !is_close_to_full(size + 1, capacity) {
            return probed;
        }
        let next = next_capacity(capacity);
        tracing::debug!(from = capacity, to = next, len = size + 1, "hash map grow");
        table.grow(next);
        table.find_slot(key)
    }

    fn ensure_allocated(table: &mut RawTable<K, V, A>) {
        if table.capacity() == 0 {
            tracing::debug!(to = MIN_CAPACITY, "hash map reallocate after release");
            table.grow(MIN_CAPACITY);
        }
    }

    /// Insert or overwrite. Returns the previous value when `key` was
    /// present; in that case nothing else changes.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let _g = self.reentrancy.enter("insert");
        Self::ensure_allocated(&mut self.table);
        let slot = self.table.find_slot(&key);
        if self.table.is_occupied(slot) {
            // SAFETY: slot checked occupied.
            let current = unsafe { self.table.value_mut(slot) };
            return Some(mem::replace(current, value));
        }
        let slot = Self::vacant_slot_after_growth(&mut self.table, self.size, &key, slot);
        // SAFETY: `find_slot` returned a free slot for a key not present.
        unsafe { self.table.write(slot, key, value) };
        self.size += 1;
        None
    }

    /// Value for `key`, inserting `make()` first if absent.
    pub fn get_or_insert_with<F>(&mut self, key: K, make: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        let _g = self.reentrancy.enter("get_or_insert_with");
        Self::ensure_allocated(&mut self.table);
        let mut slot = self.table.find_slot(&key);
        if !self.table.is_occupied(slot) {
            slot = Self::vacant_slot_after_growth(&mut self.table, self.size, &key, slot);
            // SAFETY: `find_slot` returned a free slot for a key not present.
            unsafe { self.table.write(slot, key, make()) };
            self.size += 1;
        }
        // SAFETY: `slot` held `key` already or was just filled.
        unsafe { self.table.value_mut(slot) }
    }

    /// Indexed write access: the value for `key`, inserting `V::default()`
    /// first if absent.
    pub fn get_or_insert_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.get_or_insert_with(key, V::default)
    }

    /// Remove `key` and return its value; no-op when absent.
    ///
    /// Backward-shift deletion. `gap` is the free slot to refill, `scan`
    /// walks the rest of the run. Each occupied `scan` whose home lies on
    /// `(gap, scan]` is still reachable without crossing `gap` and stays;
    /// any other entry is moved into `gap`, and its old slot becomes the new
    /// gap. The run ends at the first free slot. Capacity never shrinks.
    pub fn erase(&mut self, key: &K) -> Option<V> {
        let _g = self.reentrancy.enter("erase");
        let mut gap = self.table.lookup(key)?;
        // SAFETY: `lookup` only returns occupied slots.
        let (_, value) = unsafe { self.table.take(gap) };
        self.size -= 1;

        let capacity = self.table.capacity();
        let mut scan = gap;
        loop {
            scan = (scan + 1) % capacity;
            if !self.table.is_occupied(scan) {
                break;
            }
            // SAFETY: `scan` checked occupied.
            let home = home_of(unsafe { self.table.key(scan) }, capacity);
            if home_between(gap, home, scan) {
                continue;
            }
            // SAFETY: `scan` is occupied and `gap` was vacated above or by
            // the previous relocation.
            unsafe { self.table.relocate(scan, gap) };
            gap = scan;
        }
        Some(value)
    }

    /// Drop all entries and go back to the minimum capacity.
    pub fn clear_and_shrink(&mut self) {
        let _g = self.reentrancy.enter("clear_and_shrink");
        tracing::debug!(from = self.table.capacity(), to = MIN_CAPACITY, "hash map shrink");
        self.table.release();
        self.size = 0;
        self.table.grow(MIN_CAPACITY);
    }

    /// Grow so that `additional` more entries fit without a resize.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), AllocError> {
        let _g = self.reentrancy.enter("reserve");
        let wanted = self
            .size
            .checked_add(additional)
            .ok_or(AllocError::CapacityOverflow)?;
        // Reject tables that cannot be laid out before searching for a prime.
        TableLayout::for_capacity::<K, V>(capacity_floor(wanted))?;
        let target = capacity_for(wanted);
        if target <= self.table.capacity() {
            return Ok(());
        }
        TableLayout::for_capacity::<K, V>(target)?;
        tracing::debug!(from = self.table.capacity(), to = target, "hash map reserve");
        self.table.try_grow(target)
    }

    pub fn reserve(&mut self, additional: usize) {
        if let Err(e) = self.try_reserve(additional) {
            crate::error::fatal(e)
        }
    }

    /// Check slot bookkeeping against the probe invariant.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        use crate::prime::{is_prime, LOAD_FACTOR};
        let cap = self.table.capacity();
        let occupied = self.table.occupied();
        assert_eq!(occupied.iter().filter(|&&f| f).count(), self.size);
        if cap == 0 {
            return;
        }
        assert!(is_prime(cap), "capacity {cap} is not prime");
        assert!((self.size as f32) / (cap as f32) < LOAD_FACTOR);
        for slot in self.table.iter_slots() {
            // SAFETY: `iter_slots` yields occupied slots.
            let key = unsafe { self.table.key(slot) };
            let mut i = home_of(key, cap);
            while i != slot {
                assert!(occupied[i], "free slot {i} interrupts probe path to {slot}");
                assert!(unsafe { self.table.key(i) } != key, "duplicate key");
                i = (i + 1) % cap;
            }
        }
    }
}

impl<K: ProbeKey, V, A: Allocator> Index<&K> for HashMap<K, V, A> {
    type Output = V;

    /// Panics when `key` is absent.
    fn index(&self, key: &K) -> &V {
        match self.get(key) {
            Some(v) => v,
            None => panic!("key not present in HashMap"),
        }
    }
}

impl<K: ProbeKey, V, A: Allocator> Extend<(K, V)> for HashMap<K, V, A> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K: ProbeKey, V> FromIterator<(K, V)> for HashMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = HashMap::new();
        map.extend(iter);
        map
    }
}

impl<K: fmt::Debug, V: fmt::Debug, A: Allocator> fmt::Debug for HashMap<K, V, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, K, V, A: Allocator> IntoIterator for &'a HashMap<K, V, A> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, A: Allocator> IntoIterator for &'a mut HashMap<K, V, A> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

/// Shared iterator over entries in slot order.
pub struct Iter<'a, K, V> {
    flags: *const bool,
    keys: *mut K,
    values: *mut V,
    index: usize,
    capacity: usize,
    remaining: usize,
    _pd: PhantomData<(&'a K, &'a V)>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        while self.index < self.capacity {
            let i = self.index;
            self.index += 1;
            // SAFETY: `i < capacity`; the map is borrowed for 'a, and a set
            // flag means the pair is initialized.
            unsafe {
                if *self.flags.add(i) {
                    self.remaining -= 1;
                    return Some((&*self.keys.add(i), &*self.values.add(i)));
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Mutable iterator over entries in slot order.
pub struct IterMut<'a, K, V> {
    flags: *const bool,
    keys: *mut K,
    values: *mut V,
    index: usize,
    capacity: usize,
    remaining: usize,
    _pd: PhantomData<(&'a K, &'a mut V)>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        while self.index < self.capacity {
            let i = self.index;
            self.index += 1;
            // SAFETY: as for `Iter`; each slot is yielded once, so the
            // mutable borrows are disjoint.
            unsafe {
                if *self.flags.add(i) {
                    self.remaining -= 1;
                    return Some((&*self.keys.add(i), &mut *self.values.add(i)));
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}
