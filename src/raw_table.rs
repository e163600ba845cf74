//! RawTable: slot storage for `HashMap` in one allocator block.
//!
//! The block holds three arrays back to back, each aligned for its type:
//!
//! ```text
//! | occupied: [bool; cap] | pad | keys: [K; cap] | pad | values: [V; cap] |
//! ```
//!
//! A key/value pair is initialized exactly when its `occupied` flag is set.
//! This layer knows nothing about key equality or load factors; it offers
//! slot-level reads and writes, a first-free-slot rehash used for growth,
//! and drops live entries when cleared or dropped.

use crate::allocator::Allocator;
use crate::buffer::OwnedBuffer;
use crate::error::{fatal, AllocError};
use crate::key::{home_of, ProbeKey};
use core::alloc::Layout;
use core::marker::PhantomData;
use core::mem;
use core::ptr::{self, NonNull};

/// Offsets of the three arrays for one capacity.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct TableLayout {
    block: Layout,
    keys_offset: usize,
    values_offset: usize,
}

impl TableLayout {
    const EMPTY: TableLayout = TableLayout {
        block: Layout::new::<()>(),
        keys_offset: 0,
        values_offset: 0,
    };

    pub(crate) fn for_capacity<K, V>(capacity: usize) -> Result<Self, AllocError> {
        let flags = Layout::array::<bool>(capacity)?;
        let (with_keys, keys_offset) = flags.extend(Layout::array::<K>(capacity)?)?;
        let (block, values_offset) = with_keys.extend(Layout::array::<V>(capacity)?)?;
        Ok(Self {
            block: block.pad_to_align(),
            keys_offset,
            values_offset,
        })
    }

    #[inline]
    fn flags(&self, base: NonNull<u8>) -> *mut bool {
        base.as_ptr().cast()
    }

    /// # Safety
    /// `base` must be a block of this layout and `i` below its capacity.
    #[inline]
    unsafe fn key<K>(&self, base: NonNull<u8>, i: usize) -> *mut K {
        unsafe { base.as_ptr().add(self.keys_offset).cast::<K>().add(i) }
    }

    /// # Safety
    /// `base` must be a block of this layout and `i` below its capacity.
    #[inline]
    unsafe fn value<V>(&self, base: NonNull<u8>, i: usize) -> *mut V {
        unsafe { base.as_ptr().add(self.values_offset).cast::<V>().add(i) }
    }
}

pub(crate) struct RawTable<K, V, A: Allocator> {
    buffer: OwnedBuffer<A>,
    layout: TableLayout,
    capacity: usize,
    _marker: PhantomData<(K, V)>,
}

impl<K, V, A: Allocator> RawTable<K, V, A> {
    /// Zero-capacity table; nothing allocated.
    pub(crate) const fn new_in(alloc: A) -> Self {
        Self {
            buffer: OwnedBuffer::new_in(alloc),
            layout: TableLayout::EMPTY,
            capacity: 0,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn allocator(&self) -> &A {
        self.buffer.allocator()
    }

    #[inline]
    fn base(&self) -> NonNull<u8> {
        self.buffer.as_ptr()
    }

    #[inline]
    pub(crate) fn occupied(&self) -> &[bool] {
        // SAFETY: the flag array is initialized for the whole capacity; for
        // capacity 0 the dangling base is valid for an empty slice.
        unsafe { core::slice::from_raw_parts(self.layout.flags(self.base()), self.capacity) }
    }

    #[inline]
    fn occupied_mut(&mut self) -> &mut [bool] {
        // SAFETY: as for `occupied`; `&mut self` makes the borrow unique.
        unsafe { core::slice::from_raw_parts_mut(self.layout.flags(self.base()), self.capacity) }
    }

    #[inline]
    pub(crate) fn is_occupied(&self, i: usize) -> bool {
        self.occupied()[i]
    }

    /// # Safety
    /// Slot `i` must be occupied.
    #[inline]
    pub(crate) unsafe fn key(&self, i: usize) -> &K {
        debug_assert!(self.is_occupied(i));
        unsafe { &*self.layout.key::<K>(self.base(), i) }
    }

    /// # Safety
    /// Slot `i` must be occupied.
    #[inline]
    pub(crate) unsafe fn value(&self, i: usize) -> &V {
        debug_assert!(self.is_occupied(i));
        unsafe { &*self.layout.value::<V>(self.base(), i) }
    }

    /// # Safety
    /// Slot `i` must be occupied.
    #[inline]
    pub(crate) unsafe fn value_mut(&mut self, i: usize) -> &mut V {
        debug_assert!(self.is_occupied(i));
        unsafe { &mut *self.layout.value::<V>(self.base(), i) }
    }

    /// Fill a free slot and flag it.
    ///
    /// # Safety
    /// `i` must be below capacity and unoccupied.
    pub(crate) unsafe fn write(&mut self, i: usize, key: K, value: V) {
        debug_assert!(!self.is_occupied(i));
        let base = self.base();
        unsafe {
            ptr::write(self.layout.key::<K>(base, i), key);
            ptr::write(self.layout.value::<V>(base, i), value);
        }
        self.occupied_mut()[i] = true;
    }

    /// Move the pair out of a slot and unflag it.
    ///
    /// # Safety
    /// Slot `i` must be occupied.
    pub(crate) unsafe fn take(&mut self, i: usize) -> (K, V) {
        debug_assert!(self.is_occupied(i));
        self.occupied_mut()[i] = false;
        let base = self.base();
        unsafe {
            (
                ptr::read(self.layout.key::<K>(base, i)),
                ptr::read(self.layout.value::<V>(base, i)),
            )
        }
    }

    /// Relocate the pair in `from` to the free slot `to`.
    ///
    /// # Safety
    /// `from` must be occupied, `to` unoccupied, both below capacity.
    pub(crate) unsafe fn relocate(&mut self, from: usize, to: usize) {
        debug_assert!(self.is_occupied(from) && !self.is_occupied(to));
        let base = self.base();
        unsafe {
            ptr::copy_nonoverlapping(
                self.layout.key::<K>(base, from),
                self.layout.key::<K>(base, to),
                1,
            );
            ptr::copy_nonoverlapping(
                self.layout.value::<V>(base, from),
                self.layout.value::<V>(base, to),
                1,
            );
        }
        let flags = self.occupied_mut();
        flags[to] = true;
        flags[from] = false;
    }

    /// Drop every live pair and unflag all slots. Capacity is kept.
    pub(crate) fn drop_entries(&mut self) {
        if mem::needs_drop::<K>() || mem::needs_drop::<V>() {
            for i in 0..self.capacity {
                if self.is_occupied(i) {
                    // Unflag first so a panicking destructor cannot lead to
                    // a second drop of the same pair.
                    // SAFETY: slot `i` was just checked to be occupied.
                    drop(unsafe { self.take(i) });
                }
            }
        } else {
            self.occupied_mut().fill(false);
        }
    }

    /// Drop entries and return the block. Capacity becomes 0.
    pub(crate) fn release(&mut self) {
        self.drop_entries();
        self.buffer.release();
        self.layout = TableLayout::EMPTY;
        self.capacity = 0;
    }

    #[cfg(test)]
    pub(crate) fn iter_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.occupied()
            .iter()
            .enumerate()
            .filter_map(|(i, &used)| used.then_some(i))
    }

    /// Raw column pointers for iterators that hand out disjoint borrows.
    pub(crate) fn columns(&self) -> (*const bool, *mut K, *mut V) {
        let base = self.base();
        if self.capacity == 0 {
            return (
                NonNull::<bool>::dangling().as_ptr() as *const bool,
                NonNull::<K>::dangling().as_ptr(),
                NonNull::<V>::dangling().as_ptr(),
            );
        }
        // SAFETY: capacity > 0, so `base` is a live block laid out by `layout`.
        unsafe {
            (
                self.layout.flags(base) as *const bool,
                self.layout.key::<K>(base, 0),
                self.layout.value::<V>(base, 0),
            )
        }
    }
}

impl<K: ProbeKey, V, A: Allocator> RawTable<K, V, A> {
    /// Slot holding `key`, or the first free slot on its probe path.
    ///
    /// Requires capacity > 0 and at least one free slot.
    pub(crate) fn find_slot(&self, key: &K) -> usize {
        let cap = self.capacity;
        debug_assert!(cap > 0);
        let occupied = self.occupied();
        let mut i = home_of(key, cap);
        // SAFETY: the flag for `i` is checked before its key is read.
        while occupied[i] && unsafe { self.key(i) } != key {
            i = (i + 1) % cap;
        }
        i
    }

    /// Occupied slot holding `key`, if any.
    pub(crate) fn lookup(&self, key: &K) -> Option<usize> {
        if self.capacity == 0 {
            return None;
        }
        let i = self.find_slot(key);
        self.is_occupied(i).then_some(i)
    }

    /// Move every pair into a fresh block of `new_capacity` slots.
    ///
    /// Keys are unique, so each pair goes to the first free slot on its new
    /// probe path without comparing keys. Entry count is unchanged.
    pub(crate) fn try_grow(&mut self, new_capacity: usize) -> Result<(), AllocError> {
        debug_assert!(new_capacity > self.capacity);
        let next = TableLayout::for_capacity::<K, V>(new_capacity)?;
        let prev = self.layout;
        let prev_capacity = self.capacity;
        // SAFETY: `new` is a fresh block laid out by `next`, `old` the block
        // laid out by `prev`; every slot index is reduced below its capacity.
        self.buffer.try_replace_with(next.block, |old, new| unsafe {
            let new_flags = next.flags(new);
            ptr::write_bytes(new_flags, 0, new_capacity);
            let Some(old) = old else { return };
            let old_flags = prev.flags(old);
            for i in 0..prev_capacity {
                if !*old_flags.add(i) {
                    continue;
                }
                *old_flags.add(i) = false;
                let key = ptr::read(prev.key::<K>(old, i));
                let value = ptr::read(prev.value::<V>(old, i));
                let mut slot = home_of(&key, new_capacity);
                while *new_flags.add(slot) {
                    slot = (slot + 1) % new_capacity;
                }
                ptr::write(next.key::<K>(new, slot), key);
                ptr::write(next.value::<V>(new, slot), value);
                *new_flags.add(slot) = true;
            }
        })?;
        self.layout = next;
        self.capacity = new_capacity;
        Ok(())
    }

    pub(crate) fn grow(&mut self, new_capacity: usize) {
        if let Err(e) = self.try_grow(new_capacity) {
            fatal(e)
        }
    }
}

impl<K, V, A: Allocator> Drop for RawTable<K, V, A> {
    fn drop(&mut self) {
        self.drop_entries();
    }
}
