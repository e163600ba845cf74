//! ResizableArray: contiguous growable sequence over an injected allocator.
//!
//! Appending past capacity moves the elements to a block of twice the new
//! size and returns the old block, giving amortized O(1) `push`. Elements
//! keep insertion order across growth. Reads go through the slice the array
//! derefs to, so indexing is bounds-checked; `get_unchecked` on that slice
//! is the unchecked path.

use crate::allocator::{Allocator, Global};
use crate::buffer::OwnedBuffer;
use crate::error::{fatal, AllocError};
use core::alloc::Layout;
use core::fmt;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};
use core::ptr::{self, NonNull};

pub struct ResizableArray<T, A: Allocator = Global> {
    buffer: OwnedBuffer<A>,
    size: usize,
    capacity: usize,
    _marker: PhantomData<T>,
}

impl<T> ResizableArray<T> {
    pub fn new() -> Self {
        Self::new_in(Global)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_in(capacity, Global)
    }
}

impl<T> Default for ResizableArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A: Allocator> ResizableArray<T, A> {
    /// Empty array; allocates on first push.
    pub const fn new_in(alloc: A) -> Self {
        Self {
            buffer: OwnedBuffer::new_in(alloc),
            size: 0,
            capacity: 0,
            _marker: PhantomData,
        }
    }

    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        let mut array = Self::new_in(alloc);
        if capacity > 0 {
            array.change_capacity(capacity);
        }
        array
    }

    pub fn try_with_capacity_in(capacity: usize, alloc: A) -> Result<Self, AllocError> {
        let mut array = Self::new_in(alloc);
        if capacity > 0 {
            array.try_change_capacity(capacity)?;
        }
        Ok(array)
    }

    /// `initial_size` default elements in a block of
    /// `max(initial_size, initial_capacity)` slots.
    pub fn with_size_in(initial_size: usize, initial_capacity: usize, alloc: A) -> Self
    where
        T: Default,
    {
        let mut array = Self::with_capacity_in(initial_size.max(initial_capacity), alloc);
        for _ in 0..initial_size {
            array.push(T::default());
        }
        array
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn allocator(&self) -> &A {
        self.buffer.allocator()
    }

    #[inline]
    fn as_mut_ptr_raw(&self) -> *mut T {
        if self.buffer.is_allocated() {
            self.buffer.as_ptr().cast::<T>().as_ptr()
        } else {
            NonNull::<T>::dangling().as_ptr()
        }
    }

    /// Set the element count directly.
    ///
    /// # Safety
    /// `size <= capacity`, and every slot below `size` must hold an
    /// initialized element. Elements at or above `size` are forgotten.
    pub unsafe fn set_size(&mut self, size: usize) {
        debug_assert!(size <= self.capacity);
        self.size = size;
    }

    /// Pointer to the first slot, for callers filling slots before
    /// `set_size`. Valid for `capacity` elements.
    pub fn spare_ptr(&mut self) -> *mut T {
        self.as_mut_ptr_raw()
    }

    /// Append `value`, doubling past the new size when full.
    pub fn push(&mut self, value: T) {
        let index = self.size;
        if index >= self.capacity {
            let grown = index
                .checked_add(1)
                .and_then(|n| n.checked_mul(2))
                .unwrap_or_else(|| fatal(AllocError::CapacityOverflow));
            self.change_capacity(grown);
        }
        // SAFETY: `index < capacity` after growth.
        unsafe { self.as_mut_ptr_raw().add(index).write(value) };
        self.size = index + 1;
    }

    pub fn front(&self) -> Option<&T> {
        self.first()
    }

    pub fn back(&self) -> Option<&T> {
        self.last()
    }

    pub fn front_mut(&mut self) -> Option<&mut T> {
        self.first_mut()
    }

    pub fn back_mut(&mut self) -> Option<&mut T> {
        self.last_mut()
    }

    /// Ensure room for `additional` more elements without another move.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), AllocError> {
        let needed = self
            .size
            .checked_add(additional)
            .ok_or(AllocError::CapacityOverflow)?;
        if needed <= self.capacity {
            return Ok(());
        }
        self.try_change_capacity(needed)
    }

    pub fn reserve(&mut self, additional: usize) {
        if let Err(e) = self.try_reserve(additional) {
            fatal(e)
        }
    }

    /// Drop all elements; the block and capacity stay.
    pub fn clear(&mut self) {
        let live = self.size;
        // Reset first so a panicking destructor leaks instead of double-dropping.
        self.size = 0;
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.as_mut_ptr_raw(), live));
        }
    }

    /// Drop all elements and return the block. Safe to repeat.
    pub fn release(&mut self) {
        self.clear();
        self.buffer.release();
        self.capacity = 0;
    }

    fn try_change_capacity(&mut self, new_capacity: usize) -> Result<(), AllocError> {
        debug_assert!(new_capacity > self.capacity);
        let layout = Layout::array::<T>(new_capacity)?;
        let live = self.size;
        self.buffer.try_replace_with(layout, |old, new| {
            if let Some(old) = old {
                // SAFETY: both blocks hold at least `live` slots of `T`, and
                // distinct blocks never overlap.
                unsafe {
                    ptr::copy_nonoverlapping(
                        old.cast::<T>().as_ptr(),
                        new.cast::<T>().as_ptr(),
                        live,
                    )
                };
            }
        })?;
        tracing::trace!(from = self.capacity, to = new_capacity, "resizable array grow");
        self.capacity = new_capacity;
        Ok(())
    }

    fn change_capacity(&mut self, new_capacity: usize) {
        if let Err(e) = self.try_change_capacity(new_capacity) {
            fatal(e)
        }
    }
}

impl<T, A: Allocator> Deref for ResizableArray<T, A> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        // SAFETY: the first `size` slots are initialized; the pointer is
        // aligned and non-null even when nothing is allocated.
        unsafe { core::slice::from_raw_parts(self.as_mut_ptr_raw(), self.size) }
    }
}

impl<T, A: Allocator> DerefMut for ResizableArray<T, A> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        unsafe { core::slice::from_raw_parts_mut(self.as_mut_ptr_raw(), self.size) }
    }
}

impl<T, A: Allocator> Drop for ResizableArray<T, A> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T, A: Allocator> Extend<T> for ResizableArray<T, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for value in iter {
            self.push(value);
        }
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a ResizableArray<T, A> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a mut ResizableArray<T, A> {
    type Item = &'a mut T;
    type IntoIter = core::slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for ResizableArray<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
