//! The allocator contract every container allocates through.
//!
//! Two shapes are offered. `Allocator` is the trait containers are generic
//! over; any caller state (arena, pool, leak tracker) lives in the
//! implementing value itself. `AllocatorCallbacks` is the plain
//! function-pointer form: an allocate/deallocate pair plus a borrowed,
//! caller-owned context the container never looks inside.

use crate::error::AllocError;
use core::alloc::Layout;
use core::fmt;
use core::ptr::NonNull;

/// Source of raw memory blocks.
///
/// # Safety
///
/// Implementors must return blocks of at least `layout.size()` bytes aligned
/// to `layout.align()`, and the block must stay valid until handed back to
/// `deallocate` on the same allocator. Containers never pass a zero-sized
/// layout.
pub unsafe trait Allocator {
    /// Obtain a block shaped like `layout`.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Return a block.
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate` on this allocator with the same
    /// `layout`, and must not have been deallocated already.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

unsafe impl<A: Allocator + ?Sized> Allocator for &A {
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        (**self).allocate(layout)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { (**self).deallocate(ptr, layout) }
    }
}

/// The `alloc` crate's global allocator.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Global;

unsafe impl Allocator for Global {
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        debug_assert!(layout.size() != 0);
        // SAFETY: containers never request zero-sized blocks.
        let ptr = unsafe { alloc::alloc::alloc(layout) };
        NonNull::new(ptr).ok_or_else(|| AllocError::exhausted(layout))
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { alloc::alloc::dealloc(ptr.as_ptr(), layout) }
    }
}

/// `fn(size, align, context) -> block`; null means exhausted.
pub type AllocateFn<C> = fn(usize, usize, &C) -> *mut u8;
/// `fn(block, context)`.
pub type DeallocateFn<C> = fn(*mut u8, &C);

/// Function-pointer allocator contract with an opaque caller context.
///
/// The context is borrowed, so it outlives every container built on it.
/// Containers write through whatever `allocate` returns, so building one is
/// `unsafe`:
///
/// ```compile_fail
/// fn any(_: usize, _: usize, _: &()) -> *mut u8 { 16 as *mut u8 }
/// fn none(_: *mut u8, _: &()) {}
/// let cb = tote::AllocatorCallbacks::new(any, none, &());
/// ```
///
/// and the fields are private:
///
/// ```compile_fail
/// fn any(_: usize, _: usize, _: &()) -> *mut u8 { 16 as *mut u8 }
/// fn none(_: *mut u8, _: &()) {}
/// let cb = tote::AllocatorCallbacks { allocate: any, deallocate: none, context: &() };
/// ```
pub struct AllocatorCallbacks<'c, C: ?Sized> {
    allocate: AllocateFn<C>,
    deallocate: DeallocateFn<C>,
    context: &'c C,
}

impl<'c, C: ?Sized> AllocatorCallbacks<'c, C> {
    /// Bundle an allocate/deallocate pair with their context.
    ///
    /// # Safety
    ///
    /// For as long as the returned value or a copy of it is used:
    ///
    /// - `allocate(size, align, context)` returns null or a block of at
    ///   least `size` bytes aligned to `align`, not aliased by anything else
    ///   and valid until passed to `deallocate`;
    /// - `deallocate(block, context)` accepts every block `allocate`
    ///   returned, exactly once.
    ///
    /// ```
    /// use std::alloc::{alloc, dealloc, Layout};
    /// use tote::{AllocatorCallbacks, ResizableArray};
    ///
    /// // Fixed 64-byte, 16-aligned blocks.
    /// fn take(size: usize, align: usize, _: &()) -> *mut u8 {
    ///     if size > 64 || align > 16 {
    ///         return std::ptr::null_mut();
    ///     }
    ///     unsafe { alloc(Layout::from_size_align(64, 16).unwrap()) }
    /// }
    /// fn give(block: *mut u8, _: &()) {
    ///     unsafe { dealloc(block, Layout::from_size_align(64, 16).unwrap()) }
    /// }
    ///
    /// // SAFETY: `take` hands out fresh global blocks that `give` frees.
    /// let cb = unsafe { AllocatorCallbacks::new(take, give, &()) };
    /// let mut a = ResizableArray::with_capacity_in(4, cb);
    /// a.push(1u64);
    /// assert_eq!(a[0], 1);
    /// assert!(a.try_reserve(100).is_err());
    /// ```
    pub const unsafe fn new(
        allocate: AllocateFn<C>,
        deallocate: DeallocateFn<C>,
        context: &'c C,
    ) -> Self {
        Self {
            allocate,
            deallocate,
            context,
        }
    }

    pub fn context(&self) -> &'c C {
        self.context
    }
}

impl<C: ?Sized> Clone for AllocatorCallbacks<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C: ?Sized> Copy for AllocatorCallbacks<'_, C> {}

impl<C: ?Sized> fmt::Debug for AllocatorCallbacks<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllocatorCallbacks")
            .field("context", &(self.context as *const C))
            .finish_non_exhaustive()
    }
}

// SAFETY: block validity is the caller's promise to `AllocatorCallbacks::new`.
unsafe impl<C: ?Sized> Allocator for AllocatorCallbacks<'_, C> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        let ptr = (self.allocate)(layout.size(), layout.align(), self.context);
        let block = NonNull::new(ptr).ok_or_else(|| AllocError::exhausted(layout))?;
        debug_assert!(
            block.as_ptr() as usize % layout.align() == 0,
            "allocate callback returned a misaligned block"
        );
        Ok(block)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, _layout: Layout) {
        (self.deallocate)(ptr.as_ptr(), self.context)
    }
}
