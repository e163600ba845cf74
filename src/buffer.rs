//! OwnedBuffer: RAII owner of one allocator block.
//!
//! A buffer holds at most one block at a time. Growth allocates the new
//! block, lets the caller migrate contents, then returns the old block, so
//! two blocks are only ever live inside `try_replace_with`. Releasing is
//! idempotent and dropping releases. Contents are the caller's business:
//! the buffer never runs element destructors.

use crate::allocator::Allocator;
use crate::error::AllocError;
use core::alloc::Layout;
use core::ptr::NonNull;

pub struct OwnedBuffer<A: Allocator> {
    ptr: NonNull<u8>,
    // `None` while no block is held; zero-sized layouts are kept here
    // without ever reaching the allocator.
    layout: Option<Layout>,
    alloc: A,
}

impl<A: Allocator> OwnedBuffer<A> {
    /// An empty buffer that has not allocated.
    pub const fn new_in(alloc: A) -> Self {
        Self {
            ptr: NonNull::dangling(),
            layout: None,
            alloc,
        }
    }

    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Start of the block; dangling (but well-aligned for `u8`) when empty.
    #[inline]
    pub fn as_ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    pub fn is_allocated(&self) -> bool {
        self.layout.is_some()
    }

    fn obtain(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if layout.size() == 0 {
            // Aligned dangling pointer; never handed to the allocator.
            return Ok(NonNull::new(layout.align() as *mut u8).unwrap_or(NonNull::dangling()));
        }
        let ptr = self.alloc.allocate(layout)?;
        tracing::trace!(size = layout.size(), align = layout.align(), "buffer block allocated");
        Ok(ptr)
    }

    fn give_back(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() == 0 {
            return;
        }
        tracing::trace!(size = layout.size(), align = layout.align(), "buffer block released");
        // SAFETY: `ptr` came from `obtain` with this layout and is only
        // returned once, since the caller drops its record of it.
        unsafe { self.alloc.deallocate(ptr, layout) }
    }

    /// Swap in a fresh block shaped like `layout`.
    ///
    /// `migrate(old, new)` runs while both blocks are live; `old` is `None`
    /// if nothing was held. The old block is released afterwards. If
    /// `migrate` unwinds, the old block stays owned and the new one leaks.
    pub fn try_replace_with<F>(&mut self, layout: Layout, migrate: F) -> Result<(), AllocError>
    where
        F: FnOnce(Option<NonNull<u8>>, NonNull<u8>),
    {
        let fresh = self.obtain(layout)?;
        let old = self.layout.map(|_| self.ptr);
        migrate(old, fresh);
        if let Some(old_layout) = self.layout.take() {
            self.give_back(self.ptr, old_layout);
        }
        self.ptr = fresh;
        self.layout = Some(layout);
        Ok(())
    }

    /// Return the block, if any. Safe to call repeatedly.
    pub fn release(&mut self) {
        if let Some(layout) = self.layout.take() {
            self.give_back(self.ptr, layout);
        }
        self.ptr = NonNull::dangling();
    }
}

impl<A: Allocator> Drop for OwnedBuffer<A> {
    fn drop(&mut self) {
        self.release();
    }
}
