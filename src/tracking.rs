//! Leak-tracking allocator wrapper.
//!
//! Records every live block handed out by the wrapped allocator and fails
//! fast when a block is returned twice or was never handed out. Meant as a
//! context for tests and debug builds; single-threaded like the containers.

use crate::allocator::{Allocator, Global};
use crate::error::AllocError;
use core::alloc::Layout;
use core::cell::{Cell, RefCell};
use core::ptr::NonNull;
use hashbrown::HashMap;

pub struct TrackingAllocator<A: Allocator = Global> {
    inner: A,
    live: RefCell<HashMap<usize, Layout>>,
    allocations: Cell<usize>,
    deallocations: Cell<usize>,
    peak_bytes: Cell<usize>,
}

impl TrackingAllocator<Global> {
    pub fn new() -> Self {
        Self::wrap(Global)
    }
}

impl Default for TrackingAllocator<Global> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Allocator> TrackingAllocator<A> {
    pub fn wrap(inner: A) -> Self {
        Self {
            inner,
            live: RefCell::new(HashMap::new()),
            allocations: Cell::new(0),
            deallocations: Cell::new(0),
            peak_bytes: Cell::new(0),
        }
    }

    /// Blocks handed out so far.
    pub fn allocations(&self) -> usize {
        self.allocations.get()
    }

    /// Blocks returned so far.
    pub fn deallocations(&self) -> usize {
        self.deallocations.get()
    }

    pub fn live_blocks(&self) -> usize {
        self.live.borrow().len()
    }

    pub fn live_bytes(&self) -> usize {
        self.live.borrow().values().map(Layout::size).sum()
    }

    /// Largest `live_bytes` observed.
    pub fn peak_bytes(&self) -> usize {
        self.peak_bytes.get()
    }

    /// True when every block handed out has come back.
    pub fn is_balanced(&self) -> bool {
        self.live.borrow().is_empty() && self.allocations() == self.deallocations()
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }
}

unsafe impl<A: Allocator> Allocator for TrackingAllocator<A> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        let ptr = self.inner.allocate(layout)?;
        let fresh = self
            .live
            .borrow_mut()
            .insert(ptr.as_ptr() as usize, layout)
            .is_none();
        assert!(fresh, "allocator handed out a block that is still live");
        self.allocations.set(self.allocations.get() + 1);
        let live = self.live_bytes();
        if live > self.peak_bytes.get() {
            self.peak_bytes.set(live);
        }
        tracing::trace!(addr = ptr.as_ptr() as usize, size = layout.size(), "tracked allocate");
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        let recorded = self.live.borrow_mut().remove(&(ptr.as_ptr() as usize));
        match recorded {
            Some(l) => assert_eq!(l, layout, "block returned with a different layout"),
            None => panic!("deallocate of a block that is not live (double free or foreign block)"),
        }
        self.deallocations.set(self.deallocations.get() + 1);
        tracing::trace!(addr = ptr.as_ptr() as usize, size = layout.size(), "tracked deallocate");
        unsafe { self.inner.deallocate(ptr, layout) }
    }
}
