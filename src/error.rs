//! Allocation failures reported by the fallible (`try_*`) entry points.

use core::alloc::Layout;

/// Why a container could not obtain a block.
///
/// The infallible operations never return this: they panic on
/// `CapacityOverflow` and abort through `handle_alloc_error` on `Exhausted`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum AllocError {
    /// The allocator had no block of the requested shape.
    #[error("allocator exhausted: {size} bytes aligned to {align} unavailable")]
    Exhausted { size: usize, align: usize },

    /// The requested element count does not fit in a single `Layout`.
    #[error("capacity overflow")]
    CapacityOverflow,
}

impl AllocError {
    pub(crate) fn exhausted(layout: Layout) -> Self {
        AllocError::Exhausted {
            size: layout.size(),
            align: layout.align(),
        }
    }
}

impl From<core::alloc::LayoutError> for AllocError {
    fn from(_: core::alloc::LayoutError) -> Self {
        AllocError::CapacityOverflow
    }
}

/// Turn a failed infallible-path allocation into the fatal outcome.
#[cold]
pub(crate) fn fatal(err: AllocError) -> ! {
    match err {
        AllocError::CapacityOverflow => panic!("capacity overflow"),
        AllocError::Exhausted { size, align } => {
            tracing::error!(size, align, "allocator exhausted");
            match Layout::from_size_align(size, align) {
                Ok(layout) => alloc::alloc::handle_alloc_error(layout),
                Err(_) => panic!("allocator exhausted"),
            }
        }
    }
}
