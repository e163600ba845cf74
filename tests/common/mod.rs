// Shared fixtures for the integration tests: logging setup and a
// callback-style allocator context that records every block it hands out.
#![allow(dead_code)]

use std::alloc::Layout;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::Once;
use tote::AllocatorCallbacks;

static INIT_LOGGING: Once = Once::new();

/// Initialize test logging with debug-level output.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::DEBUG);
}

pub fn init_test_logging_with_level(level: tracing::Level) {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .with_target(true)
            .with_ansi(false)
            .try_init();
    });
}

/// Caller-owned state behind `AllocatorCallbacks`: counts and the live
/// block set, so double or foreign frees fail the test.
#[derive(Default)]
pub struct UserContext {
    pub alloc_count: Cell<u32>,
    pub dealloc_count: Cell<u32>,
    live: RefCell<HashMap<usize, Layout>>,
    /// Allocations still allowed; `None` is unlimited.
    pub budget: Cell<Option<u32>>,
}

impl UserContext {
    pub fn with_budget(blocks: u32) -> Self {
        let ctx = Self::default();
        ctx.budget.set(Some(blocks));
        ctx
    }

    pub fn live_blocks(&self) -> usize {
        self.live.borrow().len()
    }

    pub fn callbacks(&self) -> AllocatorCallbacks<'_, UserContext> {
        // SAFETY: `allocate` returns null or a fresh global block of the
        // requested layout; `deallocate` frees it with the recorded layout.
        unsafe { AllocatorCallbacks::new(allocate, deallocate, self) }
    }
}

fn allocate(size: usize, align: usize, ctx: &UserContext) -> *mut u8 {
    if let Some(left) = ctx.budget.get() {
        if left == 0 {
            return std::ptr::null_mut();
        }
        ctx.budget.set(Some(left - 1));
    }
    let layout = Layout::from_size_align(size, align).expect("valid layout");
    let ptr = unsafe { std::alloc::alloc(layout) };
    assert!(!ptr.is_null());
    let prev = ctx.live.borrow_mut().insert(ptr as usize, layout);
    assert!(prev.is_none(), "block handed out twice");
    ctx.alloc_count.set(ctx.alloc_count.get() + 1);
    ptr
}

fn deallocate(ptr: *mut u8, ctx: &UserContext) {
    let layout = ctx
        .live
        .borrow_mut()
        .remove(&(ptr as usize))
        .expect("deallocate of a block this context never handed out");
    ctx.dealloc_count.set(ctx.dealloc_count.get() + 1);
    unsafe { std::alloc::dealloc(ptr, layout) };
}
