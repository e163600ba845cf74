//! tote: allocator-agnostic containers for code that must decide where
//! every byte comes from.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: two small containers whose every block of memory goes through
//!   a caller-supplied allocator, with nothing allocated behind its back.
//! - Layers:
//!   - Allocator: the contract (`allocate`/`deallocate` with an explicit
//!     `Layout`). `Global` forwards to the `alloc` crate;
//!     `AllocatorCallbacks` wraps a pair of plain functions plus an opaque
//!     context borrowed from the caller; its constructor is `unsafe` since
//!     the crate cannot check the blocks they return.
//!   - OwnedBuffer<A>: RAII owner of at most one block. Growth allocates
//!     the new block, migrates, then returns the old one.
//!   - ResizableArray<T, A>: contiguous sequence on an OwnedBuffer,
//!     doubling past the new size when full.
//!   - RawTable<K, V, A>: one block holding occupancy flags, keys and
//!     values as three columns; knows how to probe and rehash.
//!   - HashMap<K, V, A>: open addressing with linear probing, prime
//!     capacities, growth at a fixed load factor and backward-shift
//!     deletion (no tombstones).
//!
//! Constraints
//! - Single-threaded: containers are `!Sync`, and the map carries a
//!   debug-only reentrancy check around every public operation.
//! - Keys are their own hash: `ProbeKey::home_slot` is the key modulo the
//!   capacity. Integer keys are provided.
//! - Capacities are prime (or 0 before first use). The load after any
//!   insert that did not grow the table is below `LOAD_FACTOR`.
//! - Every allocation is paired with exactly one deallocation through
//!   the same allocator with the same layout, including on drop and when
//!   a container is overwritten by assignment.
//!
//! Failure
//! - Infallible paths treat allocator exhaustion as fatal
//!   (`handle_alloc_error`); every growth path has a `try_` twin that
//!   returns `AllocError` and leaves the container untouched.
//!
//! Notes and non-goals
//! - No thread safety and no general hashing.
//! - Iteration order is slot order, which is neither insertion nor key
//!   order.
//! - `TrackingAllocator` is a leak and misuse detector meant for tests
//!   and debugging, not a production allocator.

#![no_std]

extern crate alloc;
#[cfg(test)]
#[macro_use]
extern crate std;

mod allocator;
mod buffer;
mod error;
pub mod hash_map;
#[cfg(test)]
mod hash_map_proptest;
mod key;
mod prime;
mod raw_table;
mod reentrancy;
pub mod resizable_array;
mod tracking;

// Public surface
pub use allocator::{AllocateFn, Allocator, AllocatorCallbacks, DeallocateFn, Global};
pub use buffer::OwnedBuffer;
pub use error::AllocError;
pub use hash_map::{HashMap, Iter, IterMut};
pub use key::ProbeKey;
pub use prime::{is_close_to_full, is_prime, smallest_prime_at_least, LOAD_FACTOR, MIN_CAPACITY};
pub use resizable_array::ResizableArray;
pub use tracking::TrackingAllocator;
