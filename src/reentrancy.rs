//! Debug-only detection of re-entry into a map.
//!
//! The map calls user code (`ProbeKey::home_slot`, `Eq`) while probing,
//! shifting and rehashing; during a shift or rehash the table is briefly
//! inconsistent. Each public operation marks itself busy, and a nested
//! entry panics naming the interrupted operation. Release builds compile
//! this away.

#[cfg(debug_assertions)]
use core::cell::Cell;
use core::marker::PhantomData;

#[derive(Debug)]
pub(crate) struct ReentrancyCheck {
    #[cfg(debug_assertions)]
    active: Cell<Option<&'static str>>,
    // !Send + !Sync, matching the single-threaded containers.
    _nosend: PhantomData<*mut ()>,
}

impl ReentrancyCheck {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            active: Cell::new(None),
            _nosend: PhantomData,
        }
    }

    /// Mark `op` as running until the returned guard drops.
    #[inline]
    pub(crate) fn enter(&self, op: &'static str) -> BusyGuard<'_> {
        #[cfg(debug_assertions)]
        {
            if let Some(running) = self.active.get() {
                panic!("map re-entered by `{op}` while `{running}` was running");
            }
            self.active.set(Some(op));
            BusyGuard { owner: self }
        }

        #[cfg(not(debug_assertions))]
        {
            let _ = op;
            BusyGuard { _z: PhantomData }
        }
    }
}

impl Default for ReentrancyCheck {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) struct BusyGuard<'a> {
    #[cfg(debug_assertions)]
    owner: &'a ReentrancyCheck,
    #[cfg(not(debug_assertions))]
    _z: PhantomData<&'a ()>,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            debug_assert!(self.owner.active.get().is_some());
            self.owner.active.set(None);
        }
    }
}
