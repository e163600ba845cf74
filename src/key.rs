//! Keys that are their own hash.
//!
//! The map never hashes: a key's home slot is the key taken modulo the
//! table capacity. Anything with a total equality and a well-defined
//! non-negative remainder can be a key.

/// A key usable as its own modulus.
pub trait ProbeKey: Eq {
    /// `self mod capacity`. `capacity` is never 0.
    ///
    /// Results outside `0..capacity` are reduced modulo `capacity` by the
    /// table, so a sloppy impl only costs probe length.
    fn home_slot(&self, capacity: usize) -> usize;
}

/// Home slot of `key`, forced into `0..capacity`.
#[inline]
pub(crate) fn home_of<K: ProbeKey + ?Sized>(key: &K, capacity: usize) -> usize {
    key.home_slot(capacity) % capacity
}

macro_rules! unsigned_probe_key {
    ($($t:ty),*) => {$(
        impl ProbeKey for $t {
            #[inline]
            fn home_slot(&self, capacity: usize) -> usize {
                (*self as u128 % capacity as u128) as usize
            }
        }
    )*};
}

macro_rules! signed_probe_key {
    ($($t:ty),*) => {$(
        impl ProbeKey for $t {
            #[inline]
            fn home_slot(&self, capacity: usize) -> usize {
                // Euclidean remainder keeps negative keys in range.
                (*self as i128).rem_euclid(capacity as i128) as usize
            }
        }
    )*};
}

unsigned_probe_key!(u8, u16, u32, u64, u128, usize);
signed_probe_key!(i8, i16, i32, i64, i128, isize);

impl<K: ProbeKey + ?Sized> ProbeKey for &K {
    #[inline]
    fn home_slot(&self, capacity: usize) -> usize {
        (**self).home_slot(capacity)
    }
}
