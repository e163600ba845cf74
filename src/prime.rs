//! Prime capacities and the load-factor rule.

/// Occupancy ratio at which a map grows.
pub const LOAD_FACTOR: f32 = 0.65;

/// Smallest capacity a map ever holds while allocated.
pub const MIN_CAPACITY: usize = 2;

/// Trial division up to the square root.
pub fn is_prime(n: usize) -> bool {
    if n <= 1 {
        return false;
    }
    let mut i = 2;
    while i <= n / i {
        if n % i == 0 {
            return false;
        }
        i += 1;
    }
    true
}

/// `n` when prime, otherwise the next prime above it (never below 2).
pub fn smallest_prime_at_least(n: usize) -> usize {
    if n <= MIN_CAPACITY {
        return MIN_CAPACITY;
    }
    if is_prime(n) {
        return n;
    }
    // first odd number above n
    let mut p = n + 1 + n % 2;
    while !is_prime(p) {
        p += 2;
    }
    p
}

/// Whether `load` entries in `capacity` slots reach `LOAD_FACTOR`.
#[inline]
pub fn is_close_to_full(load: usize, capacity: usize) -> bool {
    load as f32 / capacity as f32 >= LOAD_FACTOR
}

/// Capacity that follows `capacity` when a map grows.
#[inline]
pub(crate) fn next_capacity(capacity: usize) -> usize {
    smallest_prime_at_least(capacity.saturating_add(2))
}

/// Lower bound on `capacity_for(len)`, without the prime search.
#[inline]
pub(crate) fn capacity_floor(len: usize) -> usize {
    // float-to-int casts saturate
    (len as f32 / LOAD_FACTOR) as usize
}

/// Smallest prime capacity that holds `len` entries below the load factor.
pub(crate) fn capacity_for(len: usize) -> usize {
    let mut cap = smallest_prime_at_least(capacity_floor(len));
    while is_close_to_full(len, cap) {
        cap = next_capacity(cap);
    }
    cap
}
