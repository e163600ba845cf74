// ResizableArray integration suite.
//
// Invariants exercised:
// - Order: elements keep insertion order across growth.
// - Growth: a full array doubles past its new size; clear keeps the block.
// - Accounting: release and drop return every block to the callbacks.
mod common;

use common::{init_test_logging, UserContext};
use tote::{ResizableArray, TrackingAllocator};

// Test: the full lifecycle over a callback allocator.
#[test]
fn lifecycle_over_callbacks() {
    init_test_logging();
    let ctx = UserContext::default();
    {
        let mut a: ResizableArray<u32, _> = ResizableArray::with_capacity_in(4, ctx.callbacks());
        assert!(a.is_empty());
        assert_eq!((a.len(), a.capacity()), (0, 4));

        a.push(0);
        assert_eq!((a.front(), a.back()), (Some(&0), Some(&0)));
        a.push(1);
        a.push(2);
        assert_eq!((a.len(), a.capacity()), (3, 4));
        assert_eq!(&a[..], &[0, 1, 2]);
        let mut it = a.iter();
        assert_eq!(it.next(), Some(&0));
        assert_eq!(it.next(), Some(&1));
        assert_eq!(it.next(), Some(&2));
        assert_eq!(it.next(), None);

        a[0] = 99;
        a[1] = 18;
        a[2] = 21;
        assert_eq!(&a[..], &[99, 18, 21]);

        a.push(3);
        assert_eq!((a.len(), a.capacity()), (4, 4));
        a.push(4);
        assert_eq!(a.len(), 5);
        assert!(a.capacity() >= 5);
        assert_eq!(&a[..], &[99, 18, 21, 3, 4]);
        assert_eq!((a.front(), a.back()), (Some(&99), Some(&4)));

        let capacity = a.capacity();
        a.clear();
        assert!(a.is_empty());
        assert_eq!(a.capacity(), capacity);
        a.push(0);
        a.push(1);
        assert_eq!(&a[..], &[0, 1]);

        a.release();
        assert!(a.is_empty());
        assert_eq!(a.capacity(), 0);
        assert_eq!(ctx.live_blocks(), 0);
        a.push(0);
        a.push(1);
        assert_eq!(&a[..], &[0, 1]);
        assert!(a.capacity() >= 2);
    }
    assert_eq!(ctx.alloc_count.get(), ctx.dealloc_count.get());
    assert_eq!(ctx.live_blocks(), 0);
}

// Test: an array with no initial block allocates on first push.
#[test]
fn empty_array_over_callbacks() {
    let ctx = UserContext::default();
    {
        let mut a: ResizableArray<u32, _> = ResizableArray::new_in(ctx.callbacks());
        assert!(a.is_empty());
        assert_eq!(a.capacity(), 0);
        assert_eq!(ctx.alloc_count.get(), 0);
        a.push(0);
        assert_eq!((a.front(), a.back()), (Some(&0), Some(&0)));
        assert_eq!(a.len(), 1);
        assert!(a.capacity() > 0);
    }
    assert_eq!(ctx.alloc_count.get(), ctx.dealloc_count.get());
}

// Test: out-of-range indexing panics instead of reading past the end.
#[test]
#[should_panic]
fn index_past_len_panics() {
    let mut a = ResizableArray::with_capacity(8);
    a.push(1u8);
    let _ = a[1];
}

// Test: growth of a non-Copy element type preserves every element and
// frees every old block.
#[test]
fn owned_elements_survive_growth() {
    let t = TrackingAllocator::new();
    let mut a = ResizableArray::new_in(&t);
    for i in 0..200 {
        a.push(format!("item-{i}"));
    }
    assert_eq!(a.len(), 200);
    assert!(a.iter().enumerate().all(|(i, s)| *s == format!("item-{i}")));
    assert_eq!(t.live_blocks(), 1);

    for s in &mut a {
        s.push('!');
    }
    assert_eq!(a.back().map(String::as_str), Some("item-199!"));
    drop(a);
    assert!(t.is_balanced());
}

// Test: the tracker composes over a callback allocator.
#[test]
fn tracker_wraps_callbacks() {
    let ctx = UserContext::default();
    let t = TrackingAllocator::wrap(ctx.callbacks());
    {
        let mut a = ResizableArray::new_in(&t);
        a.extend(0..50u64);
        assert_eq!(a.iter().sum::<u64>(), 1225);
        assert!(t.peak_bytes() >= 50 * 8);
    }
    assert!(t.is_balanced());
    assert_eq!(ctx.alloc_count.get() as usize, t.allocations());
    assert_eq!(ctx.live_blocks(), 0);
}
