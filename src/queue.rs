//! Bounded lock-free MPMC ring queue.
//!
//! Each worker owns one of these; producers push into it on submission and
//! up to two consumers pop from it (the owning worker and the sibling that
//! steals from it). There is no mutex anywhere: a per-slot sequence counter
//! serializes producer and consumer access to that slot.
//!
//! # Protocol
//!
//! Capacity is a power of two; positions are free-running and wrap through
//! `pos & mask`. Slot `i` starts with `sequence = i`.
//!
//! - A producer may claim slot `s` when `sequence == enqueue_pos`. It CASes
//!   the cursor forward, writes the value, then release-stores
//!   `sequence = pos + 1`.
//! - A consumer may claim the slot when `sequence == dequeue_pos + 1`. It
//!   CASes the cursor forward, reads the value, then release-stores
//!   `sequence = pos + capacity`, handing the slot back to producers one lap
//!   later.
//!
//! The acquire load of `sequence` synchronizes with the release store of
//! whichever side last finished with the slot, so the value bytes are
//! visible before anyone commits to reading or overwriting them. A sequence
//! lagging the cursor means full (producer side) or empty (consumer side);
//! neither case blocks or spins.
//!
//! Run the model checks with `RUSTFLAGS="--cfg loom" cargo test --lib`.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;

#[cfg(not(loom))]
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(loom)]
use loom::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

struct Slot<T> {
    sequence: AtomicUsize,
    value: UnsafeCell<MaybeUninit<T>>,
}

/// Fixed-capacity multi-producer multi-consumer queue.
///
/// `push` fails on a full queue and `pop` on an empty one; neither ever
/// waits. Capacity is rounded up to a power of two, minimum 2.
pub struct BoundedQueue<T> {
    slots: Box<[Slot<T>]>,
    mask: usize,
    enqueue_pos: CachePadded<AtomicUsize>,
    dequeue_pos: CachePadded<AtomicUsize>,
}

// SAFETY: slots are handed between threads through the sequence protocol
// above; a value is only ever observed by the single thread that claimed
// its slot.
unsafe impl<T: Send> Send for BoundedQueue<T> {}
unsafe impl<T: Send> Sync for BoundedQueue<T> {}

impl<T> BoundedQueue<T> {
    /// Creates a queue with at least `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2).next_power_of_two();
        let slots = (0..capacity)
            .map(|i| Slot {
                sequence: AtomicUsize::new(i),
                value: UnsafeCell::new(MaybeUninit::uninit()),
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            slots,
            mask: capacity - 1,
            enqueue_pos: CachePadded::new(AtomicUsize::new(0)),
            dequeue_pos: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// Snapshot of the resident element count.
    ///
    /// Exact only while the queue is quiescent; under concurrency it is a
    /// momentary approximation.
    pub fn len(&self) -> usize {
        let tail = self.enqueue_pos.load(Ordering::Relaxed);
        let head = self.dequeue_pos.load(Ordering::Relaxed);
        tail.wrapping_sub(head).min(self.capacity())
    }

    /// `true` if the snapshot in [`len`](BoundedQueue::len) is zero.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Attempts to enqueue `value`, returning it back if the queue is full.
    pub fn push(&self, value: T) -> Result<(), T> {
        let mut pos = self.enqueue_pos.load(Ordering::Relaxed);
        loop {
            let slot = &self.slots[pos & self.mask];
            let seq = slot.sequence.load(Ordering::Acquire);
            let diff = (seq as isize).wrapping_sub(pos as isize);

            if diff == 0 {
                match self.enqueue_pos.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // SAFETY: the CAS makes this thread the slot's only
                        // writer until the sequence store below publishes it.
                        unsafe { (*slot.value.get()).write(value) };
                        slot.sequence.store(pos.wrapping_add(1), Ordering::Release);
                        return Ok(());
                    }
                    Err(current) => pos = current,
                }
            } else if diff < 0 {
                // The slot has not been consumed since the previous lap.
                return Err(value);
            } else {
                pos = self.enqueue_pos.load(Ordering::Relaxed);
            }
        }
    }

    /// Attempts to dequeue one element.
    pub fn pop(&self) -> Option<T> {
        let mut pos = self.dequeue_pos.load(Ordering::Relaxed);
        loop {
            let slot = &self.slots[pos & self.mask];
            let seq = slot.sequence.load(Ordering::Acquire);
            let diff = (seq as isize).wrapping_sub(pos.wrapping_add(1) as isize);

            if diff == 0 {
                match self.dequeue_pos.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // SAFETY: the CAS makes this thread the slot's only
                        // reader; the acquire load above saw the producer's
                        // release store, so the value is initialized.
                        let value = unsafe { (*slot.value.get()).assume_init_read() };
                        slot.sequence
                            .store(pos.wrapping_add(self.mask + 1), Ordering::Release);
                        return Some(value);
                    }
                    Err(current) => pos = current,
                }
            } else if diff < 0 {
                return None;
            } else {
                pos = self.dequeue_pos.load(Ordering::Relaxed);
            }
        }
    }
}

impl<T> Drop for BoundedQueue<T> {
    fn drop(&mut self) {
        // Teardown does not drain into execution; resident elements are
        // simply dropped.
        while self.pop().is_some() {}
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread;

    #[test]
    fn rounds_capacity_up() {
        assert_eq!(BoundedQueue::<u32>::new(0).capacity(), 2);
        assert_eq!(BoundedQueue::<u32>::new(1).capacity(), 2);
        assert_eq!(BoundedQueue::<u32>::new(5).capacity(), 8);
        assert_eq!(BoundedQueue::<u32>::new(1024).capacity(), 1024);
    }

    #[test]
    fn push_pop_roundtrip() {
        let q = BoundedQueue::new(4);
        assert_eq!(q.pop(), None);
        q.push(1).unwrap();
        q.push(2).unwrap();
        assert_eq!(q.len(), 2);
        assert_eq!(q.pop(), Some(1));
        assert_eq!(q.pop(), Some(2));
        assert_eq!(q.pop(), None);
        assert!(q.is_empty());
    }

    #[test]
    fn full_queue_rejects_until_pop() {
        let q = BoundedQueue::new(2);
        q.push(1).unwrap();
        q.push(2).unwrap();
        assert_eq!(q.push(3), Err(3));
        assert_eq!(q.pop(), Some(1));
        q.push(3).unwrap();
        assert_eq!(q.pop(), Some(2));
        assert_eq!(q.pop(), Some(3));
    }

    #[test]
    fn wraps_many_laps() {
        let q = BoundedQueue::new(4);
        for i in 0..4 * 17 {
            q.push(i).unwrap();
            assert_eq!(q.pop(), Some(i));
        }
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn concurrent_exactly_once_delivery() {
        const PRODUCERS: usize = 4;
        const CONSUMERS: usize = 2;
        const PER_PRODUCER: usize = 500;
        const TOTAL: usize = PRODUCERS * PER_PRODUCER;

        let q = Arc::new(BoundedQueue::new(64));
        let seen = Arc::new(Mutex::new(HashSet::new()));
        let popped = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for p in 0..PRODUCERS {
            let q = Arc::clone(&q);
            handles.push(thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    let mut item = p * PER_PRODUCER + i;
                    loop {
                        match q.push(item) {
                            Ok(()) => break,
                            Err(back) => {
                                item = back;
                                thread::yield_now();
                            }
                        }
                    }
                }
            }));
        }
        for _ in 0..CONSUMERS {
            let q = Arc::clone(&q);
            let seen = Arc::clone(&seen);
            let popped = Arc::clone(&popped);
            handles.push(thread::spawn(move || {
                while popped.load(Ordering::SeqCst) < TOTAL {
                    match q.pop() {
                        Some(v) => {
                            assert!(seen.lock().unwrap().insert(v), "duplicate delivery of {}", v);
                            popped.fetch_add(1, Ordering::SeqCst);
                        }
                        None => thread::yield_now(),
                    }
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(seen.lock().unwrap().len(), TOTAL);
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn single_producer_order_is_fifo() {
        let q = BoundedQueue::new(16);
        for i in 0..10 {
            q.push(i).unwrap();
        }
        for i in 0..10 {
            assert_eq!(q.pop(), Some(i));
        }
    }

    #[test]
    fn dropping_queue_drops_resident_elements() {
        let witness = Arc::new(());
        let q = BoundedQueue::new(8);
        for _ in 0..5 {
            q.push(Arc::clone(&witness)).unwrap();
        }
        assert_eq!(Arc::strong_count(&witness), 6);
        drop(q);
        assert_eq!(Arc::strong_count(&witness), 1);
    }
}

#[cfg(all(test, loom))]
mod loom_tests {
    use super::*;
    use loom::sync::Arc;
    use loom::thread;

    #[test]
    fn two_producers_one_consumer() {
        loom::model(|| {
            let q = Arc::new(BoundedQueue::new(2));

            let q1 = Arc::clone(&q);
            let t1 = thread::spawn(move || q1.push(1u8).is_ok());
            let q2 = Arc::clone(&q);
            let t2 = thread::spawn(move || q2.push(2u8).is_ok());

            let pushed =
                usize::from(t1.join().unwrap()) + usize::from(t2.join().unwrap());
            assert_eq!(pushed, 2);

            let mut got = Vec::new();
            while got.len() < 2 {
                match q.pop() {
                    Some(v) => got.push(v),
                    None => thread::yield_now(),
                }
            }
            got.sort_unstable();
            assert_eq!(got, vec![1, 2]);
            assert!(q.pop().is_none());
        });
    }

    #[test]
    fn producer_consumer_race_is_exactly_once() {
        loom::model(|| {
            let q = Arc::new(BoundedQueue::new(2));
            q.push(7u8).unwrap();

            let thief = Arc::clone(&q);
            let t = thread::spawn(move || thief.pop());

            let local = q.pop();
            let stolen = t.join().unwrap();

            // One side wins, never both and never neither.
            assert!(local.is_some() ^ stolen.is_some());
            assert_eq!(local.or(stolen), Some(7));
        });
    }
}
