//! Blocking bounded FIFO.
//!
//! All state (queued items, the shutdown flag and the metrics) lives behind a
//! single mutex. Both condition variables wait on that mutex, so a check of
//! "is it full / empty / shut down" and the wait that follows it can never
//! miss a wake-up.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::fmt;
use tracing::debug;

/// Outcome of [`BoundedBuffer::remove`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removed<T> {
    /// The item at the head of the queue.
    Item(T),
    /// The buffer was shut down and fully drained. No item will ever follow.
    Closed,
}

impl<T> Removed<T> {
    /// Convert into an `Option`, mapping `Closed` to `None`.
    pub fn into_item(self) -> Option<T> {
        match self {
            Removed::Item(item) => Some(item),
            Removed::Closed => None,
        }
    }

    /// Whether this is the shutdown signal.
    pub fn is_closed(&self) -> bool {
        matches!(self, Removed::Closed)
    }
}

/// Returned by [`BoundedBuffer::insert`] when the buffer has been shut down.
///
/// Carries the rejected item back to the caller.
#[derive(PartialEq, Eq)]
pub struct BufferClosed<T>(pub T);

impl<T> BufferClosed<T> {
    /// Take back the item that could not be inserted.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for BufferClosed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BufferClosed(..)")
    }
}

impl<T> fmt::Display for BufferClosed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("insert into a shut down buffer")
    }
}

impl<T> std::error::Error for BufferClosed<T> {}

/// Counters maintained under the buffer lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferMetrics {
    /// Items successfully inserted.
    pub inserted: u64,
    /// Items handed out by `remove`.
    pub removed: u64,
    /// Highest number of items held at once.
    pub peak_occupancy: usize,
    /// Inserts that found the buffer full and had to wait.
    pub producer_waits: u64,
    /// Removes that found the buffer empty and had to wait.
    pub consumer_waits: u64,
}

struct BufferState<T> {
    items: VecDeque<T>,
    shutdown: bool,
    metrics: BufferMetrics,
}

/// A capacity-bounded FIFO shared by many producers and many consumers.
///
/// `insert` blocks while the buffer is full, `remove` blocks while it is
/// empty. [`signal_shutdown`](Self::signal_shutdown) is the one-way
/// transition to "no more data": consumers drain whatever is left and then
/// observe [`Removed::Closed`].
pub struct BoundedBuffer<T> {
    state: Mutex<BufferState<T>>,
    /// Signalled when space frees up (or on shutdown).
    not_full: Condvar,
    /// Signalled when an item arrives (or on shutdown).
    not_empty: Condvar,
    capacity: usize,
}

impl<T> BoundedBuffer<T> {
    /// Create an empty buffer holding at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "BoundedBuffer capacity must be at least 1");
        Self {
            state: Mutex::new(BufferState {
                items: VecDeque::with_capacity(capacity),
                shutdown: false,
                metrics: BufferMetrics::default(),
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            capacity,
        }
    }

    /// Maximum number of items the buffer holds.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append `item` at the tail, waiting while the buffer is full.
    ///
    /// Wakes one waiting consumer on success. Fails only if the buffer is
    /// (or becomes, while waiting) shut down, handing the item back.
    pub fn insert(&self, item: T) -> Result<(), BufferClosed<T>> {
        let mut state = self.state.lock();

        if state.items.len() >= self.capacity && !state.shutdown {
            state.metrics.producer_waits += 1;
            while state.items.len() >= self.capacity && !state.shutdown {
                self.not_full.wait(&mut state);
            }
        }

        if state.shutdown {
            return Err(BufferClosed(item));
        }

        state.items.push_back(item);
        state.metrics.inserted += 1;
        let occupancy = state.items.len();
        debug_assert!(occupancy <= self.capacity, "buffer over capacity");
        if occupancy > state.metrics.peak_occupancy {
            state.metrics.peak_occupancy = occupancy;
        }
        drop(state);

        self.not_empty.notify_one();
        Ok(())
    }

    /// Take the item at the head, waiting while the buffer is empty.
    ///
    /// Items still queued when shutdown is signalled are handed out first;
    /// `Closed` is returned only once the buffer is both shut down and empty.
    pub fn remove(&self) -> Removed<T> {
        let mut state = self.state.lock();

        if state.items.is_empty() && !state.shutdown {
            state.metrics.consumer_waits += 1;
            while state.items.is_empty() && !state.shutdown {
                self.not_empty.wait(&mut state);
            }
        }

        match state.items.pop_front() {
            Some(item) => {
                state.metrics.removed += 1;
                drop(state);
                self.not_full.notify_one();
                Removed::Item(item)
            }
            None => Removed::Closed,
        }
    }

    /// Mark the buffer as shut down and wake every waiter.
    ///
    /// Idempotent. Returns `true` for the call that performed the transition.
    pub fn signal_shutdown(&self) -> bool {
        let mut state = self.state.lock();
        if state.shutdown {
            return false;
        }
        state.shutdown = true;
        let remaining = state.items.len();
        drop(state);

        debug!(remaining, "Buffer shut down");
        self.not_empty.notify_all();
        self.not_full.notify_all();
        true
    }

    /// Whether shutdown has been signalled. Advisory only.
    pub fn is_shutdown(&self) -> bool {
        self.state.lock().shutdown
    }

    /// Current number of queued items. Advisory only: the value may be stale
    /// by the time the caller looks at it.
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Whether the buffer is currently empty. Advisory only.
    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// Snapshot of the buffer counters.
    pub fn metrics(&self) -> BufferMetrics {
        self.state.lock().metrics
    }
}

impl<T> fmt::Debug for BoundedBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("BoundedBuffer")
            .field("capacity", &self.capacity)
            .field("len", &state.items.len())
            .field("shutdown", &state.shutdown)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;
    use tracing_test::traced_test;

    /// Long enough for a spawned thread to reach its blocking wait.
    const SETTLE: Duration = Duration::from_millis(50);

    #[test]
    fn test_fifo_order() {
        let buffer = BoundedBuffer::new(4);
        assert_eq!(buffer.capacity(), 4);
        for i in 0..4 {
            buffer.insert(i).unwrap();
        }
        let drained: Vec<_> = (0..4).map(|_| buffer.remove().into_item().unwrap()).collect();
        assert_eq!(drained, vec![0, 1, 2, 3]);
        assert!(buffer.is_empty());
    }

    #[test]
    #[should_panic(expected = "capacity must be at least 1")]
    fn test_zero_capacity_panics() {
        let _ = BoundedBuffer::<u32>::new(0);
    }

    #[test]
    fn test_insert_blocks_while_full() {
        let buffer = BoundedBuffer::new(1);
        buffer.insert(1).unwrap();

        thread::scope(|s| {
            let producer = s.spawn(|| buffer.insert(2));

            thread::sleep(SETTLE);
            assert_eq!(buffer.len(), 1, "second insert must wait for space");

            assert_eq!(buffer.remove(), Removed::Item(1));
            assert!(producer.join().unwrap().is_ok());
        });

        assert_eq!(buffer.remove(), Removed::Item(2));
        let metrics = buffer.metrics();
        assert_eq!(metrics.producer_waits, 1);
        assert_eq!(metrics.peak_occupancy, 1);
    }

    #[test]
    fn test_remove_blocks_until_insert() {
        let buffer = BoundedBuffer::new(2);

        thread::scope(|s| {
            let consumer = s.spawn(|| buffer.remove());
            thread::sleep(SETTLE);
            buffer.insert(7).unwrap();
            assert_eq!(consumer.join().unwrap(), Removed::Item(7));
        });

        assert_eq!(buffer.metrics().consumer_waits, 1);
    }

    #[traced_test]
    #[test]
    fn test_shutdown_wakes_all_blocked_consumers() {
        let buffer = BoundedBuffer::<u32>::new(3);

        thread::scope(|s| {
            let consumers: Vec<_> = (0..4).map(|_| s.spawn(|| buffer.remove())).collect();
            thread::sleep(SETTLE);

            assert!(buffer.signal_shutdown());
            for consumer in consumers {
                assert!(consumer.join().unwrap().is_closed());
            }
        });

        assert!(logs_contain("Buffer shut down"));
    }

    #[test]
    fn test_shutdown_drains_remaining_items_first() {
        let buffer = BoundedBuffer::new(3);
        buffer.insert("a").unwrap();
        buffer.insert("b").unwrap();
        buffer.signal_shutdown();

        assert_eq!(buffer.remove(), Removed::Item("a"));
        assert_eq!(buffer.remove(), Removed::Item("b"));
        assert_eq!(buffer.remove(), Removed::Closed);
        assert_eq!(buffer.remove(), Removed::Closed);
    }

    #[test]
    fn test_zero_valued_item_is_not_closed() {
        let buffer = BoundedBuffer::new(1);
        buffer.insert(0.0f64).unwrap();
        buffer.signal_shutdown();

        assert_eq!(buffer.remove(), Removed::Item(0.0));
        assert_eq!(buffer.remove(), Removed::Closed);
    }

    #[test]
    fn test_signal_shutdown_is_idempotent() {
        let buffer = BoundedBuffer::<u8>::new(1);
        assert!(buffer.signal_shutdown());
        assert!(!buffer.signal_shutdown());
        assert!(buffer.is_shutdown());
    }

    #[test]
    fn test_insert_after_shutdown_returns_item() {
        let buffer = BoundedBuffer::new(2);
        buffer.signal_shutdown();

        let err = buffer.insert(42).unwrap_err();
        assert_eq!(err.into_inner(), 42);
        assert_eq!(buffer.metrics().inserted, 0);
    }

    #[test]
    fn test_shutdown_releases_producer_blocked_on_full() {
        let buffer = BoundedBuffer::new(1);
        buffer.insert(1).unwrap();

        thread::scope(|s| {
            let producer = s.spawn(|| buffer.insert(2));
            thread::sleep(SETTLE);
            buffer.signal_shutdown();
            assert_eq!(producer.join().unwrap(), Err(BufferClosed(2)));
        });

        assert_eq!(buffer.remove(), Removed::Item(1));
        assert_eq!(buffer.remove(), Removed::Closed);
    }

    #[test]
    fn test_many_producers_many_consumers() {
        const PRODUCERS: usize = 4;
        const PER_PRODUCER: usize = 500;
        const CAPACITY: usize = 3;

        let buffer = BoundedBuffer::new(CAPACITY);

        let per_consumer: Vec<Vec<(usize, usize)>> = thread::scope(|s| {
            let consumers: Vec<_> = (0..3)
                .map(|_| {
                    s.spawn(|| {
                        let mut seen = Vec::new();
                        while let Removed::Item(item) = buffer.remove() {
                            seen.push(item);
                        }
                        seen
                    })
                })
                .collect();

            let producers: Vec<_> = (0..PRODUCERS)
                .map(|producer| {
                    let buffer = &buffer;
                    s.spawn(move || {
                        for seq in 0..PER_PRODUCER {
                            buffer.insert((producer, seq)).unwrap();
                        }
                    })
                })
                .collect();

            for producer in producers {
                producer.join().unwrap();
            }
            buffer.signal_shutdown();

            consumers.into_iter().map(|c| c.join().unwrap()).collect()
        });

        let total: usize = per_consumer.iter().map(Vec::len).sum();
        assert_eq!(total, PRODUCERS * PER_PRODUCER);

        // Each consumer sees any one producer's items in generation order.
        for seen in &per_consumer {
            let mut last = [None; PRODUCERS];
            for &(producer, seq) in seen {
                if let Some(prev) = last[producer] {
                    assert!(seq > prev, "producer {} out of order", producer);
                }
                last[producer] = Some(seq);
            }
        }

        let metrics = buffer.metrics();
        assert_eq!(metrics.inserted, (PRODUCERS * PER_PRODUCER) as u64);
        assert_eq!(metrics.removed, metrics.inserted);
        assert!(metrics.peak_occupancy <= CAPACITY);
    }
}
