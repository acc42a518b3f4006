//! Single-producer ring buffer with independent fan-out consumers
//!
//! The producer claims monotonically increasing sequences, writes the slot at
//! `sequence & mask`, then publishes with a release store into the shared
//! cursor. A consumer that observes the new cursor value with an acquire load
//! is guaranteed to see the fully written slot, so reads are never torn.
//!
//! The buffer tracks no consumer positions. Capacity must exceed the worst
//! lag any consumer can accumulate; if the producer laps a consumer, that
//! consumer reads stale data. This is a sizing contract, not a runtime check.

use crate::error::EngineError;
use crossbeam::utils::CachePadded;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

#[repr(C, align(64))]
struct Slot<T> {
    value: UnsafeCell<T>,
}

pub struct RingBuffer<T> {
    slots: Box<[Slot<T>]>,
    mask: u64,
    /// Next sequence to claim; producer-side only
    claim: CachePadded<AtomicU64>,
    /// Last published sequence, -1 before the first publish
    cursor: CachePadded<AtomicI64>,
}

// Slots are plain value cells; the cursor handshake orders every access.
unsafe impl<T: Copy + Send> Send for RingBuffer<T> {}
unsafe impl<T: Copy + Send> Sync for RingBuffer<T> {}

impl<T: Copy + Default> RingBuffer<T> {
    pub fn with_capacity(capacity: usize) -> Result<Self, EngineError> {
        if capacity == 0 || !capacity.is_power_of_two() {
            return Err(EngineError::CapacityNotPowerOfTwo(capacity));
        }

        let slots: Box<[Slot<T>]> = (0..capacity)
            .map(|_| Slot {
                value: UnsafeCell::new(T::default()),
            })
            .collect();

        Ok(Self {
            slots,
            mask: capacity as u64 - 1,
            claim: CachePadded::new(AtomicU64::new(0)),
            cursor: CachePadded::new(AtomicI64::new(-1)),
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Claim the next sequence for writing.
    ///
    /// Single-writer only: concurrent claims from multiple producers are
    /// undefined (a later publish would expose an earlier unwritten slot).
    #[inline]
    pub fn next(&self) -> u64 {
        self.claim.fetch_add(1, Ordering::Relaxed)
    }

    /// Fill the slot for `sequence`. Must happen before `publish(sequence)`.
    #[inline]
    pub fn write(&self, sequence: u64, value: T) {
        let slot = &self.slots[(sequence & self.mask) as usize];
        unsafe {
            *slot.value.get() = value;
        }
    }

    /// Make `sequence` visible to every consumer.
    #[inline]
    pub fn publish(&self, sequence: u64) {
        self.cursor.store(sequence as i64, Ordering::Release);
    }

    /// Last published sequence, -1 if nothing has been published yet.
    #[inline]
    pub fn cursor(&self) -> i64 {
        self.cursor.load(Ordering::Acquire)
    }

    /// Copy out the slot for `sequence`. Valid only for sequences at or below
    /// the published cursor that have not been lapped.
    #[inline]
    pub fn read(&self, sequence: u64) -> T {
        let slot = &self.slots[(sequence & self.mask) as usize];
        unsafe { *slot.value.get() }
    }
}

/// One independent fan-out reader: a private next-sequence against a shared buffer.
///
/// The local cursor only moves forward. Any number of consumers can follow the
/// same buffer, each at its own pace, and every one observes the full stream
/// in publish order.
pub struct RingConsumer<T> {
    ring: Arc<RingBuffer<T>>,
    next: u64,
}

impl<T: Copy + Default> RingConsumer<T> {
    pub fn new(ring: Arc<RingBuffer<T>>) -> Self {
        Self { ring, next: 0 }
    }

    /// Pop the next published event, or None when caught up.
    #[inline]
    pub fn try_next(&mut self) -> Option<T> {
        if self.ring.cursor() >= self.next as i64 {
            let value = self.ring.read(self.next);
            self.next += 1;
            Some(value)
        } else {
            None
        }
    }

    /// Last consumed sequence, -1 before the first event.
    #[inline]
    pub fn sequence(&self) -> i64 {
        self.next as i64 - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_rejects_non_power_of_two() {
        assert!(matches!(
            RingBuffer::<u64>::with_capacity(100),
            Err(EngineError::CapacityNotPowerOfTwo(100))
        ));
        assert!(matches!(
            RingBuffer::<u64>::with_capacity(0),
            Err(EngineError::CapacityNotPowerOfTwo(0))
        ));
        assert!(RingBuffer::<u64>::with_capacity(128).is_ok());
    }

    #[test]
    fn test_cursor_starts_below_zero() {
        let ring = RingBuffer::<u64>::with_capacity(8).unwrap();
        assert_eq!(ring.cursor(), -1);
    }

    #[test]
    fn test_publish_makes_slot_visible() {
        let ring = RingBuffer::<u64>::with_capacity(8).unwrap();

        let seq = ring.next();
        assert_eq!(seq, 0);
        ring.write(seq, 42);
        assert_eq!(ring.cursor(), -1);

        ring.publish(seq);
        assert_eq!(ring.cursor(), 0);
        assert_eq!(ring.read(seq), 42);
    }

    #[test]
    fn test_consumer_observes_publish_order() {
        let ring = Arc::new(RingBuffer::<u64>::with_capacity(16).unwrap());
        let mut consumer = RingConsumer::new(Arc::clone(&ring));

        assert_eq!(consumer.try_next(), None);

        for value in 0..10u64 {
            let seq = ring.next();
            ring.write(seq, value * 100);
            ring.publish(seq);
        }

        for value in 0..10u64 {
            assert_eq!(consumer.try_next(), Some(value * 100));
        }
        assert_eq!(consumer.try_next(), None);
        assert_eq!(consumer.sequence(), 9);
    }

    #[test]
    fn test_fan_out_consumers_see_identical_streams() {
        let ring = Arc::new(RingBuffer::<u64>::with_capacity(32).unwrap());
        let mut fast = RingConsumer::new(Arc::clone(&ring));
        let mut slow = RingConsumer::new(Arc::clone(&ring));

        for value in 0..20u64 {
            let seq = ring.next();
            ring.write(seq, value);
            ring.publish(seq);
        }

        let fast_view: Vec<u64> = std::iter::from_fn(|| fast.try_next()).collect();
        let slow_view: Vec<u64> = std::iter::from_fn(|| slow.try_next()).collect();

        assert_eq!(fast_view, (0..20).collect::<Vec<u64>>());
        assert_eq!(fast_view, slow_view);
    }

    #[test]
    fn test_concurrent_producer_consumer() {
        let ring = Arc::new(RingBuffer::<u64>::with_capacity(2048).unwrap());
        let events = 1000u64;

        let consumer_ring = Arc::clone(&ring);
        let consumer = thread::spawn(move || {
            let mut cursor = RingConsumer::new(consumer_ring);
            let mut seen = Vec::with_capacity(events as usize);
            while seen.len() < events as usize {
                match cursor.try_next() {
                    Some(value) => seen.push(value),
                    None => std::hint::spin_loop(),
                }
            }
            (seen, cursor.sequence())
        });

        for value in 0..events {
            let seq = ring.next();
            ring.write(seq, value);
            ring.publish(seq);
        }

        let (seen, last_sequence) = consumer.join().unwrap();
        assert_eq!(seen, (0..events).collect::<Vec<u64>>());
        assert_eq!(last_sequence, events as i64 - 1);
    }
}
