//! Property-based tests for the lock-free queue and ring semantics
//!
//! These drive randomized operation sequences against reference models to
//! pin down the FIFO and no-mutation-on-failure contracts.

use event_engine::{MpscQueue, RingBuffer, RingConsumer, SpscQueue};
use proptest::prelude::*;
use std::collections::VecDeque;
use std::sync::Arc;

proptest! {
    /// Pushing any batch that fits, then draining, returns the batch unchanged.
    #[test]
    fn fuzz_spsc_drain_matches_input(values in prop::collection::vec(any::<u64>(), 0..512)) {
        let queue = SpscQueue::<u64>::with_capacity(512).unwrap();

        for &value in &values {
            prop_assert!(queue.try_push(value));
        }

        let mut drained = Vec::with_capacity(values.len());
        while let Some(value) = queue.try_pop() {
            drained.push(value);
        }

        prop_assert_eq!(drained, values);
        prop_assert!(queue.is_empty());
    }

    /// An interleaved push/pop sequence agrees with a VecDeque model, including
    /// rejected pushes on a full queue and empty pops leaving state untouched.
    #[test]
    fn fuzz_spsc_agrees_with_model(ops in prop::collection::vec(any::<Option<u64>>(), 0..256)) {
        let queue = SpscQueue::<u64>::with_capacity(16).unwrap();
        let mut model: VecDeque<u64> = VecDeque::new();

        for op in ops {
            match op {
                Some(value) => {
                    let pushed = queue.try_push(value);
                    if model.len() < 16 {
                        prop_assert!(pushed);
                        model.push_back(value);
                    } else {
                        prop_assert!(!pushed);
                    }
                }
                None => {
                    prop_assert_eq!(queue.try_pop(), model.pop_front());
                }
            }
            prop_assert_eq!(queue.len(), model.len());
        }
    }

    /// Single-threaded MPSC behaves exactly like the SPSC contract.
    #[test]
    fn fuzz_mpsc_agrees_with_model(ops in prop::collection::vec(any::<Option<u64>>(), 0..256)) {
        let queue = MpscQueue::<u64>::with_capacity(16).unwrap();
        let mut model: VecDeque<u64> = VecDeque::new();

        for op in ops {
            match op {
                Some(value) => {
                    let pushed = queue.try_push(value);
                    if model.len() < 16 {
                        prop_assert!(pushed);
                        model.push_back(value);
                    } else {
                        prop_assert!(!pushed);
                    }
                }
                None => {
                    prop_assert_eq!(queue.try_pop(), model.pop_front());
                }
            }
        }
    }

    /// A consumer keeping pace sees exactly the published values in order, for
    /// any batch up to the ring capacity.
    #[test]
    fn fuzz_ring_preserves_publish_order(values in prop::collection::vec(any::<u64>(), 0..1024)) {
        let ring = Arc::new(RingBuffer::<u64>::with_capacity(1024).unwrap());
        let mut consumer = RingConsumer::new(Arc::clone(&ring));

        for &value in &values {
            let sequence = ring.next();
            ring.write(sequence, value);
            ring.publish(sequence);
        }

        let seen: Vec<u64> = std::iter::from_fn(|| consumer.try_next()).collect();
        prop_assert_eq!(consumer.sequence(), values.len() as i64 - 1);
        prop_assert_eq!(seen, values);
    }
}
