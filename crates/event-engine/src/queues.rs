//! Bounded lock-free queues routing order intents to a single consumer
//!
//! Both shapes are fixed-capacity rings over plain value slots: no
//! allocation after construction, no blocking, failure is a return value.
//! `SpscQueue` is a Lamport ring for exactly one producer; `MpscQueue` lets
//! any number of producers race for slots through a CAS on the enqueue
//! index, with a per-slot sequence handing each written slot to the single
//! consumer. Per-producer FIFO order is preserved in both; the MPSC gives no
//! cross-producer order beyond arrival at the claim point.

use crate::error::EngineError;
use crossbeam::utils::CachePadded;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU64, Ordering};

#[repr(C, align(64))]
struct Slot<T> {
    value: UnsafeCell<T>,
}

/// Single-producer single-consumer bounded queue
pub struct SpscQueue<T> {
    slots: Box<[Slot<T>]>,
    mask: u64,
    /// Consumer-side read index
    head: CachePadded<AtomicU64>,
    /// Producer-side write index
    tail: CachePadded<AtomicU64>,
}

unsafe impl<T: Copy + Send> Send for SpscQueue<T> {}
unsafe impl<T: Copy + Send> Sync for SpscQueue<T> {}

impl<T: Copy + Default> SpscQueue<T> {
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
            head: CachePadded::new(AtomicU64::new(0)),
            tail: CachePadded::new(AtomicU64::new(0)),
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// False when full; the queue is left untouched.
    #[inline]
    pub fn try_push(&self, value: T) -> bool {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if tail.wrapping_sub(head) > self.mask {
            return false;
        }

        let slot = &self.slots[(tail & self.mask) as usize];
        unsafe {
            *slot.value.get() = value;
        }
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        true
    }

    /// None when empty; the queue is left untouched.
    #[inline]
    pub fn try_pop(&self) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if head == tail {
            return None;
        }

        let slot = &self.slots[(head & self.mask) as usize];
        let value = unsafe { *slot.value.get() };
        self.head.store(head.wrapping_add(1), Ordering::Release);
        Some(value)
    }

    #[inline]
    pub fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        tail.wrapping_sub(head) as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[repr(C, align(64))]
struct MpscSlot<T> {
    /// Slot handshake: equals the claim position when free, position + 1 when written
    sequence: AtomicU64,
    value: UnsafeCell<T>,
}

/// Multi-producer single-consumer bounded queue
pub struct MpscQueue<T> {
    slots: Box<[MpscSlot<T>]>,
    mask: u64,
    /// Enqueue position, claimed by producers via CAS
    tail: CachePadded<AtomicU64>,
    /// Dequeue position; single consumer only
    head: CachePadded<AtomicU64>,
}

unsafe impl<T: Copy + Send> Send for MpscQueue<T> {}
unsafe impl<T: Copy + Send> Sync for MpscQueue<T> {}

impl<T: Copy + Default> MpscQueue<T> {
    pub fn with_capacity(capacity: usize) -> Result<Self, EngineError> {
        if capacity == 0 || !capacity.is_power_of_two() {
            return Err(EngineError::CapacityNotPowerOfTwo(capacity));
        }

        let slots: Box<[MpscSlot<T>]> = (0..capacity)
            .map(|i| MpscSlot {
                sequence: AtomicU64::new(i as u64),
                value: UnsafeCell::new(T::default()),
            })
            .collect();

        Ok(Self {
            slots,
            mask: capacity as u64 - 1,
            tail: CachePadded::new(AtomicU64::new(0)),
            head: CachePadded::new(AtomicU64::new(0)),
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// False when full; the queue is left untouched. Safe to call from any
    /// number of producer threads concurrently.
    #[inline]
    pub fn try_push(&self, value: T) -> bool {
        let mut tail = self.tail.load(Ordering::Relaxed);
        loop {
            let slot = &self.slots[(tail & self.mask) as usize];
            let sequence = slot.sequence.load(Ordering::Acquire);
            let lag = sequence as i64 - tail as i64;

            if lag == 0 {
                match self.tail.compare_exchange_weak(
                    tail,
                    tail.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        unsafe {
                            *slot.value.get() = value;
                        }
                        slot.sequence.store(tail.wrapping_add(1), Ordering::Release);
                        return true;
                    }
                    Err(current) => tail = current,
                }
            } else if lag < 0 {
                // Consumer has not freed this slot yet
                return false;
            } else {
                tail = self.tail.load(Ordering::Relaxed);
            }
        }
    }

    /// None when empty. Single consumer only.
    #[inline]
    pub fn try_pop(&self) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);
        let slot = &self.slots[(head & self.mask) as usize];
        let sequence = slot.sequence.load(Ordering::Acquire);

        if (sequence as i64 - head.wrapping_add(1) as i64) < 0 {
            return None;
        }

        let value = unsafe { *slot.value.get() };
        // Free the slot for the producer one lap ahead
        slot.sequence
            .store(head.wrapping_add(self.mask).wrapping_add(1), Ordering::Release);
        self.head.store(head.wrapping_add(1), Ordering::Relaxed);
        Some(value)
    }

    #[inline]
    pub fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        tail.wrapping_sub(head) as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
