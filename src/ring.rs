//! Fixed-capacity single-producer/single-consumer queues carrying events across the realtime
//! boundary.
//!
//! The record path moves decoded input from the MIDI input callback to the application, and the
//! play path moves scheduled events from the application to the output callback.
//! Each queue is split into a [`Producer`](struct.Producer.html) and a
//! [`Consumer`](struct.Consumer.html) half, so that there can only ever be one of each.
//! Neither half blocks or allocates after construction.

use crate::{event::RawMidiEvent, prelude::*};
use alloc::sync::Arc;
use core::{
    marker::PhantomData,
    sync::atomic::{AtomicU64, Ordering},
};
use ringbuf::{
    traits::{Consumer as _, Observer as _, Producer as _, Split as _},
    HeapCons, HeapProd, HeapRb,
};

/// Capacity of the record queue, in events.
pub const RECORD_CAPACITY: usize = 1024 * 100;

/// Capacity of the play queue, in events.
pub const PLAY_CAPACITY: usize = 256;

/// Constructor for split ring buffers.
pub struct RingBuffer<T> {
    _marker: PhantomData<T>,
}
impl<T> RingBuffer<T> {
    /// Allocate a queue that holds up to `capacity` items (at least one) and split it into its
    /// two halves.
    pub fn new(capacity: usize) -> (Producer<T>, Consumer<T>) {
        let (prod, cons) = HeapRb::new(capacity.max(1)).split();
        let overflow = Arc::new(AtomicU64::new(0));
        (
            Producer {
                inner: prod,
                overflow: overflow.clone(),
            },
            Consumer {
                inner: cons,
                overflow,
            },
        )
    }
}

/// The queue from the MIDI input callback to the recorder.
pub fn record_buffer() -> (Producer<RawMidiEvent>, Consumer<RawMidiEvent>) {
    RingBuffer::new(RECORD_CAPACITY)
}

/// The queue from the sequencer to the MIDI output callback.
pub fn play_buffer() -> (Producer<RawMidiEvent>, Consumer<RawMidiEvent>) {
    RingBuffer::new(PLAY_CAPACITY)
}

/// The writing half of a queue.
pub struct Producer<T> {
    inner: HeapProd<T>,
    overflow: Arc<AtomicU64>,
}
impl<T> Producer<T> {
    /// Append an item, never blocking.
    ///
    /// If the queue is full the item is dropped, the overflow counter is bumped and `false` is
    /// returned; items already queued are never overwritten.
    #[inline]
    pub fn try_push(&mut self, item: T) -> bool {
        match self.inner.try_push(item) {
            Ok(()) => true,
            Err(_dropped) => {
                self.overflow.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Number of items currently queued.
    #[inline]
    pub fn count(&self) -> usize {
        self.inner.occupied_len()
    }

    /// Number of items that can be pushed before the queue is full.
    #[inline]
    pub fn free(&self) -> usize {
        self.inner.vacant_len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.capacity().get()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    /// Total items dropped because the queue was full.
    #[inline]
    pub fn overflow_count(&self) -> u64 {
        self.overflow.load(Ordering::Relaxed)
    }
}
impl<T> fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Producer")
            .field("count", &self.count())
            .field("capacity", &self.capacity())
            .field("overflow", &self.overflow_count())
            .finish()
    }
}

/// The reading half of a queue.
pub struct Consumer<T> {
    inner: HeapCons<T>,
    overflow: Arc<AtomicU64>,
}
impl<T> Consumer<T> {
    /// Take the oldest item, if any.
    #[inline]
    pub fn try_pop(&mut self) -> Option<T> {
        self.inner.try_pop()
    }

    /// Look at the oldest item without taking it.
    #[inline]
    pub fn peek(&self) -> Option<&T> {
        self.inner.try_peek()
    }

    /// Number of items currently queued.
    #[inline]
    pub fn count(&self) -> usize {
        self.inner.occupied_len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.capacity().get()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Total items dropped by the producer because the queue was full.
    #[inline]
    pub fn overflow_count(&self) -> u64 {
        self.overflow.load(Ordering::Relaxed)
    }

    /// Drop every queued item.
    pub fn clear(&mut self) {
        while self.inner.try_pop().is_some() {}
    }
}
impl Consumer<RawMidiEvent> {
    /// Take the oldest event if it is due at or before `deadline`.
    ///
    /// Meant to be called in a loop by the output callback with the end of the current cycle as
    /// deadline.
    #[inline]
    pub fn pop_due(&mut self, deadline: u64) -> Option<RawMidiEvent> {
        let due = matches!(self.peek(), Some(ev) if ev.timestamp() <= deadline);
        if due {
            self.try_pop()
        } else {
            None
        }
    }
}
impl<T> fmt::Debug for Consumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("count", &self.count())
            .field("capacity", &self.capacity())
            .field("overflow", &self.overflow_count())
            .finish()
    }
}
