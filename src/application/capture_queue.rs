//! Bounded hand-off between the real-time callback and the consumption thread
//!
//! Single producer, single consumer, FIFO. The producer never blocks: a
//! full queue drops the incoming block and counts it. Once draining begins
//! the drop counter is frozen, and closing the queue stops new blocks from
//! being accepted while letting the consumer drain what is already buffered.
//!
//! Sample buffers cycle through a pool of spares: the producer fills a
//! spare, the consumer hands it back once the samples are stored. With the
//! pool preallocated, the callback path does not allocate.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, select, Receiver, Sender, TrySendError};
use parking_lot::Mutex;

use crate::domain::recording::SampleBlock;

/// High bit of the drop counter, set once draining begins
const DROPS_FROZEN: u64 = 1 << 63;

/// Spare buffers beyond the queue capacity: one held by the consumer, one
/// being filled by the producer
const SPARE_HEADROOM: usize = 2;

#[derive(Debug, Default)]
struct QueueShared {
    closed: AtomicBool,
    dropped: AtomicU64,
}

impl QueueShared {
    fn count_drop(&self) {
        let _ = self
            .dropped
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n & DROPS_FROZEN == 0).then_some(n + 1)
            });
    }

    fn freeze_drops(&self) {
        self.dropped.fetch_or(DROPS_FROZEN, Ordering::AcqRel);
    }

    fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Acquire) & !DROPS_FROZEN
    }
}

/// Result of a non-blocking push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    /// Queue was full or no spare buffer was free; the block was discarded
    /// and counted unless draining had begun
    Dropped,
    /// Queue is closed or the consumer is gone; the block was discarded
    Closed,
}

/// Producer half, owned by the audio callback
pub struct BlockProducer {
    blocks: Sender<SampleBlock>,
    spares: Receiver<Vec<f32>>,
    returns: Sender<Vec<f32>>,
    shared: Arc<QueueShared>,
}

impl BlockProducer {
    /// Enqueue without blocking. Lock-free; safe on the real-time thread.
    ///
    /// A rejected block's buffer goes back to the spare pool.
    pub fn push(&self, block: SampleBlock) -> PushOutcome {
        if self.shared.closed.load(Ordering::Acquire) {
            self.reuse(block);
            return PushOutcome::Closed;
        }
        match self.blocks.try_send(block) {
            Ok(()) => PushOutcome::Queued,
            Err(TrySendError::Full(block)) => {
                self.shared.count_drop();
                self.reuse(block);
                PushOutcome::Dropped
            }
            Err(TrySendError::Disconnected(block)) => {
                self.reuse(block);
                PushOutcome::Closed
            }
        }
    }

    /// Copy `samples` into a spare buffer and enqueue it.
    ///
    /// Allocates only when a host buffer outgrows the spare it lands in.
    pub fn push_samples(&self, samples: &[f32], channels: u16) -> PushOutcome {
        if self.shared.closed.load(Ordering::Acquire) {
            return PushOutcome::Closed;
        }
        let Ok(mut buffer) = self.spares.try_recv() else {
            self.shared.count_drop();
            return PushOutcome::Dropped;
        };
        buffer.clear();
        buffer.extend_from_slice(samples);
        self.push(SampleBlock::from_vec(buffer, channels))
    }

    fn reuse(&self, block: SampleBlock) {
        let _ = self.returns.try_send(block.into_samples());
    }
}

/// Consumer half, owned by the consumption thread
pub struct BlockConsumer {
    blocks: Receiver<SampleBlock>,
    shutdown: Receiver<()>,
    returns: Sender<Vec<f32>>,
}

impl BlockConsumer {
    /// Block until the next sample block is available.
    ///
    /// Returns `None` only once the queue is closed (or the producer is
    /// gone) and every buffered block has been handed out.
    pub fn pop_blocking(&self) -> Option<SampleBlock> {
        select! {
            recv(self.blocks) -> block => block.ok(),
            recv(self.shutdown) -> _ => self.blocks.try_recv().ok(),
        }
    }

    /// Take the next block if one is buffered
    pub fn try_pop(&self) -> Option<SampleBlock> {
        self.blocks.try_recv().ok()
    }

    /// Hand a consumed block's buffer back to the producer
    pub fn recycle(&self, block: SampleBlock) {
        let _ = self.returns.try_send(block.into_samples());
    }

    /// Blocks currently buffered
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Control-side handle that ends the stream of blocks
#[derive(Clone)]
pub struct QueueCloser {
    shutdown: Arc<Mutex<Option<Sender<()>>>>,
    shared: Arc<QueueShared>,
}

impl QueueCloser {
    /// Stop counting drops. Blocks are still accepted until [`close`].
    ///
    /// [`close`]: QueueCloser::close
    pub fn freeze_drops(&self) {
        self.shared.freeze_drops();
    }

    /// Close the queue. Idempotent.
    ///
    /// Later pushes are rejected without touching the drop counter, and a
    /// consumer waiting on an empty queue wakes up with `None`.
    pub fn close(&self) {
        self.shared.freeze_drops();
        self.shared.closed.store(true, Ordering::Release);
        self.shutdown.lock().take();
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Read-only counters
#[derive(Debug, Clone)]
pub struct QueueStats {
    shared: Arc<QueueShared>,
}

impl QueueStats {
    /// Blocks discarded while streaming. Never decreases.
    pub fn dropped(&self) -> u64 {
        self.shared.dropped()
    }
}

/// Create a queue holding at most `capacity` blocks (minimum 1).
///
/// Spare buffers start empty and grow to the first block they carry.
pub fn capture_queue(capacity: usize) -> (BlockProducer, BlockConsumer, QueueCloser) {
    pooled_capture_queue(capacity, 0)
}

/// Like [`capture_queue`], with every spare buffer preallocated for
/// `samples_per_block` samples
pub fn pooled_capture_queue(
    capacity: usize,
    samples_per_block: usize,
) -> (BlockProducer, BlockConsumer, QueueCloser) {
    let capacity = capacity.max(1);
    let spare_count = capacity + SPARE_HEADROOM;

    let (block_tx, block_rx) = bounded(capacity);
    let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
    let (spare_tx, spare_rx) = bounded(spare_count);
    for _ in 0..spare_count {
        let _ = spare_tx.try_send(Vec::with_capacity(samples_per_block));
    }
    let shared = Arc::new(QueueShared::default());

    let producer = BlockProducer {
        blocks: block_tx,
        spares: spare_rx,
        returns: spare_tx.clone(),
        shared: Arc::clone(&shared),
    };
    let consumer = BlockConsumer {
        blocks: block_rx,
        shutdown: shutdown_rx,
        returns: spare_tx,
    };
    let closer = QueueCloser {
        shutdown: Arc::new(Mutex::new(Some(shutdown_tx))),
        shared,
    };

    (producer, consumer, closer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn block(value: f32) -> SampleBlock {
        SampleBlock::from_vec(vec![value; 4], 1)
    }

    #[test]
    fn fifo_order() {
        let (producer, consumer, closer) = capture_queue(8);
        for i in 0..5 {
            assert_eq!(producer.push(block(i as f32)), PushOutcome::Queued);
        }
        closer.close();

        let mut seen = Vec::new();
        while let Some(b) = consumer.pop_blocking() {
            seen.push(b.samples()[0]);
        }
        assert_eq!(seen, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn full_queue_drops_and_counts() {
        let (producer, consumer, closer) = capture_queue(2);
        assert_eq!(producer.push(block(1.0)), PushOutcome::Queued);
        assert_eq!(producer.push(block(2.0)), PushOutcome::Queued);
        assert_eq!(producer.push(block(3.0)), PushOutcome::Dropped);
        assert_eq!(producer.push(block(4.0)), PushOutcome::Dropped);

        assert_eq!(closer.stats().dropped(), 2);

        // The oldest blocks survive
        assert_eq!(consumer.try_pop().unwrap().samples()[0], 1.0);
        assert_eq!(consumer.try_pop().unwrap().samples()[0], 2.0);
        assert!(consumer.try_pop().is_none());
    }

    #[test]
    fn drop_counter_frozen_after_close() {
        let (producer, _consumer, closer) = capture_queue(1);
        producer.push(block(0.0));
        producer.push(block(0.0));
        assert_eq!(closer.stats().dropped(), 1);

        closer.close();
        for _ in 0..10 {
            assert_eq!(producer.push(block(0.0)), PushOutcome::Closed);
        }
        assert_eq!(closer.stats().dropped(), 1);
    }

    #[test]
    fn frozen_counter_still_accepts_blocks() {
        let (producer, consumer, closer) = capture_queue(1);
        producer.push(block(1.0));
        producer.push(block(2.0));
        closer.freeze_drops();

        for _ in 0..50 {
            assert_eq!(producer.push(block(3.0)), PushOutcome::Dropped);
        }
        assert_eq!(closer.stats().dropped(), 1);

        // Room again: the block is queued, not rejected
        assert_eq!(consumer.try_pop().unwrap().samples()[0], 1.0);
        assert_eq!(producer.push(block(4.0)), PushOutcome::Queued);
        assert_eq!(consumer.try_pop().unwrap().samples()[0], 4.0);
        assert_eq!(closer.stats().dropped(), 1);
    }

    #[test]
    fn recycled_buffers_are_reused() {
        let (producer, consumer, _closer) = pooled_capture_queue(1, 16);

        // Three spares for a one-slot queue; the fourth block reuses the first
        let mut seen = Vec::new();
        for i in 0..4 {
            assert_eq!(producer.push_samples(&[i as f32; 8], 2), PushOutcome::Queued);
            let block = consumer.try_pop().unwrap();
            assert_eq!(block.frames(), 4);
            assert_eq!(block.samples()[0], i as f32);
            seen.push(block.samples().as_ptr());
            consumer.recycle(block);
        }
        assert_eq!(seen[3], seen[0]);
        assert_ne!(seen[1], seen[0]);
    }

    #[test]
    fn preallocated_spares_fit_a_block() {
        let (producer, consumer, _closer) = pooled_capture_queue(2, 64);
        producer.push_samples(&[0.5; 64], 2);
        let samples = consumer.try_pop().unwrap().into_samples();
        assert!(samples.capacity() >= 64);
    }

    #[test]
    fn exhausted_pool_counts_as_drop() {
        let (producer, consumer, closer) = capture_queue(1);
        let mut held = Vec::new();
        for _ in 0..3 {
            assert_eq!(producer.push_samples(&[0.1; 4], 1), PushOutcome::Queued);
            held.push(consumer.try_pop().unwrap());
        }

        assert_eq!(producer.push_samples(&[0.1; 4], 1), PushOutcome::Dropped);
        assert_eq!(closer.stats().dropped(), 1);

        consumer.recycle(held.pop().unwrap());
        assert_eq!(producer.push_samples(&[0.2; 4], 1), PushOutcome::Queued);
    }

    #[test]
    fn rejected_block_returns_its_buffer() {
        let (producer, consumer, closer) = capture_queue(1);
        // Queue holds one block, the full-queue rejects go back to the pool
        for _ in 0..10 {
            producer.push_samples(&[0.3; 4], 1);
        }
        assert_eq!(closer.stats().dropped(), 9);

        let block = consumer.try_pop().unwrap();
        consumer.recycle(block);
        assert_eq!(producer.push_samples(&[0.4; 4], 1), PushOutcome::Queued);
    }

    #[test]
    fn push_samples_after_close_is_closed() {
        let (producer, _consumer, closer) = capture_queue(2);
        closer.close();
        assert_eq!(producer.push_samples(&[0.0; 4], 1), PushOutcome::Closed);
        assert_eq!(closer.stats().dropped(), 0);
    }

    #[test]
    fn close_drains_buffered_blocks() {
        let (producer, consumer, closer) = capture_queue(8);
        for i in 0..3 {
            producer.push(block(i as f32));
        }
        closer.close();
        assert_eq!(consumer.len(), 3);

        assert!(consumer.pop_blocking().is_some());
        assert!(consumer.pop_blocking().is_some());
        assert!(consumer.pop_blocking().is_some());
        assert!(consumer.pop_blocking().is_none());
        assert!(consumer.pop_blocking().is_none());
    }

    #[test]
    fn close_is_idempotent() {
        let (_producer, consumer, closer) = capture_queue(4);
        closer.close();
        closer.close();
        assert!(consumer.pop_blocking().is_none());
    }

    #[test]
    fn close_wakes_waiting_consumer() {
        let (_producer, consumer, closer) = capture_queue(4);
        let waiter = thread::spawn(move || consumer.pop_blocking());

        thread::sleep(Duration::from_millis(20));
        closer.close();

        assert!(waiter.join().unwrap().is_none());
    }

    #[test]
    fn producer_drop_ends_consumer_after_drain() {
        let (producer, consumer, _closer) = capture_queue(4);
        producer.push(block(7.0));
        drop(producer);

        assert_eq!(consumer.pop_blocking().unwrap().samples()[0], 7.0);
        assert!(consumer.pop_blocking().is_none());
    }

    #[test]
    fn cross_thread_delivery_preserves_order() {
        let (producer, consumer, closer) = capture_queue(1024);
        let writer = thread::spawn(move || {
            for i in 0..500 {
                producer.push(block(i as f32));
            }
        });
        writer.join().unwrap();
        closer.close();

        let mut expected = 0.0;
        while let Some(b) = consumer.pop_blocking() {
            assert_eq!(b.samples()[0], expected);
            expected += 1.0;
        }
        assert_eq!(expected, 500.0);
    }
}
