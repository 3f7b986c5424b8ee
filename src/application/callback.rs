//! Real-time audio callback feeding the capture queue

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::capture_queue::BlockProducer;
use super::ports::{AudioCallback, CallbackStatus};

/// Copies each host buffer into a spare queue buffer and pushes it.
///
/// Host status flags are only counted here; they surface as a notice once
/// the session stops.
pub struct QueueingCallback {
    producer: BlockProducer,
    channels: u16,
    host_flags: Arc<AtomicU64>,
}

impl QueueingCallback {
    pub fn new(producer: BlockProducer, channels: u16, host_flags: Arc<AtomicU64>) -> Self {
        Self {
            producer,
            channels,
            host_flags,
        }
    }
}

impl AudioCallback for QueueingCallback {
    fn on_block(&mut self, samples: &[f32], status: CallbackStatus) {
        if status != CallbackStatus::Ok {
            self.host_flags.fetch_add(1, Ordering::Relaxed);
        }
        if samples.is_empty() {
            return;
        }
        self.producer.push_samples(samples, self.channels);
    }
}
