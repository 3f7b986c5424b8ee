//! Application layer - Use cases and port interfaces
//!
//! Contains the recording session, the real-time hand-off between the
//! audio callback and the consumption thread, the artifact writer, and the
//! trait definitions for audio hosts, encoders, and config storage.

pub mod callback;
pub mod capture_queue;
pub mod ports;
pub mod recorder;
pub mod writer;

// Re-export use cases
pub use callback::QueueingCallback;
pub use capture_queue::{
    capture_queue, pooled_capture_queue, BlockConsumer, BlockProducer, PushOutcome, QueueCloser,
    QueueStats,
};
pub use recorder::{Recorder, RecorderSettings, SessionHandle, StartError, StopError};
pub use writer::{ArtifactWriter, WriteError};
