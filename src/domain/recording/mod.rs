//! Recording domain module

mod duration;
mod progress;
mod sample_block;
mod session;

pub use duration::{Duration, DEFAULT_DRAIN_TIMEOUT_MS, DEFAULT_ENCODE_TIMEOUT_MS};
pub use progress::{LevelMeter, Progress};
pub use sample_block::SampleBlock;
pub use session::{InvalidStateTransition, RecordingSession, SessionState};
