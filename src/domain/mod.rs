//! Domain layer - Core recording model
//!
//! Contains value objects, the session state machine, device negotiation,
//! and domain errors. This layer has no dependencies on audio hosts or
//! the filesystem.

pub mod config;
pub mod device;
pub mod error;
pub mod output;
pub mod recording;

// Re-export common types
pub use config::AppConfig;
pub use device::{
    negotiate, Adjustment, CaptureConfig, CaptureRequest, DeviceDescriptor, Negotiation,
    SampleRateRange,
};
pub use error::*;
pub use output::{Notice, OutputArtifact, OutputFormat, OutputTarget, PcmAudio};
pub use recording::{Duration, LevelMeter, Progress, SampleBlock, SessionState};
