//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod capture;
pub mod config;
pub mod encoder;

// Re-export common types
pub use capture::{
    select_device, AudioCallback, BackendError, CallbackStatus, CaptureBackend, CaptureStream,
    StreamErrorCallback,
};
pub use config::ConfigStore;
pub use encoder::{AudioEncoder, EncodeError};
