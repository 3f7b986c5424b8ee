//! Capture port interfaces
//!
//! The audio host sits behind [`CaptureBackend`]. The real-time boundary is
//! [`AudioCallback`]: implementations run on the host's audio thread and
//! must return in bounded time without blocking, locking, or I/O.

use thiserror::Error;

use crate::domain::device::{CaptureConfig, DeviceDescriptor};

/// Audio host errors
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("Audio host error: {0}")]
    Host(String),

    #[error("Input device {0} not found")]
    DeviceNotFound(usize),

    #[error("No default input device available")]
    NoDefaultDevice,

    #[error("Failed to open capture stream: {0}")]
    StreamOpen(String),

    #[error("Failed to start capture stream: {0}")]
    StreamPlay(String),
}

/// Condition flagged by the host alongside a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallbackStatus {
    #[default]
    Ok,
    /// Input overflowed before this block; samples were lost upstream
    Overflow,
    /// Host underran while producing this block
    Underflow,
}

/// Real-time producer contract.
///
/// Called once per available block for as long as the stream runs.
/// Must not block, wait on a lock, perform I/O, or grow unbounded memory.
/// Errors are recorded, never returned.
pub trait AudioCallback: Send + 'static {
    fn on_block(&mut self, samples: &[f32], status: CallbackStatus);
}

/// Receives asynchronous stream errors from the host
pub type StreamErrorCallback = Box<dyn FnMut(String) + Send + 'static>;

/// An open capture stream
pub trait CaptureStream: Send {
    /// Stop producing blocks. Once this returns the callback will not run
    /// again.
    fn stop(self: Box<Self>) -> Result<(), BackendError>;
}

/// Port for the audio host: enumeration and stream creation
pub trait CaptureBackend: Send + Sync {
    /// Enumerate input-capable devices. Always queries the host; results are
    /// a point-in-time snapshot.
    fn list_devices(&self) -> Result<Vec<DeviceDescriptor>, BackendError>;

    /// Open and start a stream on `device` with a negotiated config.
    fn open_stream(
        &self,
        device: &DeviceDescriptor,
        config: &CaptureConfig,
        callback: Box<dyn AudioCallback>,
        on_error: StreamErrorCallback,
    ) -> Result<Box<dyn CaptureStream>, BackendError>;
}

/// Pick the requested device, or the default one when `index` is `None`.
///
/// Without a flagged default the first device is used.
pub fn select_device(
    devices: &[DeviceDescriptor],
    index: Option<usize>,
) -> Result<DeviceDescriptor, BackendError> {
    match index {
        Some(i) => devices
            .iter()
            .find(|d| d.index == i)
            .cloned()
            .ok_or(BackendError::DeviceNotFound(i)),
        None => devices
            .iter()
            .find(|d| d.is_default)
            .or_else(|| devices.first())
            .cloned()
            .ok_or(BackendError::NoDefaultDevice),
    }
}
