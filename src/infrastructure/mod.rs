//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces,
//! integrating with external systems like cpal, ffmpeg, and the filesystem.

pub mod capture;
pub mod config;
pub mod encoding;

// Re-export adapters
pub use capture::CpalBackend;
pub use config::XdgConfigStore;
pub use encoding::{create_writer, default_writer, FfmpegEncoder, FlacEncoder, WavEncoder};
