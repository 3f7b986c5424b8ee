//! Encoding infrastructure module
//!
//! WAV (hound), FLAC (flacenc), and AAC (external ffmpeg) encoders.

mod ffmpeg;
mod flac;
mod wav;

use std::sync::Arc;

use crate::application::ports::AudioEncoder;
use crate::application::ArtifactWriter;
use crate::domain::recording::Duration;

pub use ffmpeg::FfmpegEncoder;
pub use flac::{encode_to_flac, FlacEncoder};
pub use wav::WavEncoder;

/// Create a writer with every supported encoder
pub fn create_writer(aac: FfmpegEncoder) -> ArtifactWriter {
    let encoders: Vec<Arc<dyn AudioEncoder>> = vec![
        Arc::new(WavEncoder::new()),
        Arc::new(FlacEncoder::new()),
        Arc::new(aac),
    ];
    ArtifactWriter::new(encoders)
}

/// Writer using `ffmpeg` from `PATH` at the given bitrate and timeout
pub fn default_writer(bitrate: &str, encode_timeout: Duration) -> ArtifactWriter {
    create_writer(FfmpegEncoder::new(bitrate, encode_timeout))
}
