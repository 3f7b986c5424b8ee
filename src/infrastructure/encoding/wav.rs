//! 16-bit PCM WAV encoder

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use hound::{SampleFormat, WavSpec, WavWriter};

use crate::application::ports::{AudioEncoder, EncodeError};
use crate::domain::output::{quantize, OutputFormat, PcmAudio};

/// Bits per sample written to the `fmt ` chunk
const BITS_PER_SAMPLE: u16 = 16;

/// Lossless WAV writer, also the fallback for every other format
#[derive(Debug, Default, Clone, Copy)]
pub struct WavEncoder;

impl WavEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Write `pcm` as a RIFF/WAVE file (blocking)
    pub fn write_file(pcm: &PcmAudio, dest: &Path) -> Result<(), EncodeError> {
        let spec = WavSpec {
            channels: pcm.channels(),
            sample_rate: pcm.sample_rate(),
            bits_per_sample: BITS_PER_SAMPLE,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(dest, spec).map_err(wav_error)?;
        for &sample in pcm.samples() {
            writer.write_sample(quantize(sample)).map_err(wav_error)?;
        }
        writer.finalize().map_err(wav_error)
    }
}

fn wav_error(e: hound::Error) -> EncodeError {
    match e {
        hound::Error::IoError(io) => EncodeError::Io(io.to_string()),
        other => EncodeError::Failed(other.to_string()),
    }
}

#[async_trait]
impl AudioEncoder for WavEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Wav
    }

    async fn encode(&self, pcm: &PcmAudio, dest: &Path) -> Result<(), EncodeError> {
        let pcm = pcm.clone();
        let dest: PathBuf = dest.to_path_buf();
        tokio::task::spawn_blocking(move || Self::write_file(&pcm, &dest))
            .await
            .map_err(|e| EncodeError::Failed(format!("WAV task error: {}", e)))?
    }
}
