//! FLAC encoder
//!
//! Lossless, typically around half the size of the equivalent WAV.
//! Samples are quantized to 16-bit first, so a FLAC file decodes to exactly
//! the WAV that would have been written.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use flacenc::bitsink::ByteSink;
use flacenc::component::BitRepr;
use flacenc::config;
use flacenc::error::Verify;
use flacenc::source::MemSource;

use crate::application::ports::{AudioEncoder, EncodeError};
use crate::domain::output::{OutputFormat, PcmAudio};

/// Bits per sample (16-bit audio)
const BITS_PER_SAMPLE: usize = 16;

/// Encode interleaved PCM to FLAC bytes
pub fn encode_to_flac(pcm: &PcmAudio) -> Result<Vec<u8>, EncodeError> {
    // flacenc works on i32
    let samples: Vec<i32> = pcm.to_i16().into_iter().map(i32::from).collect();

    let config = config::Encoder::default()
        .into_verified()
        .map_err(|(_, e)| EncodeError::Failed(format!("FLAC config error: {:?}", e)))?;

    let source = MemSource::from_samples(
        &samples,
        pcm.channels() as usize,
        BITS_PER_SAMPLE,
        pcm.sample_rate() as usize,
    );

    let flac_stream = flacenc::encode_with_fixed_block_size(&config, source, config.block_size)
        .map_err(|e| EncodeError::Failed(format!("FLAC encoding failed: {:?}", e)))?;

    let mut sink = ByteSink::new();
    flac_stream
        .write(&mut sink)
        .map_err(|e| EncodeError::Failed(format!("FLAC write failed: {}", e)))?;

    Ok(sink.into_inner())
}

/// Lossless FLAC writer
#[derive(Debug, Default, Clone, Copy)]
pub struct FlacEncoder;

impl FlacEncoder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AudioEncoder for FlacEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Flac
    }

    async fn encode(&self, pcm: &PcmAudio, dest: &Path) -> Result<(), EncodeError> {
        let pcm = pcm.clone();
        let bytes = tokio::task::spawn_blocking(move || encode_to_flac(&pcm))
            .await
            .map_err(|e| EncodeError::Failed(format!("FLAC task error: {}", e)))??;
        let dest: PathBuf = dest.to_path_buf();
        tokio::fs::write(&dest, bytes).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_silence() {
        // 1 second of stereo silence at 48kHz
        let pcm = PcmAudio::new(vec![0.0; 96_000], 48_000, 2);
        let flac_data = encode_to_flac(&pcm).unwrap();

        assert!(flac_data.len() > 50);
        // FLAC magic number: "fLaC"
        assert_eq!(&flac_data[0..4], b"fLaC");
    }

    #[test]
    fn encode_short_audio() {
        // 100ms of mono silence at 16kHz
        let pcm = PcmAudio::new(vec![0.0; 1600], 16_000, 1);
        assert!(encode_to_flac(&pcm).is_ok());
    }

    #[test]
    fn encode_with_signal_compresses() {
        let rate = 44_100usize;
        let samples: Vec<f32> = (0..rate)
            .map(|i| {
                let t = i as f32 / rate as f32;
                0.5 * f32::sin(2.0 * std::f32::consts::PI * 440.0 * t)
            })
            .collect();
        let pcm = PcmAudio::new(samples, rate as u32, 1);

        let flac_data = encode_to_flac(&pcm).unwrap();
        // Smaller than raw 16-bit PCM
        assert!(flac_data.len() < rate * 2);
    }

    #[tokio::test]
    async fn encode_through_port() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("take.flac");
        let pcm = PcmAudio::new(vec![0.1; 4096], 48_000, 2);

        FlacEncoder::new().encode(&pcm, &path).await.unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[0..4], b"fLaC");
    }
}
