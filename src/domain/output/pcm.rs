//! Captured PCM audio and 16-bit quantization

use std::sync::Arc;

/// Full-scale magnitude of a signed 16-bit sample
const I16_SCALE: f32 = 32767.0;

/// Quantize a float sample to 16-bit PCM.
///
/// Values are clamped to `[-1.0, 1.0]` first. NaN maps to silence.
pub fn quantize(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    (sample.clamp(-1.0, 1.0) * I16_SCALE).round() as i16
}

/// Inverse of [`quantize`]
pub fn dequantize(sample: i16) -> f32 {
    (sample as f32 / I16_SCALE).clamp(-1.0, 1.0)
}

/// The complete interleaved capture of one session, ready for encoding.
///
/// Cloning shares the sample buffer.
#[derive(Debug, Clone)]
pub struct PcmAudio {
    samples: Arc<[f32]>,
    sample_rate: u32,
    channels: u16,
}

impl PcmAudio {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
            channels: channels.max(1),
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Complete frames in the buffer
    pub fn frames(&self) -> u64 {
        (self.samples.len() / self.channels as usize) as u64
    }

    /// Samples quantized to 16-bit, in interleaved order
    pub fn to_i16(&self) -> Vec<i16> {
        self.samples.iter().copied().map(quantize).collect()
    }

    /// Raw little-endian `f32` bytes, as piped to external encoders
    pub fn to_f32le_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.samples.len() * 4);
        for sample in self.samples.iter() {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        bytes
    }
}
