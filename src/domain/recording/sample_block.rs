//! Sample block value object

/// An immutable chunk of interleaved `f32` samples as delivered by one
/// callback invocation. Arrival order is the only timestamp.
///
/// A trailing partial frame is kept as-is; hosts never deliver one in
/// practice and truncating would silently lose data.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBlock {
    samples: Vec<f32>,
    channels: u16,
}

impl SampleBlock {
    /// Wrap a filled buffer without copying
    pub fn from_vec(samples: Vec<f32>, channels: u16) -> Self {
        Self {
            samples,
            channels: channels.max(1),
        }
    }

    /// Give the buffer back so its allocation can be reused
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of samples across all channels
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of frames (one sample per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Root-mean-square level over every sample in the block
    pub fn rms(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.samples.iter().map(|s| s * s).sum();
        (sum / self.samples.len() as f32).sqrt()
    }
}
