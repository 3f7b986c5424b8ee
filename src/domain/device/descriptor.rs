//! Capture device snapshot

use serde::Serialize;

/// Inclusive range of sample rates a device accepts at one channel count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SampleRateRange {
    pub channels: u16,
    pub min: u32,
    pub max: u32,
}

impl SampleRateRange {
    pub const fn new(channels: u16, min: u32, max: u32) -> Self {
        Self { channels, min, max }
    }

    pub const fn contains(&self, rate: u32) -> bool {
        self.min <= rate && rate <= self.max
    }
}

/// Immutable snapshot of a capture endpoint, taken at enumeration time.
///
/// Hardware can change between sessions, so descriptors are re-queried for
/// every start and never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceDescriptor {
    pub index: usize,
    pub name: String,
    pub max_input_channels: u16,
    pub default_sample_rate: u32,
    pub supported_sample_rates: Vec<SampleRateRange>,
    pub is_default: bool,
}

impl DeviceDescriptor {
    /// Whether the device can capture `channels` at `rate`.
    ///
    /// With no advertised ranges only the default rate is trusted.
    pub fn supports(&self, rate: u32, channels: u16) -> bool {
        if channels == 0 || channels > self.max_input_channels {
            return false;
        }
        if self.supported_sample_rates.is_empty() {
            return rate == self.default_sample_rate;
        }
        self.supported_sample_rates
            .iter()
            .any(|r| r.channels == channels && r.contains(rate))
    }

    /// Channel count offered at `rate` closest to `wanted`, preferring fewer.
    /// `None` if no advertised range covers `rate`.
    pub fn channels_at(&self, rate: u32, wanted: u16) -> Option<u16> {
        let offered = || {
            self.supported_sample_rates
                .iter()
                .filter(move |r| r.contains(rate) && r.channels <= self.max_input_channels)
                .map(|r| r.channels)
        };
        offered()
            .filter(|&c| c <= wanted)
            .max()
            .or_else(|| offered().min())
    }

    /// Devices with no input channels cannot record
    pub fn is_input(&self) -> bool {
        self.max_input_channels > 0
    }
}
