//! Device capability negotiation
//!
//! Resolves a requested capture format against a device snapshot. The
//! channel count is clamped to what the device exposes, then the sample rate
//! is checked for that channel count and falls back to the device default.
//! If the default rate is not offered at that channel count either, the
//! nearest channel count the device offers there is used. Only a device
//! with no input channels at all is rejected.

use std::fmt;

use super::DeviceDescriptor;
use crate::domain::error::DeviceIncompatible;

/// Default frames per callback block
pub const DEFAULT_BLOCK_SIZE: u32 = 1024;

/// Default requested sample rate (Hz)
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Default requested channel count (stereo)
pub const DEFAULT_CHANNELS: u16 = 2;

/// What the caller asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRequest {
    /// Device index from enumeration, `None` for the host default
    pub device: Option<usize>,
    pub sample_rate: u32,
    pub channel_count: u16,
    pub block_size: u32,
}

impl Default for CaptureRequest {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: DEFAULT_SAMPLE_RATE,
            channel_count: DEFAULT_CHANNELS,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

/// Stream parameters confirmed against a device.
///
/// Only [`negotiate`] builds one, so holding a `CaptureConfig` means the
/// device was checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConfig {
    sample_rate: u32,
    channel_count: u16,
    block_size: u32,
}

impl CaptureConfig {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Samples in one full block across all channels
    pub fn samples_per_block(&self) -> usize {
        self.block_size as usize * self.channel_count as usize
    }
}

/// A silent fix-up applied while negotiating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    SampleRateFallback { requested: u32, used: u32 },
    ChannelsClamped { requested: u16, used: u16 },
}

impl fmt::Display for Adjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SampleRateFallback { requested, used } => write!(
                f,
                "Device doesn't support {} Hz, using {} Hz instead",
                requested, used
            ),
            Self::ChannelsClamped { requested, used } => write!(
                f,
                "Device supports max {} channel(s), requested {}",
                used, requested
            ),
        }
    }
}

/// Outcome of a successful negotiation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negotiation {
    pub config: CaptureConfig,
    pub device: DeviceDescriptor,
    pub adjustments: Vec<Adjustment>,
}

impl Negotiation {
    pub fn was_adjusted(&self) -> bool {
        !self.adjustments.is_empty()
    }
}

/// Resolve `request` against `device`.
pub fn negotiate(
    request: &CaptureRequest,
    device: &DeviceDescriptor,
) -> Result<Negotiation, DeviceIncompatible> {
    if !device.is_input() {
        return Err(DeviceIncompatible {
            device: device.name.clone(),
            reason: "device exposes no input channels".to_string(),
        });
    }

    let mut adjustments = Vec::new();

    let mut channel_count = request.channel_count.max(1).min(device.max_input_channels);

    let sample_rate = if device.supports(request.sample_rate, channel_count) {
        request.sample_rate
    } else {
        adjustments.push(Adjustment::SampleRateFallback {
            requested: request.sample_rate,
            used: device.default_sample_rate,
        });
        device.default_sample_rate
    };

    if !device.supports(sample_rate, channel_count) {
        if let Some(offered) = device.channels_at(sample_rate, channel_count) {
            channel_count = offered;
        }
    }
    if channel_count != request.channel_count {
        adjustments.push(Adjustment::ChannelsClamped {
            requested: request.channel_count,
            used: channel_count,
        });
    }

    let block_size = if request.block_size == 0 {
        DEFAULT_BLOCK_SIZE
    } else {
        request.block_size
    };

    Ok(Negotiation {
        config: CaptureConfig {
            sample_rate,
            channel_count,
            block_size,
        },
        device: device.clone(),
        adjustments,
    })
}
