//! Application configuration value object

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::device::{
    CaptureRequest, DEFAULT_BLOCK_SIZE, DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE,
};
use crate::domain::output::OutputFormat;
use crate::domain::recording::Duration;

/// Default capture queue capacity, in blocks
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Default AAC bitrate handed to ffmpeg
pub const DEFAULT_BITRATE: &str = "192k";

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub block_size: Option<u32>,
    pub device: Option<usize>,
    pub format: Option<String>,
    pub bitrate: Option<String>,
    pub output_dir: Option<String>,
    pub queue_capacity: Option<usize>,
    pub drain_timeout: Option<String>,
    pub encode_timeout: Option<String>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        Self {
            sample_rate: Some(DEFAULT_SAMPLE_RATE),
            channels: Some(DEFAULT_CHANNELS),
            block_size: Some(DEFAULT_BLOCK_SIZE),
            device: None,
            format: Some(OutputFormat::default().to_string()),
            bitrate: Some(DEFAULT_BITRATE.to_string()),
            output_dir: None,
            queue_capacity: Some(DEFAULT_QUEUE_CAPACITY),
            drain_timeout: Some(Duration::default_drain_timeout().to_string()),
            encode_timeout: Some(Duration::default_encode_timeout().to_string()),
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            sample_rate: other.sample_rate.or(self.sample_rate),
            channels: other.channels.or(self.channels),
            block_size: other.block_size.or(self.block_size),
            device: other.device.or(self.device),
            format: other.format.or(self.format),
            bitrate: other.bitrate.or(self.bitrate),
            output_dir: other.output_dir.or(self.output_dir),
            queue_capacity: other.queue_capacity.or(self.queue_capacity),
            drain_timeout: other.drain_timeout.or(self.drain_timeout),
            encode_timeout: other.encode_timeout.or(self.encode_timeout),
        }
    }

    /// Build the capture request described by this config
    pub fn capture_request(&self) -> CaptureRequest {
        CaptureRequest {
            device: self.device,
            sample_rate: self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE),
            channel_count: self.channels.unwrap_or(DEFAULT_CHANNELS),
            block_size: self.block_size.unwrap_or(DEFAULT_BLOCK_SIZE),
        }
    }

    /// Get format as parsed OutputFormat, or default if not set/invalid
    pub fn format_or_default(&self) -> OutputFormat {
        self.format
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    /// Get bitrate, or 192k if not set
    pub fn bitrate_or_default(&self) -> &str {
        self.bitrate.as_deref().unwrap_or(DEFAULT_BITRATE)
    }

    /// Get output directory, or the current directory if not set
    pub fn output_dir_or_default(&self) -> PathBuf {
        self.output_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Get queue capacity, never zero
    pub fn queue_capacity_or_default(&self) -> usize {
        self.queue_capacity
            .filter(|&c| c > 0)
            .unwrap_or(DEFAULT_QUEUE_CAPACITY)
    }

    /// Get drain_timeout as parsed Duration, or default if not set/invalid
    pub fn drain_timeout_or_default(&self) -> Duration {
        self.drain_timeout
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(Duration::default_drain_timeout)
    }

    /// Get encode_timeout as parsed Duration, or default if not set/invalid
    pub fn encode_timeout_or_default(&self) -> Duration {
        self.encode_timeout
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(Duration::default_encode_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_expected_values() {
        let config = AppConfig::defaults();
        assert_eq!(config.sample_rate, Some(48_000));
        assert_eq!(config.channels, Some(2));
        assert_eq!(config.block_size, Some(1024));
        assert_eq!(config.format, Some("aac".to_string()));
        assert_eq!(config.bitrate, Some("192k".to_string()));
        assert_eq!(config.queue_capacity, Some(256));
        assert_eq!(config.drain_timeout, Some("2s".to_string()));
        assert_eq!(config.encode_timeout, Some("1m".to_string()));
        assert!(config.device.is_none());
    }

    #[test]
    fn empty_has_all_none() {
        let config = AppConfig::empty();
        assert!(config.sample_rate.is_none());
        assert!(config.format.is_none());
        assert!(config.drain_timeout.is_none());
        assert!(config.output_dir.is_none());
    }

    #[test]
    fn merge_other_takes_precedence() {
        let base = AppConfig {
            sample_rate: Some(44_100),
            channels: Some(2),
            format: Some("wav".to_string()),
            ..Default::default()
        };

        let other = AppConfig {
            sample_rate: Some(96_000),
            channels: None, // Should not override
            format: Some("flac".to_string()),
            ..Default::default()
        };

        let merged = base.merge(other);

        assert_eq!(merged.sample_rate, Some(96_000));
        assert_eq!(merged.channels, Some(2));
        assert_eq!(merged.format, Some("flac".to_string()));
    }

    #[test]
    fn capture_request_uses_defaults_for_missing_fields() {
        let config = AppConfig {
            channels: Some(1),
            device: Some(4),
            ..Default::default()
        };
        let request = config.capture_request();
        assert_eq!(request.device, Some(4));
        assert_eq!(request.sample_rate, 48_000);
        assert_eq!(request.channel_count, 1);
        assert_eq!(request.block_size, 1024);
    }

    #[test]
    fn format_or_default_uses_default_on_invalid() {
        let config = AppConfig {
            format: Some("ogg".to_string()),
            ..Default::default()
        };
        assert_eq!(config.format_or_default(), OutputFormat::Aac);
    }

    #[test]
    fn drain_timeout_parses() {
        let config = AppConfig {
            drain_timeout: Some("5s".to_string()),
            ..Default::default()
        };
        assert_eq!(config.drain_timeout_or_default().as_secs(), 5);
    }

    #[test]
    fn drain_timeout_uses_default_on_invalid() {
        let config = AppConfig {
            drain_timeout: Some("soon".to_string()),
            ..Default::default()
        };
        assert_eq!(config.drain_timeout_or_default().as_secs(), 2);
    }

    #[test]
    fn queue_capacity_rejects_zero() {
        let config = AppConfig {
            queue_capacity: Some(0),
            ..Default::default()
        };
        assert_eq!(config.queue_capacity_or_default(), DEFAULT_QUEUE_CAPACITY);
    }

    #[test]
    fn output_dir_defaults_to_cwd() {
        assert_eq!(AppConfig::empty().output_dir_or_default(), PathBuf::from("."));
    }
}
