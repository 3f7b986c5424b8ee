//! Finalized recording artifact

use std::fmt;
use std::path::PathBuf;
use std::time::Duration as StdDuration;

use super::OutputFormat;
use crate::domain::recording::Duration;

/// Non-fatal condition surfaced with the final result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The real-time callback dropped blocks because the queue was full
    BlocksDropped(u64),
    /// The audio host reported errors or xruns during capture
    StreamErrors(u64),
    /// The consumption thread missed the drain grace period; the recording
    /// may be missing its tail
    DrainTimeout { grace: Duration },
    /// The requested encoder was unavailable or failed
    EncodeFallback {
        from: OutputFormat,
        to: OutputFormat,
        reason: String,
    },
}

impl Notice {
    /// Whether the notice means audio may be missing from the file
    pub fn is_data_loss(&self) -> bool {
        matches!(
            self,
            Self::BlocksDropped(_) | Self::DrainTimeout { .. }
        )
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlocksDropped(n) => write!(f, "{} block(s) dropped under backpressure", n),
            Self::StreamErrors(n) => write!(f, "audio host reported {} stream error(s)", n),
            Self::DrainTimeout { grace } => write!(
                f,
                "recording thread did not finish within {}, draining may be incomplete",
                grace
            ),
            Self::EncodeFallback { from, to, reason } => {
                write!(f, "{} encoding unavailable ({}), saved as {}", from, reason, to)
            }
        }
    }
}

/// The persisted recording. Created once at stop time.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputArtifact {
    pub path: PathBuf,
    pub format: OutputFormat,
    pub sample_rate: u32,
    pub channel_count: u16,
    pub frames: u64,
    pub size_bytes: u64,
    pub notices: Vec<Notice>,
}

impl OutputArtifact {
    /// Audio duration derived from frame count
    pub fn duration(&self) -> StdDuration {
        if self.sample_rate == 0 {
            return StdDuration::ZERO;
        }
        StdDuration::from_secs_f64(self.frames as f64 / self.sample_rate as f64)
    }

    /// File size in mebibytes
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }

    /// Whether the encoder fell back to another format
    pub fn fell_back(&self) -> bool {
        self.notices
            .iter()
            .any(|n| matches!(n, Notice::EncodeFallback { .. }))
    }
}
