//! Encoder port interface

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

use crate::domain::output::{OutputFormat, PcmAudio};
use crate::domain::recording::Duration;

/// Encoding errors
#[derive(Debug, Clone, Error)]
pub enum EncodeError {
    #[error("Encoder unavailable: {0}")]
    Unavailable(String),

    #[error("Encoding failed: {0}")]
    Failed(String),

    #[error("Encoder did not finish within {0}")]
    Timeout(Duration),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for EncodeError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Port for writing captured audio to a container
#[async_trait]
pub trait AudioEncoder: Send + Sync {
    /// The container this encoder produces
    fn format(&self) -> OutputFormat;

    /// Encode `pcm` into `dest`, replacing any existing file.
    ///
    /// A failed call may leave a partial file at `dest`; callers own
    /// cleanup.
    async fn encode(&self, pcm: &PcmAudio, dest: &Path) -> Result<(), EncodeError>;
}
