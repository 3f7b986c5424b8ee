//! Artifact writer use case
//!
//! Turns the captured sample buffer into a file. Each encoder writes to a
//! temporary file next to the destination which is renamed into place only
//! on success, so a failed encode never leaves a partial file behind.
//! A non-WAV encode that fails falls back to WAV at the same location.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::output::{Notice, OutputArtifact, OutputFormat, OutputTarget, PcmAudio};

use super::ports::{AudioEncoder, EncodeError};

/// Errors from writing a recording
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("No {0} encoder available")]
    NoEncoder(OutputFormat),

    #[error("Failed to write {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: EncodeError,
    },
}

/// Writes captured audio through a set of format encoders
pub struct ArtifactWriter {
    encoders: Vec<Arc<dyn AudioEncoder>>,
}

impl ArtifactWriter {
    /// Create a writer. WAV should be among the encoders for fallback to
    /// work.
    pub fn new(encoders: Vec<Arc<dyn AudioEncoder>>) -> Self {
        Self { encoders }
    }

    fn encoder_for(&self, format: OutputFormat) -> Option<&Arc<dyn AudioEncoder>> {
        self.encoders.iter().find(|e| e.format() == format)
    }

    /// Encode `pcm` to `target`, attaching `notices` to the artifact.
    pub async fn write(
        &self,
        pcm: PcmAudio,
        target: &OutputTarget,
        mut notices: Vec<Notice>,
    ) -> Result<OutputArtifact, WriteError> {
        let requested = target.format();
        let attempt = match self.encoder_for(requested) {
            Some(encoder) => encode_atomically(encoder.as_ref(), &pcm, target.path()).await,
            None => Err(EncodeError::Unavailable(format!(
                "no {} encoder registered",
                requested
            ))),
        };

        let (written, size_bytes) = match attempt {
            Ok(size) => (target.clone(), size),
            Err(source) if requested == OutputFormat::Wav => {
                return Err(WriteError::Encode {
                    path: target.path().to_path_buf(),
                    source,
                });
            }
            Err(reason) => {
                let fallback = target.with_format(OutputFormat::Wav);
                warn!(
                    "{} encode failed ({}), falling back to {}",
                    requested,
                    reason,
                    fallback.path().display()
                );
                let wav = self
                    .encoder_for(OutputFormat::Wav)
                    .ok_or(WriteError::NoEncoder(OutputFormat::Wav))?;
                let size = encode_atomically(wav.as_ref(), &pcm, fallback.path())
                    .await
                    .map_err(|source| WriteError::Encode {
                        path: fallback.path().to_path_buf(),
                        source,
                    })?;
                notices.push(Notice::EncodeFallback {
                    from: requested,
                    to: OutputFormat::Wav,
                    reason: fallback_reason(&reason),
                });
                (fallback, size)
            }
        };

        info!(
            "Wrote {} ({} frames, {} bytes)",
            written.path().display(),
            pcm.frames(),
            size_bytes
        );

        Ok(OutputArtifact {
            path: written.path().to_path_buf(),
            format: written.format(),
            sample_rate: pcm.sample_rate(),
            channel_count: pcm.channels(),
            frames: pcm.frames(),
            size_bytes,
            notices,
        })
    }
}

fn fallback_reason(err: &EncodeError) -> String {
    match err {
        EncodeError::Unavailable(msg) | EncodeError::Failed(msg) | EncodeError::Io(msg) => {
            msg.clone()
        }
        EncodeError::Timeout(limit) => format!("timed out after {}", limit),
    }
}

/// Encode into a temp file beside `dest`, then rename over it.
/// Returns the final file size.
async fn encode_atomically(
    encoder: &dyn AudioEncoder,
    pcm: &PcmAudio,
    dest: &Path,
) -> Result<u64, EncodeError> {
    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    tokio::fs::create_dir_all(&dir).await?;

    // Removed on drop unless persisted
    let temp = tempfile::Builder::new()
        .prefix(".field-recorder-")
        .suffix(".partial")
        .tempfile_in(&dir)?
        .into_temp_path();
    debug!("Encoding {} via {}", encoder.format(), temp.display());

    encoder.encode(pcm, &temp).await?;
    temp.persist(dest).map_err(|e| EncodeError::Io(e.error.to_string()))?;

    let size = tokio::fs::metadata(dest).await?.len();
    Ok(size)
}
