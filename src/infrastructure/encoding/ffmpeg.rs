//! FFmpeg-based AAC encoder adapter
//!
//! Raw little-endian `f32` samples are piped into `ffmpeg` on stdin and
//! muxed into an MP4 (M4A) container.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::{timeout, Duration as TokioDuration};
use tracing::debug;

use crate::application::ports::{AudioEncoder, EncodeError};
use crate::domain::config::DEFAULT_BITRATE;
use crate::domain::output::{OutputFormat, PcmAudio};
use crate::domain::recording::Duration;

/// Program name looked up on `PATH`
const FFMPEG: &str = "ffmpeg";

/// Upper bound for the `ffmpeg -version` probe
const PROBE_TIMEOUT: TokioDuration = TokioDuration::from_secs(2);

/// AAC encoder delegating to an external `ffmpeg`
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    program: PathBuf,
    bitrate: String,
    timeout: Duration,
}

impl FfmpegEncoder {
    pub fn new(bitrate: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: PathBuf::from(FFMPEG),
            bitrate: bitrate.into(),
            timeout,
        }
    }

    /// Use a specific executable instead of `ffmpeg` from `PATH`
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Check that the executable runs at all
    pub async fn is_available(&self) -> bool {
        let probe = Command::new(&self.program)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();
        matches!(timeout(PROBE_TIMEOUT, probe).await, Ok(Ok(status)) if status.success())
    }

    /// Build FFmpeg args for encoding piped float PCM
    fn build_ffmpeg_args(&self, sample_rate: u32, channels: u16, dest: &Path) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            // Input: raw interleaved f32 on stdin
            "-f".to_string(),
            "f32le".to_string(),
            "-ar".to_string(),
            sample_rate.to_string(),
            "-ac".to_string(),
            channels.to_string(),
            "-i".to_string(),
            "pipe:0".to_string(),
            // Output: AAC in MP4, index at the front
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            self.bitrate.clone(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            // The temp file has no telling extension
            "-f".to_string(),
            "mp4".to_string(),
            "-y".to_string(),
            dest.to_string_lossy().to_string(),
        ]
    }

    async fn run(&self, pcm: &PcmAudio, dest: &Path) -> Result<(), EncodeError> {
        let args = self.build_ffmpeg_args(pcm.sample_rate(), pcm.channels(), dest);
        debug!("Running {} {}", self.program.display(), args.join(" "));

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    EncodeError::Unavailable(format!("{} not found", self.program.display()))
                } else {
                    EncodeError::Failed(e.to_string())
                }
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| EncodeError::Failed("ffmpeg stdin unavailable".to_string()))?;
        let bytes = pcm.to_f32le_bytes();

        // Feed stdin while collecting stderr so neither pipe fills up
        let feed = async move {
            let written = stdin.write_all(&bytes).await;
            drop(stdin);
            written
        };
        let (written, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EncodeError::Failed(format!(
                "ffmpeg exited with error: {}",
                stderr.lines().last().unwrap_or("unknown error")
            )));
        }
        // A clean exit after a broken pipe still means truncated input
        written.map_err(|e| EncodeError::Failed(format!("ffmpeg input: {}", e)))?;
        Ok(())
    }
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_BITRATE, Duration::default_encode_timeout())
    }
}

#[async_trait]
impl AudioEncoder for FfmpegEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Aac
    }

    async fn encode(&self, pcm: &PcmAudio, dest: &Path) -> Result<(), EncodeError> {
        // Dropping the future on timeout kills the child
        timeout(self.timeout.as_std(), self.run(pcm, dest))
            .await
            .map_err(|_| EncodeError::Timeout(self.timeout))?
    }
}
