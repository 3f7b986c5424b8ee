//! Output target value object

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};

use super::OutputFormat;

/// Where a recording will be written and in which format.
///
/// The extension always agrees with the format: a path whose extension names
/// a different (or no) format gets the right one appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    path: PathBuf,
    format: OutputFormat,
}

impl OutputTarget {
    /// Resolve a user supplied path.
    ///
    /// With no explicit format the extension decides, and unknown extensions
    /// fall back to WAV.
    pub fn from_path(path: impl Into<PathBuf>, explicit: Option<OutputFormat>) -> Self {
        let path = path.into();
        let detected = OutputFormat::from_extension(&path);
        let format = explicit.or(detected).unwrap_or(OutputFormat::Wav);

        let path = if detected == Some(format) {
            path
        } else {
            append_extension(&path, format.extension())
        };

        Self { path, format }
    }

    /// `recording_YYYYMMDD_HHMMSS.<ext>` inside `dir`
    pub fn timestamped<Tz: TimeZone>(dir: &Path, format: OutputFormat, now: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        let name = format!(
            "recording_{}.{}",
            now.format("%Y%m%d_%H%M%S"),
            format.extension()
        );
        Self {
            path: dir.join(name),
            format,
        }
    }

    /// Same location with the extension swapped for `format`
    pub fn with_format(&self, format: OutputFormat) -> Self {
        Self {
            path: self.path.with_extension(format.extension()),
            format,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }
}

fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}
