//! Output format value object

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::domain::error::InvalidFormatError;

/// All available output formats
pub const ALL_FORMATS: &[OutputFormat] = &[OutputFormat::Wav, OutputFormat::Flac, OutputFormat::Aac];

/// Container/codec of the persisted recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    /// 16-bit PCM RIFF/WAVE
    Wav,
    /// 16-bit lossless FLAC
    Flac,
    /// AAC in an MP4 (M4A) container, encoded by ffmpeg
    #[default]
    Aac,
}

impl OutputFormat {
    /// Get the string identifier for this format
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Flac => "flac",
            Self::Aac => "aac",
        }
    }

    /// Preferred file extension
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Flac => "flac",
            Self::Aac => "m4a",
        }
    }

    /// Human-readable description for summaries
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Wav => "16-bit PCM WAV",
            Self::Flac => "16-bit FLAC",
            Self::Aac => "AAC (M4A)",
        }
    }

    /// Whether the format keeps every quantized sample
    pub const fn is_lossless(&self) -> bool {
        matches!(self, Self::Wav | Self::Flac)
    }

    /// Detect the format from a file extension (case-insensitive)
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "wav" | "wave" => Some(Self::Wav),
            "flac" => Some(Self::Flac),
            "m4a" | "aac" | "mp4" => Some(Self::Aac),
            _ => None,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = InvalidFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "wav" | "wave" => Ok(Self::Wav),
            "flac" => Ok(Self::Flac),
            "aac" | "m4a" => Ok(Self::Aac),
            _ => Err(InvalidFormatError {
                input: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_names() {
        assert_eq!("wav".parse::<OutputFormat>().unwrap(), OutputFormat::Wav);
        assert_eq!("FLAC".parse::<OutputFormat>().unwrap(), OutputFormat::Flac);
        assert_eq!(" m4a ".parse::<OutputFormat>().unwrap(), OutputFormat::Aac);
        assert!("mp3".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn detect_from_extension() {
        assert_eq!(
            OutputFormat::from_extension(Path::new("take.M4A")),
            Some(OutputFormat::Aac)
        );
        assert_eq!(
            OutputFormat::from_extension(Path::new("take.aac")),
            Some(OutputFormat::Aac)
        );
        assert_eq!(
            OutputFormat::from_extension(Path::new("take.wav")),
            Some(OutputFormat::Wav)
        );
        assert_eq!(
            OutputFormat::from_extension(Path::new("take.flac")),
            Some(OutputFormat::Flac)
        );
        assert_eq!(OutputFormat::from_extension(Path::new("take.mp3")), None);
        assert_eq!(OutputFormat::from_extension(Path::new("take")), None);
    }

    #[test]
    fn extensions_and_losslessness() {
        assert_eq!(OutputFormat::Aac.extension(), "m4a");
        assert!(OutputFormat::Wav.is_lossless());
        assert!(OutputFormat::Flac.is_lossless());
        assert!(!OutputFormat::Aac.is_lossless());
    }

    #[test]
    fn all_formats_round_trip_through_str() {
        for format in ALL_FORMATS {
            assert_eq!(format.as_str().parse::<OutputFormat>().unwrap(), *format);
        }
    }
}
