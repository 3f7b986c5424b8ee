//! CLI argument definitions using Clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::domain::config::AppConfig;
use crate::domain::output::OutputFormat;

/// Field Recorder - capture audio from an input device to a file
#[derive(Parser, Debug)]
#[command(name = "field-recorder")]
#[command(version)]
#[command(about = "Record audio from an input device to WAV, FLAC, or AAC")]
#[command(long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record until Ctrl+C, SIGTERM, or the optional duration
    Record(RecordArgs),
    /// List input devices
    Devices {
        /// Print the device list as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Options of the `record` subcommand
#[derive(Args, Debug, Default, Clone)]
pub struct RecordArgs {
    /// Output file (default: recording_YYYYMMDD_HHMMSS.<ext> in output_dir)
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Output format (default: from the file extension, else config)
    #[arg(short = 'f', long, value_name = "FORMAT")]
    pub format: Option<FormatArg>,

    /// Sample rate in Hz
    #[arg(short = 'r', long, value_name = "HZ")]
    pub sample_rate: Option<u32>,

    /// Number of channels
    #[arg(short = 'c', long, value_name = "N")]
    pub channels: Option<u16>,

    /// Frames per callback block
    #[arg(short = 'b', long, value_name = "FRAMES")]
    pub block_size: Option<u32>,

    /// Input device index (see `field-recorder devices`)
    #[arg(short = 'D', long, value_name = "INDEX")]
    pub device: Option<usize>,

    /// Stop automatically after this long (e.g., 10s, 1m, 2m30s)
    #[arg(short = 'd', long, value_name = "TIME")]
    pub duration: Option<String>,

    /// AAC bitrate passed to ffmpeg (e.g., 128k)
    #[arg(long, value_name = "RATE")]
    pub bitrate: Option<String>,
}

impl RecordArgs {
    /// Overrides contributed by the command line, for merging over the file
    pub fn to_config(&self) -> AppConfig {
        AppConfig {
            sample_rate: self.sample_rate,
            channels: self.channels,
            block_size: self.block_size,
            device: self.device,
            // With -o the extension picks the format unless -f is given
            format: self.format.map(|f| OutputFormat::from(f).to_string()),
            bitrate: self.bitrate.clone(),
            ..Default::default()
        }
    }
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Format argument for clap ValueEnum
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Wav,
    Flac,
    Aac,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Wav => OutputFormat::Wav,
            FormatArg::Flac => OutputFormat::Flac,
            FormatArg::Aac => OutputFormat::Aac,
        }
    }
}

/// Valid config keys
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "sample_rate",
    "channels",
    "block_size",
    "device",
    "format",
    "bitrate",
    "output_dir",
    "queue_capacity",
    "drain_timeout",
    "encode_timeout",
];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn record_args(argv: &[&str]) -> RecordArgs {
        match Cli::parse_from(argv).command {
            Commands::Record(args) => args,
            other => panic!("Expected record command, got {:?}", other),
        }
    }

    #[test]
    fn record_parses_defaults() {
        let args = record_args(&["field-recorder", "record"]);
        assert!(args.output.is_none());
        assert!(args.format.is_none());
        assert!(args.sample_rate.is_none());
        assert!(args.channels.is_none());
        assert!(args.device.is_none());
        assert!(args.duration.is_none());
    }

    #[test]
    fn record_parses_short_flags() {
        let args = record_args(&[
            "field-recorder",
            "record",
            "-o",
            "take.flac",
            "-f",
            "wav",
            "-r",
            "44100",
            "-c",
            "1",
            "-b",
            "512",
            "-D",
            "3",
            "-d",
            "30s",
        ]);
        assert_eq!(args.output, Some(PathBuf::from("take.flac")));
        assert_eq!(args.format, Some(FormatArg::Wav));
        assert_eq!(args.sample_rate, Some(44_100));
        assert_eq!(args.channels, Some(1));
        assert_eq!(args.block_size, Some(512));
        assert_eq!(args.device, Some(3));
        assert_eq!(args.duration, Some("30s".to_string()));
    }

    #[test]
    fn record_args_become_config_overrides() {
        let args = record_args(&["field-recorder", "record", "-f", "flac", "-c", "1"]);
        let config = args.to_config();
        assert_eq!(config.format, Some("flac".to_string()));
        assert_eq!(config.channels, Some(1));
        assert!(config.sample_rate.is_none());
        assert!(config.output_dir.is_none());
    }

    #[test]
    fn devices_parses_json_flag() {
        let cli = Cli::parse_from(["field-recorder", "devices", "--json"]);
        assert!(matches!(cli.command, Commands::Devices { json: true }));
    }

    #[test]
    fn cli_parses_config_init() {
        let cli = Cli::parse_from(["field-recorder", "config", "init"]);
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Init
            }
        ));
    }

    #[test]
    fn cli_parses_config_set() {
        let cli = Cli::parse_from(["field-recorder", "config", "set", "format", "flac"]);
        if let Commands::Config {
            action: ConfigAction::Set { key, value },
        } = cli.command
        {
            assert_eq!(key, "format");
            assert_eq!(value, "flac");
        } else {
            panic!("Expected Config Set command");
        }
    }

    #[test]
    fn rejects_unknown_format() {
        assert!(Cli::try_parse_from(["field-recorder", "record", "-f", "ogg"]).is_err());
    }

    #[test]
    fn format_arg_converts_to_output_format() {
        assert_eq!(OutputFormat::from(FormatArg::Wav), OutputFormat::Wav);
        assert_eq!(OutputFormat::from(FormatArg::Aac), OutputFormat::Aac);
    }

    #[test]
    fn valid_config_keys() {
        assert!(is_valid_config_key("sample_rate"));
        assert!(is_valid_config_key("drain_timeout"));
        assert!(!is_valid_config_key("volume"));
    }

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }
}
