//! CLI presenter for output formatting

use std::time::Duration as StdDuration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::domain::device::DeviceDescriptor;
use crate::domain::output::OutputArtifact;
use crate::domain::recording::Progress;

/// Width of the level bar in characters
const LEVEL_BAR_WIDTH: usize = 10;

/// Presenter for CLI output formatting
pub struct Presenter {
    spinner: Option<ProgressBar>,
}

impl Presenter {
    /// Create a new presenter
    pub fn new() -> Self {
        Self { spinner: None }
    }

    /// Start a spinner with message
    pub fn start_spinner(&mut self, message: &str) {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(StdDuration::from_millis(80));
        self.spinner = Some(spinner);
    }

    /// Update spinner message
    pub fn update_spinner(&self, message: &str) {
        if let Some(ref spinner) = self.spinner {
            spinner.set_message(message.to_string());
        }
    }

    /// Mark spinner as success and finish
    pub fn spinner_success(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✓".green(), message));
        }
    }

    /// Mark spinner as failed and finish
    pub fn spinner_fail(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✗".red(), message));
        }
    }

    /// Print info message to stderr
    pub fn info(&self, message: &str) {
        self.eprint(format!("{} {}", "ℹ".cyan(), message));
    }

    /// Print success message to stderr
    pub fn success(&self, message: &str) {
        self.eprint(format!("{} {}", "✓".green(), message));
    }

    /// Print warning message to stderr
    pub fn warn(&self, message: &str) {
        self.eprint(format!("{} {}", "⚠".yellow(), message));
    }

    /// Print error message to stderr
    pub fn error(&self, message: &str) {
        self.eprint(format!("{} {}", "✗".red(), message));
    }

    /// Output text to stdout
    pub fn output(&self, text: &str) {
        println!("{}", text);
    }

    /// Print a key-value pair (for config list)
    pub fn key_value(&self, key: &str, value: &str) {
        println!("{}: {}", key.cyan(), value);
    }

    /// Keep stderr lines from tearing through an active spinner
    fn eprint(&self, line: String) {
        match self.spinner {
            Some(ref spinner) => spinner.suspend(|| eprintln!("{}", line)),
            None => eprintln!("{}", line),
        }
    }

    /// Spinner message for a running recording
    pub fn format_progress(&self, progress: &Progress, limit: Option<StdDuration>) -> String {
        let time = match limit {
            Some(limit) => format!("{} / {}", progress.elapsed_clock(), clock(limit)),
            None => progress.elapsed_clock(),
        };

        let mut line = format!(
            "Recording... {}  {} frames  {}",
            time,
            progress.frames,
            level_bar(progress.level)
        );
        if progress.drop_count > 0 {
            line.push_str(&format!(
                "  {}",
                format!("{} dropped", progress.drop_count).yellow()
            ));
        }
        line
    }

    /// Update recording progress
    pub fn update_recording_progress(&self, progress: &Progress, limit: Option<StdDuration>) {
        self.update_spinner(&self.format_progress(progress, limit));
    }

    /// Print the saved recording and any notices attached to it
    pub fn artifact_summary(&self, artifact: &OutputArtifact) {
        for notice in &artifact.notices {
            if notice.is_data_loss() {
                self.warn(&notice.to_string());
            } else {
                self.info(&notice.to_string());
            }
        }

        self.key_value("File", &artifact.path.display().to_string());
        self.key_value(
            "Duration",
            &format!("{:.2}s", artifact.duration().as_secs_f64()),
        );
        self.key_value("Size", &format!("{:.2} MB", artifact.size_mb()));
        self.key_value("Sample rate", &format!("{} Hz", artifact.sample_rate));
        self.key_value("Channels", &artifact.channel_count.to_string());
        let quality = if artifact.format.is_lossless() {
            "lossless"
        } else {
            "lossy"
        };
        self.key_value(
            "Format",
            &format!("{} ({})", artifact.format.label(), quality),
        );
    }

    /// Print one line per input device
    pub fn device_list(&self, devices: &[DeviceDescriptor]) {
        if devices.is_empty() {
            self.warn("No input devices found");
            return;
        }

        for device in devices {
            let marker = if device.is_default { "*" } else { " " };
            println!(
                "{} {:>2}  {}  ({} ch, {} Hz)",
                marker.green(),
                device.index,
                device.name.bold(),
                device.max_input_channels,
                device.default_sample_rate
            );
        }
    }
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new()
    }
}

fn clock(duration: StdDuration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn level_bar(level: f32) -> String {
    let filled = ((level.clamp(0.0, 100.0) / 100.0) * LEVEL_BAR_WIDTH as f32).round() as usize;
    format!(
        "[{}{}]",
        "█".repeat(filled).cyan(),
        "░".repeat(LEVEL_BAR_WIDTH - filled)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::recording::SessionState;

    fn progress(elapsed_secs: u64, drops: u64, level: f32) -> Progress {
        Progress {
            state: SessionState::Streaming,
            elapsed: StdDuration::from_secs(elapsed_secs),
            frames: 48_000 * elapsed_secs,
            drop_count: drops,
            level,
        }
    }

    #[test]
    fn format_progress_shows_clock_and_frames() {
        colored::control::set_override(false);
        let presenter = Presenter::new();
        let line = presenter.format_progress(&progress(5, 0, 0.0), None);
        assert!(line.contains("00:05"));
        assert!(line.contains("240000 frames"));
        assert!(!line.contains("dropped"));
    }

    #[test]
    fn format_progress_with_limit() {
        colored::control::set_override(false);
        let presenter = Presenter::new();
        let line =
            presenter.format_progress(&progress(65, 0, 0.0), Some(StdDuration::from_secs(120)));
        assert!(line.contains("01:05 / 02:00"));
    }

    #[test]
    fn format_progress_reports_drops() {
        colored::control::set_override(false);
        let presenter = Presenter::new();
        let line = presenter.format_progress(&progress(1, 7, 50.0), None);
        assert!(line.contains("7 dropped"));
    }

    #[test]
    fn level_bar_is_bounded() {
        colored::control::set_override(false);
        assert_eq!(level_bar(0.0), "[░░░░░░░░░░]");
        assert_eq!(level_bar(100.0), "[██████████]");
        assert_eq!(level_bar(250.0), "[██████████]");
        assert_eq!(level_bar(50.0), "[█████░░░░░]");
    }
}
