//! Command runners for `record` and `devices`

use std::process::ExitCode;
use std::time::Duration as StdDuration;

use chrono::Local;
use tracing::{debug, warn};

use crate::application::ports::{CaptureBackend, ConfigStore};
use crate::application::{Recorder, RecorderSettings};
use crate::domain::config::AppConfig;
use crate::domain::output::{OutputFormat, OutputTarget};
use crate::domain::recording::Duration;
use crate::infrastructure::{default_writer, CpalBackend, FfmpegEncoder};

use super::args::RecordArgs;
use super::presenter::Presenter;
use super::signals::ShutdownSignal;

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

/// How often the spinner polls the session
const PROGRESS_INTERVAL: StdDuration = StdDuration::from_millis(100);

/// Record until interrupted or the duration elapses, then save
pub async fn run_record<S: ConfigStore>(args: RecordArgs, store: &S) -> ExitCode {
    let mut presenter = Presenter::new();

    let limit = match args.duration.as_deref().map(str::parse::<Duration>) {
        None => None,
        Some(Ok(d)) => Some(d.as_std()),
        Some(Err(e)) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_USAGE_ERROR);
        }
    };

    let config = load_merged_config(store, args.to_config()).await;
    let target = resolve_target(&args, &config);

    if target.format() == OutputFormat::Aac && !FfmpegEncoder::default().is_available().await {
        presenter.warn("ffmpeg not found; the recording will be saved as WAV");
    }

    let shutdown = ShutdownSignal::new();
    if let Err(e) = shutdown.setup().await {
        presenter.error(&format!("Failed to setup signal handler: {}", e));
        return ExitCode::from(EXIT_ERROR);
    }

    let writer = default_writer(
        config.bitrate_or_default(),
        config.encode_timeout_or_default(),
    );
    let recorder = Recorder::new(
        CpalBackend::new(),
        writer,
        RecorderSettings::from_config(&config),
    );

    // Opening the stream blocks until the device is ready
    let request = config.capture_request();
    let handle = match tokio::task::block_in_place(|| recorder.start(request, target)) {
        Ok(handle) => handle,
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if let Some(negotiation) = recorder.negotiation(handle) {
        if negotiation.was_adjusted() {
            for adjustment in &negotiation.adjustments {
                presenter.warn(&adjustment.to_string());
            }
        }
        presenter.info(&format!(
            "Recording from {} ({} Hz, {} ch). Press Ctrl+C to stop.",
            negotiation.device.name,
            negotiation.config.sample_rate(),
            negotiation.config.channel_count()
        ));
    }
    if let Some(target) = recorder.target(handle) {
        debug!("Writing to {}", target.path().display());
    }

    presenter.start_spinner("Recording...");

    let deadline = async {
        match limit {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);
    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);

    loop {
        tokio::select! {
            _ = shutdown.wait() => break,
            _ = &mut deadline => break,
            _ = ticker.tick() => {
                if let Some(progress) = recorder.progress(handle) {
                    presenter.update_recording_progress(&progress, limit);
                }
            }
        }
    }

    presenter.update_spinner("Saving...");

    match recorder.stop(handle).await {
        Ok(artifact) => {
            presenter.spinner_success("Recording saved");
            presenter.artifact_summary(&artifact);
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            presenter.spinner_fail("Recording failed");
            presenter.error(&e.to_string());
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// List input devices as text or JSON
pub async fn run_devices<B: CaptureBackend>(backend: &B, json: bool) -> ExitCode {
    let presenter = Presenter::new();

    let devices = match tokio::task::block_in_place(|| backend.list_devices()) {
        Ok(devices) => devices,
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if !json {
        presenter.device_list(&devices);
        return ExitCode::from(EXIT_SUCCESS);
    }

    match serde_json::to_string_pretty(&devices) {
        Ok(text) => {
            presenter.output(&text);
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            presenter.error(&e.to_string());
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Explicit `-o` wins; otherwise a timestamped name in `output_dir`
fn resolve_target(args: &RecordArgs, config: &AppConfig) -> OutputTarget {
    match args.output {
        Some(ref path) => OutputTarget::from_path(path, args.format.map(OutputFormat::from)),
        None => OutputTarget::timestamped(
            &config.output_dir_or_default(),
            config.format_or_default(),
            &Local::now(),
        ),
    }
}

/// Load and merge configuration: defaults < file < CLI
pub async fn load_merged_config<S: ConfigStore>(store: &S, cli_config: AppConfig) -> AppConfig {
    let file_config = match store.load().await {
        Ok(config) => config,
        Err(e) => {
            warn!("Ignoring config file {}: {}", store.path().display(), e);
            AppConfig::empty()
        }
    };

    AppConfig::defaults().merge(file_config).merge(cli_config)
}
