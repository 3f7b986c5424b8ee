//! Recording session use case
//!
//! Owns at most one capture at a time. `start` negotiates the device,
//! opens the stream, and spawns the consumption thread that moves blocks
//! from the capture queue into the session's sample store. `stop` closes
//! the stream, drains the queue within a bounded grace period, and hands
//! the samples to the [`ArtifactWriter`].

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::domain::config::AppConfig;
use crate::domain::device::{negotiate, CaptureRequest, Negotiation};
use crate::domain::error::DeviceIncompatible;
use crate::domain::output::{Notice, OutputArtifact, OutputTarget, PcmAudio};
use crate::domain::recording::{
    Duration, InvalidStateTransition, LevelMeter, Progress, RecordingSession, SessionState,
};

use super::callback::QueueingCallback;
use super::capture_queue::{pooled_capture_queue, BlockConsumer, QueueCloser, QueueStats};
use super::ports::{select_device, BackendError, CaptureBackend, CaptureStream};
use super::writer::{ArtifactWriter, WriteError};

/// Blocks between periodic progress log lines
const PROGRESS_LOG_INTERVAL: u64 = 100;

/// Errors from starting a session
#[derive(Debug, Error)]
pub enum StartError {
    #[error("A recording session is already active ({0})")]
    AlreadyActive(SessionState),

    #[error("Input device {0} not found")]
    DeviceNotFound(usize),

    #[error(transparent)]
    Incompatible(#[from] DeviceIncompatible),

    #[error("{0}")]
    StreamOpen(String),

    #[error(transparent)]
    Backend(BackendError),

    #[error("Failed to start recording thread: {0}")]
    Thread(String),

    #[error(transparent)]
    InvalidState(#[from] InvalidStateTransition),
}

impl From<BackendError> for StartError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::DeviceNotFound(index) => Self::DeviceNotFound(index),
            BackendError::StreamOpen(_) | BackendError::StreamPlay(_) => {
                Self::StreamOpen(e.to_string())
            }
            other => Self::Backend(other),
        }
    }
}

/// Errors from stopping a session
#[derive(Debug, Error)]
pub enum StopError {
    #[error("No recording in progress")]
    NotRecording,

    #[error("No audio was captured")]
    NoAudioCaptured,

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    InvalidState(#[from] InvalidStateTransition),
}

/// Identifies one started session. Stale once that session has stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle {
    id: u64,
}

/// Tunables for the recorder
#[derive(Debug, Clone)]
pub struct RecorderSettings {
    /// Capture queue capacity in blocks
    pub queue_capacity: usize,
    /// How long `stop` waits for the consumption thread
    pub drain_timeout: Duration,
    pub level_meter: LevelMeter,
}

impl RecorderSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            queue_capacity: config.queue_capacity_or_default(),
            drain_timeout: config.drain_timeout_or_default(),
            level_meter: LevelMeter::default(),
        }
    }
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::empty())
    }
}

/// Counters published for progress polling.
/// Block counters are written only by the consumption thread.
#[derive(Debug)]
struct SessionMetrics {
    started: Instant,
    state: AtomicU8,
    frames: AtomicU64,
    blocks: AtomicU64,
    level_bits: AtomicU32,
    stream_errors: AtomicU64,
    host_flags: Arc<AtomicU64>,
}

impl SessionMetrics {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            state: AtomicU8::new(SessionState::Negotiating.as_u8()),
            frames: AtomicU64::new(0),
            blocks: AtomicU64::new(0),
            level_bits: AtomicU32::new(0f32.to_bits()),
            stream_errors: AtomicU64::new(0),
            host_flags: Arc::new(AtomicU64::new(0)),
        }
    }

    fn set_state(&self, state: SessionState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Returns the block count including this one
    fn record_block(&self, frames: u64, level: f32) -> u64 {
        self.frames.fetch_add(frames, Ordering::Relaxed);
        self.level_bits.store(level.to_bits(), Ordering::Relaxed);
        self.blocks.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    fn level(&self) -> f32 {
        f32::from_bits(self.level_bits.load(Ordering::Relaxed))
    }

    /// Stream errors plus host status flags
    fn host_problems(&self) -> u64 {
        self.stream_errors.load(Ordering::Relaxed) + self.host_flags.load(Ordering::Relaxed)
    }
}

/// Everything `stop` needs once the session leaves `Streaming`
struct DrainParts {
    stream: Option<Box<dyn CaptureStream>>,
    completion: Option<oneshot::Receiver<()>>,
    worker: Option<JoinHandle<()>>,
    closer: QueueCloser,
    queue: QueueStats,
    store: Arc<Mutex<Vec<f32>>>,
    metrics: Arc<SessionMetrics>,
    negotiation: Negotiation,
    target: OutputTarget,
}

struct ActiveSession {
    handle: SessionHandle,
    negotiation: Negotiation,
    target: OutputTarget,
    metrics: Arc<SessionMetrics>,
    queue: QueueStats,
    closer: QueueCloser,
    store: Arc<Mutex<Vec<f32>>>,
    stream: Option<Box<dyn CaptureStream>>,
    completion: Option<oneshot::Receiver<()>>,
    worker: Option<JoinHandle<()>>,
}

impl ActiveSession {
    fn take_drain_parts(&mut self) -> DrainParts {
        DrainParts {
            stream: self.stream.take(),
            completion: self.completion.take(),
            worker: self.worker.take(),
            closer: self.closer.clone(),
            queue: self.queue.clone(),
            store: Arc::clone(&self.store),
            metrics: Arc::clone(&self.metrics),
            negotiation: self.negotiation.clone(),
            target: self.target.clone(),
        }
    }
}

/// Single-session audio recorder
pub struct Recorder<B: CaptureBackend> {
    backend: B,
    writer: ArtifactWriter,
    settings: RecorderSettings,
    session: Mutex<RecordingSession>,
    active: Mutex<Option<ActiveSession>>,
    next_id: AtomicU64,
}

impl<B: CaptureBackend> Recorder<B> {
    pub fn new(backend: B, writer: ArtifactWriter, settings: RecorderSettings) -> Self {
        Self {
            backend,
            writer,
            settings,
            session: Mutex::new(RecordingSession::new()),
            active: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.session.lock().state()
    }

    /// Start capturing into a new session.
    ///
    /// Fails fast with [`StartError::AlreadyActive`] unless the recorder is
    /// idle. Any other failure returns the recorder to idle.
    pub fn start(
        &self,
        request: CaptureRequest,
        target: OutputTarget,
    ) -> Result<SessionHandle, StartError> {
        self.session
            .lock()
            .begin_negotiation()
            .map_err(|e| StartError::AlreadyActive(e.current_state))?;

        let active = match self.open_session(request, target) {
            Ok(active) => active,
            Err(e) => {
                let _ = self.session.lock().abort_start();
                return Err(e);
            }
        };

        let handle = active.handle;
        active.metrics.set_state(SessionState::Streaming);
        *self.active.lock() = Some(active);
        self.session.lock().start_streaming()?;

        Ok(handle)
    }

    fn open_session(
        &self,
        request: CaptureRequest,
        target: OutputTarget,
    ) -> Result<ActiveSession, StartError> {
        // Always re-enumerate; descriptors go stale when hardware changes
        let devices = self.backend.list_devices()?;
        let device = select_device(&devices, request.device)?;
        let negotiation = negotiate(&request, &device)?;
        for adjustment in &negotiation.adjustments {
            info!("{}: {}", device.name, adjustment);
        }
        let config = negotiation.config;

        let (producer, consumer, closer) =
            pooled_capture_queue(self.settings.queue_capacity, config.samples_per_block());
        let queue = closer.stats();
        let metrics = Arc::new(SessionMetrics::new());

        let callback = QueueingCallback::new(
            producer,
            config.channel_count(),
            Arc::clone(&metrics.host_flags),
        );
        let error_metrics = Arc::clone(&metrics);
        let on_error = Box::new(move |_message: String| {
            error_metrics.stream_errors.fetch_add(1, Ordering::Relaxed);
        });

        let stream = self
            .backend
            .open_stream(&device, &config, Box::new(callback), on_error)?;

        let store = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done_rx) = oneshot::channel();
        let spawned = {
            let store = Arc::clone(&store);
            let metrics = Arc::clone(&metrics);
            let queue = queue.clone();
            let meter = self.settings.level_meter;
            thread::Builder::new()
                .name("recording-consumer".to_string())
                .spawn(move || consume(consumer, store, metrics, queue, meter, done_tx))
        };
        let worker = match spawned {
            Ok(worker) => worker,
            Err(e) => {
                closer.close();
                if let Err(stop_err) = stream.stop() {
                    warn!("Failed to stop stream after thread error: {}", stop_err);
                }
                return Err(StartError::Thread(e.to_string()));
            }
        };

        info!(
            "Recording from {} at {} Hz, {} channel(s), {} frames per block",
            device.name,
            config.sample_rate(),
            config.channel_count(),
            config.block_size()
        );

        Ok(ActiveSession {
            handle: SessionHandle {
                id: self.next_id.fetch_add(1, Ordering::Relaxed),
            },
            negotiation,
            target,
            metrics,
            queue,
            closer,
            store,
            stream: Some(stream),
            completion: Some(done_rx),
            worker: Some(worker),
        })
    }

    /// Snapshot of the session's progress, `None` if the handle is stale
    pub fn progress(&self, handle: SessionHandle) -> Option<Progress> {
        let active = self.active.lock();
        let session = active.as_ref().filter(|s| s.handle == handle)?;
        let metrics = &session.metrics;
        Some(Progress {
            state: metrics.state(),
            elapsed: metrics.started.elapsed(),
            frames: metrics.frames(),
            drop_count: session.queue.dropped(),
            level: metrics.level(),
        })
    }

    /// The resolved capture parameters, `None` if the handle is stale
    pub fn negotiation(&self, handle: SessionHandle) -> Option<Negotiation> {
        self.active
            .lock()
            .as_ref()
            .filter(|s| s.handle == handle)
            .map(|s| s.negotiation.clone())
    }

    /// Where the session will be written, `None` if the handle is stale
    pub fn target(&self, handle: SessionHandle) -> Option<OutputTarget> {
        self.active
            .lock()
            .as_ref()
            .filter(|s| s.handle == handle)
            .map(|s| s.target.clone())
    }

    /// Stop the session, drain buffered audio, and write the artifact.
    ///
    /// A stale handle or idle recorder yields [`StopError::NotRecording`]
    /// without side effects.
    pub async fn stop(&self, handle: SessionHandle) -> Result<OutputArtifact, StopError> {
        let mut parts = {
            let mut active = self.active.lock();
            let session = match active.as_mut() {
                Some(s) if s.handle == handle => s,
                _ => return Err(StopError::NotRecording),
            };
            self.session
                .lock()
                .begin_draining()
                .map_err(|_| StopError::NotRecording)?;
            // Drops stop counting before anyone can observe Draining
            session.closer.freeze_drops();
            session.metrics.set_state(SessionState::Draining);
            session.take_drain_parts()
        };

        // Returns the recorder to idle however this future ends
        let _reset = ResetOnDrop {
            session: &self.session,
            active: &self.active,
        };

        let (samples, notices) = self.drain(&mut parts).await;

        self.session.lock().finish_draining()?;
        parts.metrics.set_state(SessionState::Stopped);

        if samples.is_empty() {
            warn!("Stopped with an empty sample buffer; nothing written");
            return Err(StopError::NoAudioCaptured);
        }

        let config = parts.negotiation.config;
        let pcm = PcmAudio::new(samples, config.sample_rate(), config.channel_count());
        let artifact = self.writer.write(pcm, &parts.target, notices).await?;
        Ok(artifact)
    }

    /// Stop the stream and collect the session's samples.
    ///
    /// Waiting for the consumption thread and taking the sample store share
    /// one deadline, `drain_timeout` after the queue closes. Samples already
    /// captured are lost only if the thread still holds the store lock at
    /// that deadline.
    async fn drain(&self, parts: &mut DrainParts) -> (Vec<f32>, Vec<Notice>) {
        let grace = self.settings.drain_timeout;
        let mut notices = Vec::new();

        if let Some(stream) = parts.stream.take() {
            match tokio::task::spawn_blocking(move || stream.stop()).await {
                Ok(Ok(())) => debug!("Capture stream stopped"),
                Ok(Err(e)) => warn!("Capture stream did not stop cleanly: {}", e),
                Err(e) => warn!("Stream stop task failed: {}", e),
            }
        }
        parts.closer.close();
        let deadline = Instant::now() + grace.as_std();

        let finished = match parts.completion.take() {
            Some(done) => {
                tokio::time::timeout_at(tokio::time::Instant::from_std(deadline), done)
                    .await
                    .is_ok()
            }
            None => true,
        };

        let worker = parts.worker.take();
        if finished {
            if let Some(worker) = worker {
                if worker.join().is_err() {
                    warn!("Recording thread panicked");
                }
            }
        } else {
            // Dropping the handle detaches the thread
            drop(worker);
            warn!(
                "Recording thread did not finish within {}; keeping partial audio",
                grace
            );
            notices.push(Notice::DrainTimeout { grace });
        }

        let samples = match parts.store.try_lock_until(deadline) {
            Some(mut store) => std::mem::take(&mut *store),
            None => {
                warn!("Sample store still locked after {}; discarding", grace);
                Vec::new()
            }
        };

        let dropped = parts.queue.dropped();
        if dropped > 0 {
            notices.push(Notice::BlocksDropped(dropped));
        }
        let host_problems = parts.metrics.host_problems();
        if host_problems > 0 {
            notices.push(Notice::StreamErrors(host_problems));
        }

        debug!(
            "Drained {} samples, {} dropped block(s)",
            samples.len(),
            dropped
        );
        (samples, notices)
    }
}

/// Clears the active slot and walks the state machine back to idle
struct ResetOnDrop<'a> {
    session: &'a Mutex<RecordingSession>,
    active: &'a Mutex<Option<ActiveSession>>,
}

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        self.active.lock().take();
        let mut session = self.session.lock();
        if session.state() == SessionState::Draining {
            let _ = session.finish_draining();
        }
        let _ = session.reset();
    }
}

/// Consumption loop. Runs until the queue is closed and empty.
fn consume(
    consumer: BlockConsumer,
    store: Arc<Mutex<Vec<f32>>>,
    metrics: Arc<SessionMetrics>,
    queue: QueueStats,
    meter: LevelMeter,
    done: oneshot::Sender<()>,
) {
    while let Some(block) = consumer.pop_blocking() {
        store.lock().extend_from_slice(block.samples());
        let blocks = metrics.record_block(block.frames() as u64, meter.level(block.rms()));
        consumer.recycle(block);
        if blocks % PROGRESS_LOG_INTERVAL == 0 {
            debug!(
                "Consumed {} blocks, {} frames, {} dropped",
                blocks,
                metrics.frames(),
                queue.dropped()
            );
        }
    }
    debug!("Consumption loop finished");
    let _ = done.send(());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{
        AudioCallback, AudioEncoder, CallbackStatus, EncodeError, StreamErrorCallback,
    };
    use crate::domain::device::{CaptureConfig, DeviceDescriptor};
    use crate::domain::output::OutputFormat;
    use async_trait::async_trait;
    use crossbeam_channel::{select, unbounded, Receiver, Sender};
    use std::path::Path;
    use std::time::Duration as StdDuration;

    /// Forwards blocks sent by the test into the callback
    struct FeedBackend {
        feed: Mutex<Option<Receiver<Vec<f32>>>>,
    }

    struct FeedStream {
        stop_tx: Sender<()>,
        thread: Option<JoinHandle<()>>,
    }

    impl CaptureStream for FeedStream {
        fn stop(mut self: Box<Self>) -> Result<(), BackendError> {
            let _ = self.stop_tx.send(());
            if let Some(thread) = self.thread.take() {
                let _ = thread.join();
            }
            Ok(())
        }
    }

    impl CaptureBackend for FeedBackend {
        fn list_devices(&self) -> Result<Vec<DeviceDescriptor>, BackendError> {
            Ok(vec![DeviceDescriptor {
                index: 0,
                name: "feed".to_string(),
                max_input_channels: 1,
                default_sample_rate: 8_000,
                supported_sample_rates: Vec::new(),
                is_default: true,
            }])
        }

        fn open_stream(
            &self,
            _device: &DeviceDescriptor,
            _config: &CaptureConfig,
            mut callback: Box<dyn AudioCallback>,
            _on_error: StreamErrorCallback,
        ) -> Result<Box<dyn CaptureStream>, BackendError> {
            let feed = self
                .feed
                .lock()
                .take()
                .ok_or_else(|| BackendError::StreamOpen("feed already used".to_string()))?;
            let (stop_tx, stop_rx) = unbounded::<()>();
            let thread = thread::spawn(move || loop {
                select! {
                    recv(feed) -> block => match block {
                        Ok(block) => callback.on_block(&block, CallbackStatus::Ok),
                        Err(_) => break,
                    },
                    recv(stop_rx) -> _ => {
                        while let Ok(block) = feed.try_recv() {
                            callback.on_block(&block, CallbackStatus::Ok);
                        }
                        break;
                    }
                }
            });
            Ok(Box::new(FeedStream {
                stop_tx,
                thread: Some(thread),
            }))
        }
    }

    struct CountingWav;

    #[async_trait]
    impl AudioEncoder for CountingWav {
        fn format(&self) -> OutputFormat {
            OutputFormat::Wav
        }

        async fn encode(&self, pcm: &PcmAudio, dest: &Path) -> Result<(), EncodeError> {
            tokio::fs::write(dest, pcm.samples().len().to_string()).await?;
            Ok(())
        }
    }

    fn recorder(grace: Duration) -> (Arc<Recorder<FeedBackend>>, Sender<Vec<f32>>) {
        let (tx, rx) = unbounded();
        let backend = FeedBackend {
            feed: Mutex::new(Some(rx)),
        };
        let writer = ArtifactWriter::new(vec![Arc::new(CountingWav)]);
        let settings = RecorderSettings {
            queue_capacity: 16,
            drain_timeout: grace,
            level_meter: LevelMeter::default(),
        };
        (Arc::new(Recorder::new(backend, writer, settings)), tx)
    }

    fn wait_for_frames(recorder: &Recorder<FeedBackend>, handle: SessionHandle, frames: u64) {
        for _ in 0..500 {
            if recorder.progress(handle).map(|p| p.frames) >= Some(frames) {
                return;
            }
            thread::sleep(StdDuration::from_millis(2));
        }
        panic!("frames never reached {}", frames);
    }

    fn active_store(recorder: &Recorder<FeedBackend>) -> Arc<Mutex<Vec<f32>>> {
        Arc::clone(&recorder.active.lock().as_ref().unwrap().store)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn hung_consumer_is_abandoned_within_grace() {
        let tmp = tempfile::tempdir().unwrap();
        let (recorder, feed) = recorder(Duration::from_millis(300));
        let target = OutputTarget::from_path(tmp.path().join("hung.wav"), None);
        let handle = recorder.start(CaptureRequest::default(), target).unwrap();

        feed.send(vec![0.1; 64]).unwrap();
        wait_for_frames(&recorder, handle, 64);

        // Hold the store so the consumer blocks on the next block
        let store = active_store(&recorder);
        let guard = store.lock();
        feed.send(vec![0.2; 64]).unwrap();

        let started = Instant::now();
        let result = recorder.stop(handle).await;
        let elapsed = started.elapsed();
        drop(guard);

        // One grace period covers the thread wait and the store wait
        assert!(
            elapsed < StdDuration::from_millis(550),
            "stop took {:?}",
            elapsed
        );
        // The store was still locked at the deadline, so nothing is kept
        assert!(matches!(result, Err(StopError::NoAudioCaptured)));
        assert_eq!(recorder.state(), SessionState::Idle);
        assert!(!tmp.path().join("hung.wav").exists());
    }

    #[tokio::test]
    async fn drain_timeout_keeps_partial_audio() {
        let grace = Duration::from_millis(150);
        let (recorder, _feed) = recorder(grace);
        let device = recorder.backend().list_devices().unwrap().remove(0);
        let negotiation = negotiate(&CaptureRequest::default(), &device).unwrap();

        // A consumer stuck outside the store lock never signals completion
        let (_producer, _consumer, closer) = pooled_capture_queue(4, 0);
        let (_done_tx, done_rx) = oneshot::channel();
        let mut parts = DrainParts {
            stream: None,
            completion: Some(done_rx),
            worker: None,
            queue: closer.stats(),
            closer,
            store: Arc::new(Mutex::new(vec![0.25; 64])),
            metrics: Arc::new(SessionMetrics::new()),
            negotiation,
            target: OutputTarget::from_path("unused.wav", None),
        };

        let started = Instant::now();
        let (samples, notices) = recorder.drain(&mut parts).await;

        assert!(started.elapsed() >= grace.as_std());
        assert!(started.elapsed() < StdDuration::from_secs(1));
        assert_eq!(samples, vec![0.25; 64]);
        assert_eq!(notices, vec![Notice::DrainTimeout { grace }]);
    }

    #[tokio::test]
    async fn handle_goes_stale_after_stop() {
        let tmp = tempfile::tempdir().unwrap();
        let (recorder, feed) = recorder(Duration::from_secs(2));
        let target = OutputTarget::from_path(tmp.path().join("take.wav"), None);
        let handle = recorder.start(CaptureRequest::default(), target).unwrap();

        feed.send(vec![0.5; 32]).unwrap();
        let artifact = recorder.stop(handle).await.unwrap();
        assert_eq!(artifact.frames, 32);
        assert_eq!(artifact.sample_rate, 8_000);

        assert!(recorder.progress(handle).is_none());
        assert!(recorder.negotiation(handle).is_none());
        assert!(matches!(
            recorder.stop(handle).await,
            Err(StopError::NotRecording)
        ));
    }

    #[test]
    fn start_error_maps_backend_errors() {
        assert!(matches!(
            StartError::from(BackendError::DeviceNotFound(3)),
            StartError::DeviceNotFound(3)
        ));
        assert!(matches!(
            StartError::from(BackendError::StreamPlay("busy".into())),
            StartError::StreamOpen(_)
        ));
        assert!(matches!(
            StartError::from(BackendError::Host("gone".into())),
            StartError::Backend(_)
        ));
    }

    #[test]
    fn metrics_record_blocks() {
        let metrics = SessionMetrics::new();
        assert_eq!(metrics.record_block(10, 12.5), 1);
        assert_eq!(metrics.record_block(5, 40.0), 2);
        assert_eq!(metrics.frames(), 15);
        assert_eq!(metrics.level(), 40.0);
        metrics.host_flags.fetch_add(2, Ordering::Relaxed);
        metrics.stream_errors.fetch_add(1, Ordering::Relaxed);
        assert_eq!(metrics.host_problems(), 3);
    }
}
