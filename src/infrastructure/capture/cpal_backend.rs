//! Cross-platform capture backend using cpal
//!
//! `cpal::Stream` is not `Send`, so each stream is built, started, and
//! dropped on its own thread. The returned handle only talks to that thread
//! through channels.

use std::thread::{self, JoinHandle};
use std::time::Duration as StdDuration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    BufferSize, FromSample, Sample, SampleFormat, SampleRate, SizedSample, StreamConfig,
    SupportedBufferSize, SupportedStreamConfigRange,
};
use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, warn};

use crate::application::ports::{
    AudioCallback, BackendError, CallbackStatus, CaptureBackend, CaptureStream,
    StreamErrorCallback,
};
use crate::domain::device::{CaptureConfig, DeviceDescriptor, SampleRateRange};

/// How long to wait for the stream thread to report that capture started
const OPEN_TIMEOUT: StdDuration = StdDuration::from_secs(5);

/// How long to wait for the stream thread to drop the stream
const STOP_TIMEOUT: StdDuration = StdDuration::from_secs(2);

/// Capture backend on the platform's default audio host
#[derive(Debug, Default)]
pub struct CpalBackend;

impl CpalBackend {
    pub fn new() -> Self {
        Self
    }

    fn host() -> cpal::Host {
        cpal::default_host()
    }

    /// Look up an input device by enumeration index
    fn input_device(index: usize) -> Result<cpal::Device, BackendError> {
        Self::host()
            .input_devices()
            .map_err(|e| BackendError::Host(e.to_string()))?
            .nth(index)
            .ok_or(BackendError::DeviceNotFound(index))
    }

    fn describe(
        index: usize,
        device: &cpal::Device,
        default_name: Option<&str>,
    ) -> DeviceDescriptor {
        let name = device
            .name()
            .unwrap_or_else(|_| format!("Input device {}", index));
        let ranges: Vec<SupportedStreamConfigRange> = device
            .supported_input_configs()
            .map(|configs| configs.collect())
            .unwrap_or_default();
        let default_config = device.default_input_config().ok();

        let max_input_channels = ranges
            .iter()
            .map(|r| r.channels())
            .max()
            .or_else(|| default_config.as_ref().map(|c| c.channels()))
            .unwrap_or(0);
        let default_sample_rate = default_config
            .as_ref()
            .map(|c| c.sample_rate().0)
            .or_else(|| ranges.first().map(|r| r.max_sample_rate().0))
            .unwrap_or(0);

        // One entry per channel count and rate span; sample formats collapse
        let mut supported_sample_rates: Vec<SampleRateRange> = ranges
            .iter()
            .map(|r| {
                SampleRateRange::new(
                    r.channels(),
                    r.min_sample_rate().0,
                    r.max_sample_rate().0,
                )
            })
            .collect();
        supported_sample_rates.sort_by_key(|r| (r.channels, r.min, r.max));
        supported_sample_rates.dedup();

        DeviceDescriptor {
            index,
            is_default: default_name == Some(name.as_str()),
            name,
            max_input_channels,
            default_sample_rate,
            supported_sample_rates,
        }
    }

    /// Choose a sample format and buffer size for the negotiated config
    fn stream_config(
        device: &cpal::Device,
        config: &CaptureConfig,
    ) -> Result<(StreamConfig, SampleFormat), BackendError> {
        let rate = config.sample_rate();
        let ranges: Vec<SupportedStreamConfigRange> = device
            .supported_input_configs()
            .map_err(|e| BackendError::StreamOpen(e.to_string()))?
            .filter(|r| {
                r.channels() == config.channel_count()
                    && r.min_sample_rate().0 <= rate
                    && r.max_sample_rate().0 >= rate
            })
            .collect();

        // Prefer float, then the integer formats we can convert
        let preferred = [SampleFormat::F32, SampleFormat::I16, SampleFormat::U16];
        let range = preferred
            .iter()
            .find_map(|fmt| ranges.iter().find(|r| r.sample_format() == *fmt));

        let (sample_format, buffer_size) = match range {
            Some(range) => {
                let buffer_size = match range.buffer_size() {
                    SupportedBufferSize::Range { min, max }
                        if (*min..=*max).contains(&config.block_size()) =>
                    {
                        BufferSize::Fixed(config.block_size())
                    }
                    _ => BufferSize::Default,
                };
                (range.sample_format(), buffer_size)
            }
            None => {
                let default = device
                    .default_input_config()
                    .map_err(|e| BackendError::StreamOpen(e.to_string()))?;
                debug!(
                    "No exact config range for {} ch @ {} Hz, using default format {:?}",
                    config.channel_count(),
                    rate,
                    default.sample_format()
                );
                (default.sample_format(), BufferSize::Default)
            }
        };

        let stream_config = StreamConfig {
            channels: config.channel_count(),
            sample_rate: SampleRate(rate),
            buffer_size,
        };
        Ok((stream_config, sample_format))
    }

    /// Build an input stream that converts samples to `f32` before the
    /// callback sees them
    fn build_stream<T>(
        device: &cpal::Device,
        config: &StreamConfig,
        mut callback: Box<dyn AudioCallback>,
        mut on_error: StreamErrorCallback,
        scratch_len: usize,
    ) -> Result<cpal::Stream, BackendError>
    where
        T: SizedSample,
        f32: FromSample<T>,
    {
        // Sized for two blocks so steady-state callbacks never reallocate
        let mut scratch: Vec<f32> = Vec::with_capacity(scratch_len);
        device
            .build_input_stream(
                config,
                move |data: &[T], _: &cpal::InputCallbackInfo| {
                    scratch.clear();
                    scratch.extend(data.iter().map(|&s| s.to_sample::<f32>()));
                    callback.on_block(&scratch, CallbackStatus::Ok);
                },
                move |err| on_error(err.to_string()),
                None,
            )
            .map_err(|e| BackendError::StreamOpen(e.to_string()))
    }

    /// Build and start the stream. Must run on the thread that will own it.
    fn open_and_play(
        index: usize,
        expected_name: &str,
        config: &CaptureConfig,
        callback: Box<dyn AudioCallback>,
        on_error: StreamErrorCallback,
    ) -> Result<cpal::Stream, BackendError> {
        let device = Self::input_device(index)?;
        if device.name().ok().as_deref() != Some(expected_name) {
            // Enumeration order changed since the descriptor was taken
            return Err(BackendError::DeviceNotFound(index));
        }
        let (stream_config, sample_format) = Self::stream_config(&device, config)?;
        debug!(
            "Opening {} with {:?} {:?}",
            expected_name, sample_format, stream_config
        );

        let scratch_len = config.samples_per_block() * 2;
        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(
                &device,
                &stream_config,
                callback,
                on_error,
                scratch_len,
            )?,
            SampleFormat::I16 => Self::build_stream::<i16>(
                &device,
                &stream_config,
                callback,
                on_error,
                scratch_len,
            )?,
            SampleFormat::U16 => Self::build_stream::<u16>(
                &device,
                &stream_config,
                callback,
                on_error,
                scratch_len,
            )?,
            other => {
                return Err(BackendError::StreamOpen(format!(
                    "Unsupported sample format {:?}",
                    other
                )))
            }
        };

        stream
            .play()
            .map_err(|e| BackendError::StreamPlay(e.to_string()))?;
        Ok(stream)
    }

    /// Runs on the stream thread: open, report readiness, park until stopped
    fn run_stream(
        index: usize,
        expected_name: String,
        config: CaptureConfig,
        callback: Box<dyn AudioCallback>,
        on_error: StreamErrorCallback,
        ready: Sender<Result<(), BackendError>>,
        stop: Receiver<()>,
    ) {
        let stream = match Self::open_and_play(index, &expected_name, &config, callback, on_error)
        {
            Ok(stream) => stream,
            Err(e) => {
                let _ = ready.send(Err(e));
                return;
            }
        };
        let _ = ready.send(Ok(()));

        // Returns on an explicit stop or when the handle is dropped
        let _ = stop.recv();
        if let Err(e) = stream.pause() {
            debug!("Pause before drop failed: {}", e);
        }
        drop(stream);
    }
}

impl CaptureBackend for CpalBackend {
    fn list_devices(&self) -> Result<Vec<DeviceDescriptor>, BackendError> {
        let host = Self::host();
        let default_name = host.default_input_device().and_then(|d| d.name().ok());
        let devices = host
            .input_devices()
            .map_err(|e| BackendError::Host(e.to_string()))?;

        Ok(devices
            .enumerate()
            .map(|(index, device)| Self::describe(index, &device, default_name.as_deref()))
            .filter(|d| d.is_input())
            .collect())
    }

    fn open_stream(
        &self,
        device: &DeviceDescriptor,
        config: &CaptureConfig,
        callback: Box<dyn AudioCallback>,
        on_error: StreamErrorCallback,
    ) -> Result<Box<dyn CaptureStream>, BackendError> {
        let (ready_tx, ready_rx) = bounded(1);
        let (stop_tx, stop_rx) = bounded(1);
        let index = device.index;
        let name = device.name.clone();
        let config = *config;

        let thread = thread::Builder::new()
            .name("capture-stream".to_string())
            .spawn(move || {
                Self::run_stream(index, name, config, callback, on_error, ready_tx, stop_rx)
            })
            .map_err(|e| BackendError::StreamOpen(e.to_string()))?;

        match ready_rx.recv_timeout(OPEN_TIMEOUT) {
            Ok(Ok(())) => Ok(Box::new(CpalStream {
                stop: Some(stop_tx),
                thread: Some(thread),
            })),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => Err(BackendError::StreamOpen(format!(
                "audio host did not start within {}s",
                OPEN_TIMEOUT.as_secs()
            ))),
        }
    }
}

/// Handle to a stream parked on its own thread
struct CpalStream {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl CpalStream {
    fn shutdown(&mut self) -> Result<(), BackendError> {
        // Dropping the sender also wakes the stream thread
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };

        let (done_tx, done_rx) = bounded::<()>(1);
        let joiner = thread::spawn(move || {
            let joined = thread.join();
            let _ = done_tx.send(());
            joined
        });
        match done_rx.recv_timeout(STOP_TIMEOUT) {
            Ok(()) => match joiner.join() {
                Ok(Ok(())) => Ok(()),
                _ => Err(BackendError::Host("capture stream thread panicked".to_string())),
            },
            Err(_) => {
                warn!(
                    "Capture stream did not close within {}s; detaching",
                    STOP_TIMEOUT.as_secs()
                );
                Err(BackendError::Host("timed out closing capture stream".to_string()))
            }
        }
    }
}

impl CaptureStream for CpalStream {
    fn stop(mut self: Box<Self>) -> Result<(), BackendError> {
        self.shutdown()
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_timeout_exceeds_stop_timeout() {
        assert!(OPEN_TIMEOUT >= STOP_TIMEOUT);
    }

    #[test]
    fn list_devices_does_not_panic_without_hardware() {
        // CI machines usually have no capture device; either outcome is fine
        let backend = CpalBackend::new();
        if let Ok(devices) = backend.list_devices() {
            assert!(devices.iter().all(|d| d.max_input_channels > 0));
        }
    }

    #[test]
    fn shutdown_without_thread_is_ok() {
        let mut stream = CpalStream {
            stop: None,
            thread: None,
        };
        assert!(stream.shutdown().is_ok());
    }
}
