//! Progress snapshot and level metering

use std::time::Duration as StdDuration;

use super::SessionState;

/// Converts block RMS into a 0-100 display level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelMeter {
    gain: f32,
}

impl LevelMeter {
    /// Gain used by the recorder's progress display
    pub const DEFAULT_GAIN: f32 = 1000.0;

    pub const fn new(gain: f32) -> Self {
        Self { gain }
    }

    /// Scale an RMS value into `0.0..=100.0`
    pub fn level(&self, rms: f32) -> f32 {
        if !rms.is_finite() {
            return 0.0;
        }
        (rms * self.gain).clamp(0.0, 100.0)
    }
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_GAIN)
    }
}

/// Read-only view of a running session, polled by the control layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub state: SessionState,
    /// Wall-clock time since the stream opened
    pub elapsed: StdDuration,
    /// Frames appended to the session buffer so far
    pub frames: u64,
    /// Blocks dropped by the real-time callback under backpressure
    pub drop_count: u64,
    /// Level of the most recently consumed block, 0-100
    pub level: f32,
}

impl Progress {
    /// Audio duration represented by the captured frames
    pub fn captured(&self, sample_rate: u32) -> StdDuration {
        if sample_rate == 0 {
            return StdDuration::ZERO;
        }
        StdDuration::from_secs_f64(self.frames as f64 / sample_rate as f64)
    }

    /// Elapsed wall-clock time as `MM:SS`
    pub fn elapsed_clock(&self) -> String {
        let secs = self.elapsed.as_secs();
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }
}
