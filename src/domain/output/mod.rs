//! Output domain module

mod artifact;
mod format;
mod pcm;
mod target;

pub use artifact::{Notice, OutputArtifact};
pub use format::{OutputFormat, ALL_FORMATS};
pub use pcm::{dequantize, quantize, PcmAudio};
pub use target::OutputTarget;
