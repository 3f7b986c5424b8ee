//! Device domain module

mod descriptor;
mod negotiator;

pub use descriptor::{DeviceDescriptor, SampleRateRange};
pub use negotiator::{
    negotiate, Adjustment, CaptureConfig, CaptureRequest, Negotiation, DEFAULT_BLOCK_SIZE,
    DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE,
};
