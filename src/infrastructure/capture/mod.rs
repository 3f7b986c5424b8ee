//! Capture infrastructure module
//!
//! Audio host adapters implementing the capture port.

mod cpal_backend;

pub use cpal_backend::CpalBackend;
