//! Field Recorder - capture audio from an input device to a file
//!
//! Audio is pulled from a cpal input stream by a real-time callback, handed
//! through a bounded queue to a recording thread, and written as WAV, FLAC,
//! or AAC (via ffmpeg) once the session stops.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Value objects, device negotiation, the session state machine, and errors
//! - **Application**: The recorder, capture queue, writer, and port interfaces (traits)
//! - **Infrastructure**: Adapter implementations (cpal, hound, flacenc, ffmpeg, config file)
//! - **CLI**: Command-line interface, argument parsing, and signal handling

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
