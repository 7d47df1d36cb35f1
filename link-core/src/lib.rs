//! Core signal-processing and framed-packet codec library for the
//! wireless-link emulator.
//!
//! Every stage except [`channel::Channel`] is a pure function over typed
//! buffers; socket I/O and process orchestration live in `link-cli`.

pub mod channel;
pub mod cipher;
pub mod config;
pub mod crc;
pub mod dsp;
pub mod errors;
pub mod fec;
pub mod framesync;
pub mod metrics;
pub mod packet;
pub mod pipeline;
pub mod signal_processing;
pub mod utils;

pub use errors::{LinkError, Result};
