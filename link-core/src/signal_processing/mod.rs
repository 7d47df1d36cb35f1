//! Modulation and pulse-shaping DSP for the sample-mode transmit/receive
//! chain (§4.4, §4.5).

pub mod filters;
pub mod modulation;

pub use filters::{apply_rrc, pulse_shape, rrc_taps, upsample, DEFAULT_BETA, DEFAULT_SPAN_SYMBOLS};
pub use modulation::{demodulate_hard, demodulate_soft, modulate, Scheme};
