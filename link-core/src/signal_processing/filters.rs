//! Root-raised-cosine pulse shaping and matched filtering (§3, §4.5).
//!
//! The three-case impulse-response formula is pinned exactly as §4.5
//! specifies it; this supersedes the teacher's fixed rolloff/span constants
//! (`signal_processing::filters::apply_rrc_filter` used rolloff=0.5, an
//! 8-symbol span, and unit-energy normalization for a single fixed audio
//! carrier) — here roll-off and span are caller-supplied parameters, and taps
//! are left at their natural DC gain rather than forced to unit energy, since
//! §4.5 doesn't call for that normalization.

use crate::errors::DspError;
use num_complex::Complex64;
use rayon::prelude::*;
use std::f64::consts::{PI, SQRT_2};

/// Default roll-off factor, §4.5.
pub const DEFAULT_BETA: f64 = 0.35;
/// Default filter span in symbols, §4.5.
pub const DEFAULT_SPAN_SYMBOLS: usize = 6;

/// Resolve the integer samples-per-symbol ratio from raw sample/symbol
/// rates, rejecting a symbol rate that doesn't fit under the sample rate.
pub fn samples_per_symbol_from_rates(sample_rate_hz: f64, symbol_rate_hz: f64) -> Result<usize, DspError> {
    if !(symbol_rate_hz > 0.0) || symbol_rate_hz > sample_rate_hz {
        return Err(DspError::InvalidRateRatio {
            sample_rate: sample_rate_hz as usize,
            symbol_rate: symbol_rate_hz as usize,
        });
    }
    Ok((sample_rate_hz / symbol_rate_hz).round() as usize)
}

/// Generate root-raised-cosine filter taps at the given sample rate.
///
/// `beta` is the roll-off factor in (0,1); `span_symbols` is the filter
/// length in symbol periods; `samples_per_symbol` is `sample_rate /
/// symbol_rate`.
pub fn rrc_taps(beta: f64, span_symbols: usize, samples_per_symbol: usize) -> Result<Vec<f64>, DspError> {
    if !(beta > 0.0 && beta < 1.0) {
        return Err(DspError::InvalidRolloff { beta: beta.to_string() });
    }

    let sps = samples_per_symbol as f64;
    let filter_len = span_symbols * samples_per_symbol + 1;
    let center = (filter_len / 2) as f64;

    let mut taps = vec![0.0f64; filter_len];
    for (n, tap) in taps.iter_mut().enumerate() {
        // t is expressed in units of the symbol period T (T == 1 here; the
        // sample spacing is 1/sps symbol periods).
        let t = (n as f64 - center) / sps;
        *tap = rrc_value(t, beta);
    }
    Ok(taps)
}

/// §4.5's three-case RRC impulse response, with `T = 1` (t expressed in
/// symbol periods) so the formula reduces to the textbook normalized form.
fn rrc_value(t: f64, beta: f64) -> f64 {
    if t.abs() < 1e-9 {
        return 1.0 + beta * (4.0 / PI - 1.0);
    }

    let singularity = 1.0 / (4.0 * beta);
    if (t.abs() - singularity).abs() < 1e-9 {
        let a = (1.0 + 2.0 / PI) * (PI / (4.0 * beta)).sin();
        let b = (1.0 - 2.0 / PI) * (PI / (4.0 * beta)).cos();
        return (beta / SQRT_2) * (a + b);
    }

    let pi_t = PI * t;
    let numerator = (pi_t * (1.0 - beta)).sin() + 4.0 * beta * t * (pi_t * (1.0 + beta)).cos();
    let denominator = pi_t * (1.0 - (4.0 * beta * t).powi(2));
    numerator / denominator
}

/// "Same"-length convolution with zero-padded boundaries, matching the
/// teacher's `signal_processing::filters::convolve` shape but over `f64`
/// samples and parallelized with `rayon`, mirroring the teacher's dependency
/// on it for DSP hot paths.
pub fn convolve(signal: &[f64], kernel: &[f64]) -> Vec<f64> {
    let half = kernel.len() / 2;
    (0..signal.len())
        .into_par_iter()
        .map(|i| {
            let mut acc = 0.0;
            for (j, &k) in kernel.iter().enumerate() {
                let idx = i as i64 + j as i64 - half as i64;
                if idx >= 0 && (idx as usize) < signal.len() {
                    acc += signal[idx as usize] * k;
                }
            }
            acc
        })
        .collect()
}

/// Upsample a complex symbol sequence by inserting `samples_per_symbol - 1`
/// zeros between symbols (§4.5).
pub fn upsample(symbols: &[Complex64], samples_per_symbol: usize) -> Vec<Complex64> {
    let mut out = vec![Complex64::new(0.0, 0.0); symbols.len() * samples_per_symbol];
    for (i, &symbol) in symbols.iter().enumerate() {
        out[i * samples_per_symbol] = symbol;
    }
    out
}

/// Apply RRC taps to a complex signal (I and Q convolved independently).
pub fn apply_rrc(signal: &[Complex64], taps: &[f64]) -> Vec<Complex64> {
    let i: Vec<f64> = signal.iter().map(|c| c.re).collect();
    let q: Vec<f64> = signal.iter().map(|c| c.im).collect();
    let i_out = convolve(&i, taps);
    let q_out = convolve(&q, taps);
    i_out.into_iter().zip(q_out).map(|(i, q)| Complex64::new(i, q)).collect()
}

/// Transmit-side pulse shaping: upsample symbols, then convolve with RRC taps.
pub fn pulse_shape(symbols: &[Complex64], taps: &[f64], samples_per_symbol: usize) -> Vec<Complex64> {
    apply_rrc(&upsample(symbols, samples_per_symbol), taps)
}
