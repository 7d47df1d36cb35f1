//! Receiver-side timing recovery, downsampling, and sync-pattern framing
//! (§3, §4.7).
//!
//! The state machine shape (`Searching -> Found -> HaveLength -> Verified ->
//! Emit`, aborting on the first failure with no mid-packet retry) mirrors the
//! teacher's `protocol` module's frame-state handling; the sync/stop pattern
//! correlation itself is new, grounded directly in §4.7 since the teacher has
//! no analogous preamble search.

use crate::errors::SyncError;
use crate::signal_processing::filters::apply_rrc;
use crate::signal_processing::modulation::{demodulate_hard, Scheme};
use crate::utils::{bytes_to_bits, pack_bits};
use num_complex::Complex32;

/// 8-bit start-of-frame pattern, §4.7.
pub const START_PATTERN: u8 = 0b1010_1100;
/// 8-bit end-of-frame pattern, §4.7.
pub const STOP_PATTERN: u8 = 0b0011_0101;
/// Default normalized-correlation threshold for declaring sync found.
pub const DEFAULT_SYNC_THRESHOLD: f32 = 0.7;

/// Frame-sync progress, §4.7's state machine. Exposed for diagnostics/tests;
/// `receive` drives it internally and returns only the terminal outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Searching,
    Found { start_idx: usize },
    HaveLength { length: u16 },
    Verified { length: u16 },
    Emit,
}

/// Find the symbol-timing offset `o* in [0, sps)` that maximizes energy of
/// the strobed samples, §4.7 step 2.
pub fn best_offset(matched: &[Complex32], sps: usize) -> usize {
    (0..sps)
        .max_by(|&a, &b| {
            let energy = |o: usize| -> f32 {
                matched.iter().skip(o).step_by(sps).map(|s| s.norm_sqr()).sum()
            };
            energy(a).partial_cmp(&energy(b)).unwrap()
        })
        .unwrap_or(0)
}

/// Downsample at the recovered offset, §4.7 step 3.
pub fn downsample(matched: &[Complex32], offset: usize, sps: usize) -> Vec<Complex32> {
    matched.iter().skip(offset).step_by(sps).copied().collect()
}

/// Correlate a bit stream (mapped to +-1) against `pattern`, returning the
/// index of the best match and its normalized correlation, §4.7 step 5.
fn correlate_pattern(bits: &[u8], pattern: u8) -> (usize, f32) {
    let pattern_bits: Vec<i8> = (0..8).rev().map(|i| if (pattern >> i) & 1 == 1 { 1 } else { -1 }).collect();
    let mapped: Vec<i8> = bits.iter().map(|&b| if b == 1 { 1 } else { -1 }).collect();

    let mut best_idx = 0;
    let mut best_score = f32::MIN;
    for start in 0..=mapped.len().saturating_sub(8) {
        let score: i32 = mapped[start..start + 8]
            .iter()
            .zip(&pattern_bits)
            .map(|(&a, &b)| (a as i32) * (b as i32))
            .sum();
        let normalized = score as f32 / 8.0;
        if normalized > best_score {
            best_score = normalized;
            best_idx = start;
        }
    }
    (best_idx, best_score)
}

/// Run the full receive chain: matched filter -> timing recovery ->
/// downsample -> hard demodulate -> sync search -> length -> payload ->
/// stop check -> byte repack, §4.7 steps 1-9.
pub fn receive(
    signal: &[Complex32],
    rrc_taps: &[f64],
    scheme: Scheme,
    sps: usize,
    sync_threshold: f32,
) -> Result<Vec<u8>, SyncError> {
    let signal64: Vec<num_complex::Complex64> =
        signal.iter().map(|c| num_complex::Complex64::new(c.re as f64, c.im as f64)).collect();
    let matched64 = apply_rrc(&signal64, rrc_taps);
    let matched: Vec<Complex32> =
        matched64.iter().map(|c| Complex32::new(c.re as f32, c.im as f32)).collect();

    let offset = best_offset(&matched, sps);
    let symbols = downsample(&matched, offset, sps);
    let symbols64: Vec<num_complex::Complex64> =
        symbols.iter().map(|c| num_complex::Complex64::new(c.re as f64, c.im as f64)).collect();
    let bits = demodulate_hard(&symbols64, scheme);

    let mut state = SyncState::Searching;
    let mut payload_start = 0usize;
    let mut stop_start = 0usize;

    loop {
        state = match state {
            SyncState::Searching => {
                let (start_idx, score) = correlate_pattern(&bits, START_PATTERN);
                if score < sync_threshold {
                    return Err(SyncError::SyncLost { threshold: sync_threshold });
                }
                SyncState::Found { start_idx }
            }
            SyncState::Found { start_idx } => {
                let length_start = start_idx + 8;
                if bits.len() < length_start + 16 {
                    return Err(SyncError::InsufficientBits { required: length_start + 16, available: bits.len() });
                }
                let length = bits_to_u16(&bits[length_start..length_start + 16]);
                payload_start = length_start + 16;
                SyncState::HaveLength { length }
            }
            SyncState::HaveLength { length } => {
                let payload_bits_len = 8 * length as usize;
                stop_start = payload_start + payload_bits_len;
                if bits.len() < stop_start + 8 {
                    return Err(SyncError::InsufficientBits { required: stop_start + 8, available: bits.len() });
                }
                let stop_byte = bits_to_u8(&bits[stop_start..stop_start + 8]);
                if stop_byte != STOP_PATTERN {
                    return Err(SyncError::StopMismatch { expected: STOP_PATTERN, actual: stop_byte });
                }
                SyncState::Verified { length }
            }
            SyncState::Verified { .. } => SyncState::Emit,
            SyncState::Emit => break,
        };
    }

    Ok(pack_bits_to_bytes(&bits[payload_start..stop_start]))
}

fn bits_to_u16(bits: &[u8]) -> u16 {
    bits.iter().fold(0u16, |acc, &b| (acc << 1) | b as u16)
}

fn bits_to_u8(bits: &[u8]) -> u8 {
    bits.iter().fold(0u8, |acc, &b| (acc << 1) | b)
}

/// Pad the final partial byte with zeros rather than truncating, §4.7 step 9.
fn pack_bits_to_bytes(bits: &[u8]) -> Vec<u8> {
    let mut padded = bits.to_vec();
    let remainder = padded.len() % 8;
    if remainder != 0 {
        padded.extend(std::iter::repeat(0u8).take(8 - remainder));
    }
    pack_bits(&padded)
}

/// Build a transmit frame: START ‖ length(16) ‖ payload bits ‖ STOP, as bits,
/// ready for `modulate`. Used by the pipeline driver's transmit side and by
/// tests constructing synthetic receive signals.
pub fn frame_bits(payload: &[u8]) -> Vec<u8> {
    let mut bits = Vec::with_capacity(8 + 16 + payload.len() * 8 + 8);
    bits.extend(bytes_to_bits(&[START_PATTERN]));
    bits.extend(u16_to_bits(payload.len() as u16));
    bits.extend(bytes_to_bits(payload));
    bits.extend(bytes_to_bits(&[STOP_PATTERN]));
    bits
}

fn u16_to_bits(value: u16) -> [u8; 16] {
    let mut bits = [0u8; 16];
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = ((value >> (15 - i)) & 1) as u8;
    }
    bits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal_processing::filters::{pulse_shape, rrc_taps};
    use crate::signal_processing::modulation::modulate;

    fn roundtrip(payload: &[u8], scheme: Scheme, sync_threshold: f32) -> Result<Vec<u8>, SyncError> {
        let sps = 8;
        let taps = rrc_taps(0.35, 6, sps).unwrap();
        let bits = frame_bits(payload);
        let symbols = modulate(&bits, scheme);
        let symbols32: Vec<Complex32> = symbols.iter().map(|s| Complex32::new(s.re as f32, s.im as f32)).collect();
        let symbols64: Vec<num_complex::Complex64> =
            symbols32.iter().map(|c| num_complex::Complex64::new(c.re as f64, c.im as f64)).collect();
        let shaped64 = pulse_shape(&symbols64, &taps, sps);
        let shaped: Vec<Complex32> = shaped64.iter().map(|c| Complex32::new(c.re as f32, c.im as f32)).collect();
        receive(&shaped, &taps, scheme, sps, sync_threshold)
    }

    #[test]
    fn p5_clean_frame_sync_recovers_payload() {
        let payload = b"Hello".to_vec();
        let recovered = roundtrip(&payload, Scheme::Qpsk, DEFAULT_SYNC_THRESHOLD).unwrap();
        assert_eq!(recovered, payload);
    }

    #[test]
    fn scenario_6_missing_sync_pattern_errors() {
        let sps = 8;
        let taps = rrc_taps(0.35, 6, sps).unwrap();
        // Random noise, no sync pattern present.
        let noise: Vec<Complex32> = (0..400).map(|i| Complex32::new((i as f32).sin(), (i as f32 * 0.7).cos())).collect();
        let err = receive(&noise, &taps, Scheme::Qpsk, sps, DEFAULT_SYNC_THRESHOLD).unwrap_err();
        assert!(matches!(err, SyncError::SyncLost { .. }));
    }

    #[test]
    fn best_offset_picks_strobe_aligned_with_symbols() {
        let sps = 4;
        let mut matched = vec![Complex32::new(0.0, 0.0); 16];
        for k in 0..4 {
            matched[k * sps + 1] = Complex32::new(1.0, 0.0);
        }
        assert_eq!(best_offset(&matched, sps), 1);
    }

    #[test]
    fn frame_bits_round_trips_through_bit_packing() {
        let payload = b"AB".to_vec();
        let bits = frame_bits(&payload);
        assert_eq!(bits.len(), 8 + 16 + 16 + 8);
        assert_eq!(bits_to_u8(&bits[0..8]), START_PATTERN);
        assert_eq!(bits_to_u16(&bits[8..24]), 2);
        assert_eq!(bits_to_u8(&bits[bits.len() - 8..]), STOP_PATTERN);
    }
}
