//! Pure transmit/receive chain composition (§2's stage diagram, §4.8 steps
//! 2-4 minus socket I/O). `link-cli`'s `PipelineDriver` owns the sockets and
//! calls these; everything here is a pure function over typed buffers, per
//! §2's "all stages are pure functions except `Channel` and
//! `PipelineDriver`". Byte-mode and sample-mode share only the packet codec,
//! per §9's redesign note — they intentionally do not share a chain function.

use crate::cipher::Cipher;
use crate::errors::LinkError;
use crate::fec;
use crate::framesync::{self, frame_bits};
use crate::signal_processing::modulation::{modulate, Scheme};
use crate::signal_processing::filters::pulse_shape;
use num_complex::{Complex32, Complex64};
use rand::RngCore;

/// Cipher -> FEC-encode. The byte-mode chain stops here; impairment is
/// applied directly to the resulting bytes by `Channel::apply_bitflip`.
pub fn byte_mode_transmit(payload: &[u8], cipher: &Cipher, fec_r: u8, rng: &mut impl RngCore) -> Result<Vec<u8>, LinkError> {
    let ciphertext = cipher.cipher(payload, rng);
    Ok(fec::encode(&ciphertext, fec_r)?)
}

/// FEC-decode -> decipher, returning the plaintext and the FEC correction
/// count for metrics (§4.9).
pub fn byte_mode_receive(data: &[u8], cipher: &Cipher, fec_r: u8) -> Result<(Vec<u8>, usize), LinkError> {
    let (decoded, corrections) = fec::decode(data, fec_r)?;
    let plaintext = cipher.decipher(&decoded)?;
    Ok((plaintext, corrections))
}

/// Cipher -> FEC-encode -> frame -> modulate -> pulse-shape, narrowed to the
/// `Complex32` wire representation (§3).
pub fn sample_mode_transmit(
    payload: &[u8],
    cipher: &Cipher,
    fec_r: u8,
    scheme: Scheme,
    rrc_taps: &[f64],
    samples_per_symbol: usize,
    rng: &mut impl RngCore,
) -> Result<Vec<Complex32>, LinkError> {
    let ciphertext = cipher.cipher(payload, rng);
    let encoded = fec::encode(&ciphertext, fec_r)?;
    let bits = frame_bits(&encoded);
    let symbols: Vec<Complex64> = modulate(&bits, scheme);
    let shaped = pulse_shape(&symbols, rrc_taps, samples_per_symbol);
    Ok(shaped.into_iter().map(|c| Complex32::new(c.re as f32, c.im as f32)).collect())
}

/// Matched filter -> timing recovery -> demodulate -> frame sync ->
/// FEC-decode -> decipher, returning plaintext and the FEC correction count.
pub fn sample_mode_receive(
    signal: &[Complex32],
    cipher: &Cipher,
    fec_r: u8,
    scheme: Scheme,
    rrc_taps: &[f64],
    samples_per_symbol: usize,
    sync_threshold: f32,
) -> Result<(Vec<u8>, usize), LinkError> {
    let encoded = framesync::receive(signal, rrc_taps, scheme, samples_per_symbol, sync_threshold)?;
    let (decoded, corrections) = fec::decode(&encoded, fec_r)?;
    let plaintext = cipher.decipher(&decoded)?;
    Ok((plaintext, corrections))
}
