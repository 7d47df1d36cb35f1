//! Wireless channel model: fading, multipath, AWGN (§3, §4.6).
//!
//! Grounded in `original_source/simurf/channel.py`'s `ChannelModel`
//! (`_generate_rayleigh_fading`, `_generate_rician_fading`,
//! `_apply_multipath`, `_add_awgn_noise`), translated from global
//! `numpy.random` state to an owned `ChaCha8Rng` (§5: "PRNG owned by
//! Channel, no sharing") and from a stateful Python object tracking
//! lifetime stats to a value carrying only its configuration and RNG.

use num_complex::{Complex32, Complex64};
use rand::RngCore;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use std::f64::consts::PI;

/// Fading/multipath model selection (§3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Model {
    Awgn,
    Rayleigh,
    Rician { k_factor: f64 },
}

/// Number of sinusoids in the Jakes' sum-of-sinusoids fading generator (§4.6).
const JAKES_N: usize = 16;

/// Channel parameters and owned PRNG state (§3, §5).
pub struct Channel {
    pub model: Model,
    pub snr_db: f64,
    pub doppler_hz: f64,
    pub delay_spread_s: f64,
    rng: ChaCha8Rng,
}

impl Channel {
    pub fn new(model: Model, snr_db: f64, doppler_hz: f64, delay_spread_s: f64, rng: ChaCha8Rng) -> Self {
        Self { model, snr_db, doppler_hz, delay_spread_s, rng }
    }

    /// Apply fading, then multipath, then AWGN, in that order (§4.6).
    /// Fading state is regenerated per call; no cross-call carryover (§4.6 note 1).
    pub fn apply(&mut self, signal: &[Complex32], sample_rate_hz: f64) -> Vec<Complex32> {
        let mut samples: Vec<Complex64> =
            signal.iter().map(|c| Complex64::new(c.re as f64, c.im as f64)).collect();

        if matches!(self.model, Model::Rayleigh | Model::Rician { .. }) {
            samples = self.apply_fading(&samples, sample_rate_hz);
        }

        if self.delay_spread_s > 0.0 {
            samples = self.apply_multipath(&samples, sample_rate_hz);
        }

        samples = self.apply_awgn(&samples);

        samples.into_iter().map(|c| Complex32::new(c.re as f32, c.im as f32)).collect()
    }

    fn apply_fading(&mut self, signal: &[Complex64], sample_rate_hz: f64) -> Vec<Complex64> {
        let dt = 1.0 / sample_rate_hz;
        let fading: Vec<Complex64> = match self.model {
            Model::Rayleigh => self.jakes_rayleigh(signal.len(), dt),
            Model::Rician { k_factor } => {
                let rayleigh = self.jakes_rayleigh(signal.len(), dt);
                let los = (k_factor / (k_factor + 1.0)).sqrt();
                let nlos_scale = (1.0 / (k_factor + 1.0)).sqrt();
                rayleigh.into_iter().map(|h| Complex64::new(los, 0.0) + h * nlos_scale).collect()
            }
            Model::Awgn => return signal.to_vec(),
        };
        signal.iter().zip(&fading).map(|(&s, &h)| s * h).collect()
    }

    /// Jakes' sum of `JAKES_N` sinusoids, §4.6 note 1.
    fn jakes_rayleigh(&mut self, len: usize, dt: f64) -> Vec<Complex64> {
        let phases: Vec<f64> = (0..JAKES_N).map(|_| self.uniform_phase()).collect();
        let freqs: Vec<f64> = (0..JAKES_N)
            .map(|n| self.doppler_hz * (2.0 * PI * n as f64 / JAKES_N as f64).cos())
            .collect();

        (0..len)
            .map(|i| {
                let t = i as f64 * dt;
                let mut h = Complex64::new(0.0, 0.0);
                for n in 0..JAKES_N {
                    let angle = 2.0 * PI * freqs[n] * t + phases[n];
                    h += Complex64::new(angle.cos(), angle.sin());
                }
                h / (JAKES_N as f64).sqrt()
            })
            .collect()
    }

    fn uniform_phase(&mut self) -> f64 {
        (self.rng.next_u32() as f64 / u32::MAX as f64) * 2.0 * PI
    }

    /// Exponential power-delay-profile multipath, §4.6 note 2.
    fn apply_multipath(&mut self, signal: &[Complex64], sample_rate_hz: f64) -> Vec<Complex64> {
        let rms_samples = self.delay_spread_s * sample_rate_hz;
        let max_delay_samples = (rms_samples * 5.0).round() as usize;
        if max_delay_samples == 0 {
            return signal.to_vec();
        }

        let powers: Vec<f64> = (0..max_delay_samples).map(|k| (-(k as f64) / rms_samples).exp()).collect();
        let total: f64 = powers.iter().sum();
        let powers: Vec<f64> = powers.into_iter().map(|p| p / total).collect();

        let taps: Vec<Complex64> = powers
            .iter()
            .map(|&p| {
                let re: f64 = StandardNormal.sample(&mut self.rng);
                let im: f64 = StandardNormal.sample(&mut self.rng);
                Complex64::new(re, im) * (p.sqrt() / std::f64::consts::SQRT_2)
            })
            .collect();

        convolve_same(signal, &taps)
    }

    /// AWGN sized from measured signal power and configured SNR, §4.6 note 3.
    fn apply_awgn(&mut self, signal: &[Complex64]) -> Vec<Complex64> {
        let signal_power: f64 = signal.iter().map(|c| c.norm_sqr()).sum::<f64>() / signal.len().max(1) as f64;
        let snr_linear = 10f64.powf(self.snr_db / 10.0);
        let noise_power = signal_power / snr_linear;
        let noise_std = (noise_power / 2.0).sqrt();

        signal
            .iter()
            .map(|&s| {
                let re: f64 = Distribution::<f64>::sample(&StandardNormal, &mut self.rng) * noise_std;
                let im: f64 = Distribution::<f64>::sample(&StandardNormal, &mut self.rng) * noise_std;
                s + Complex64::new(re, im)
            })
            .collect()
    }

    /// Byte-level channel approximation for the "byte mode" receive path
    /// (§4.7, "simpler receiver"): flips each bit independently with
    /// probability `ber`.
    pub fn apply_bitflip(payload: &mut [u8], ber: f64, rng: &mut impl RngCore) {
        for byte in payload.iter_mut() {
            for bit in 0..8u8 {
                if (rng.next_u32() as f64 / u32::MAX as f64) < ber {
                    *byte ^= 1 << bit;
                }
            }
        }
    }
}

/// Bit-error rate of an equivalent BPSK link at `snr_db`, used by the
/// byte-mode receive path's bit-flip approximation (§4.7: "flipping random
/// bits at the equivalent BER").
pub fn equivalent_ber(snr_db: f64) -> f64 {
    let snr_linear = 10f64.powf(snr_db / 10.0);
    0.5 * erfc(snr_linear.sqrt())
}

/// Abramowitz & Stegun 7.1.26 rational approximation to erfc, |error| < 1.5e-7.
fn erfc(x: f64) -> f64 {
    let x = x.abs();
    let t = 1.0 / (1.0 + 0.3275911 * x);
    let poly = t * (0.254829592 + t * (-0.284496736 + t * (1.421413741 + t * (-1.453152027 + t * 1.061405429))));
    poly * (-x * x).exp()
}

/// "Same"-length complex convolution, zero-padded boundaries.
fn convolve_same(signal: &[Complex64], kernel: &[Complex64]) -> Vec<Complex64> {
    let half = kernel.len() / 2;
    (0..signal.len())
        .map(|i| {
            let mut acc = Complex64::new(0.0, 0.0);
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

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn channel(model: Model, snr_db: f64) -> Channel {
        Channel::new(model, snr_db, 50.0, 0.0, ChaCha8Rng::seed_from_u64(1))
    }

    #[test]
    fn p7_awgn_noise_power_matches_snr() {
        let snr_db = 10.0;
        let mut ch = channel(Model::Awgn, snr_db);
        let signal: Vec<Complex32> = (0..20_000).map(|_| Complex32::new(1.0, 0.0)).collect();
        let out = ch.apply(&signal, 1_000_000.0);

        let measured_noise_power: f64 = out
            .iter()
            .zip(&signal)
            .map(|(o, s)| (o - s).norm_sqr() as f64)
            .sum::<f64>()
            / out.len() as f64;

        let expected = 1.0 * 10f64.powf(-snr_db / 10.0);
        let ratio = measured_noise_power / expected;
        assert!((0.9..1.1).contains(&ratio), "ratio = {ratio}");
    }

    #[test]
    fn awgn_only_skips_fading() {
        let mut ch = channel(Model::Awgn, 60.0);
        let signal = vec![Complex32::new(1.0, 0.0); 8];
        let out = ch.apply(&signal, 1_000.0);
        for (o, s) in out.iter().zip(&signal) {
            assert!((o - s).norm() < 0.5);
        }
    }

    #[test]
    fn rayleigh_fading_preserves_length() {
        let mut ch = channel(Model::Rayleigh, 30.0);
        let signal = vec![Complex32::new(1.0, 0.0); 64];
        let out = ch.apply(&signal, 10_000.0);
        assert_eq!(out.len(), signal.len());
    }

    #[test]
    fn multipath_preserves_length() {
        let mut ch = Channel::new(Model::Awgn, 60.0, 0.0, 1e-6, ChaCha8Rng::seed_from_u64(2));
        let signal = vec![Complex32::new(1.0, 0.0); 128];
        let out = ch.apply(&signal, 1_000_000.0);
        assert_eq!(out.len(), signal.len());
    }

    #[test]
    fn bitflip_is_deterministic_given_seed() {
        let mut payload_a = b"test payload".to_vec();
        let mut payload_b = payload_a.clone();
        let mut rng_a = ChaCha8Rng::seed_from_u64(5);
        let mut rng_b = ChaCha8Rng::seed_from_u64(5);
        Channel::apply_bitflip(&mut payload_a, 0.1, &mut rng_a);
        Channel::apply_bitflip(&mut payload_b, 0.1, &mut rng_b);
        assert_eq!(payload_a, payload_b);
    }

    #[test]
    fn bitflip_zero_ber_is_noop() {
        let mut payload = b"unchanged".to_vec();
        let original = payload.clone();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        Channel::apply_bitflip(&mut payload, 0.0, &mut rng);
        assert_eq!(payload, original);
    }

    #[test]
    fn equivalent_ber_is_negligible_at_high_snr() {
        assert!(equivalent_ber(60.0) < 1e-9);
    }

    #[test]
    fn equivalent_ber_decreases_with_snr() {
        assert!(equivalent_ber(0.0) > equivalent_ber(10.0));
        assert!(equivalent_ber(10.0) > equivalent_ber(20.0));
    }
}
