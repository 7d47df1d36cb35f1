//! BPSK / QPSK / 16-QAM modulation and demodulation (§3, §4.4).
//!
//! Constellation tables follow the same shape as the teacher's
//! `protocol::QPSKConstellation` (`(bits, Complex64)` pairs with a
//! minimum-distance `symbol_to_bits` search), generalized from QPSK-only to
//! the three schemes named in §4.4.

use num_complex::Complex64;

/// A modulation scheme, §4.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Bpsk,
    Qpsk,
    Qam16,
}

impl Scheme {
    pub fn bits_per_symbol(self) -> usize {
        match self {
            Scheme::Bpsk => 1,
            Scheme::Qpsk => 2,
            Scheme::Qam16 => 4,
        }
    }

    /// The full constellation as (Gray bit pattern, ideal point) pairs.
    /// Average symbol power is normalized to 1 for each scheme (§3 I6).
    fn constellation(self) -> Vec<(Vec<u8>, Complex64)> {
        match self {
            Scheme::Bpsk => vec![
                (vec![0], Complex64::new(1.0, 0.0)),
                (vec![1], Complex64::new(-1.0, 0.0)),
            ],
            Scheme::Qpsk => {
                let s = std::f64::consts::FRAC_1_SQRT_2;
                (0..4)
                    .map(|v| {
                        let b0 = (v >> 1) & 1;
                        let b1 = v & 1;
                        let i = (1 - 2 * b0 as i32) as f64 * s;
                        let q = (1 - 2 * b1 as i32) as f64 * s;
                        (vec![b0, b1], Complex64::new(i, q))
                    })
                    .collect()
            }
            Scheme::Qam16 => {
                let scale = 1.0 / 10f64.sqrt();
                (0..16)
                    .map(|v| {
                        let b0 = ((v >> 3) & 1) as u8;
                        let b1 = ((v >> 2) & 1) as u8;
                        let b2 = ((v >> 1) & 1) as u8;
                        let b3 = (v & 1) as u8;
                        let i = gray2_to_level(b0, b1) * scale;
                        let q = gray2_to_level(b2, b3) * scale;
                        (vec![b0, b1, b2, b3], Complex64::new(i, q))
                    })
                    .collect()
            }
        }
    }
}

/// Gray-coded 2-bit to PAM-4 level mapping: 00->-3, 01->-1, 11->+1, 10->+3.
/// Adjacent levels differ by exactly one bit.
fn gray2_to_level(msb: u8, lsb: u8) -> f64 {
    match (msb, lsb) {
        (0, 0) => -3.0,
        (0, 1) => -1.0,
        (1, 1) => 1.0,
        (1, 0) => 3.0,
        _ => unreachable!(),
    }
}

/// Modulate a bit sequence into symbols, zero-padding to a multiple of
/// `bits_per_symbol` if needed (§4.4).
pub fn modulate(bits: &[u8], scheme: Scheme) -> Vec<Complex64> {
    let bps = scheme.bits_per_symbol();
    let table = scheme.constellation();

    let mut padded = bits.to_vec();
    let remainder = padded.len() % bps;
    if remainder != 0 {
        padded.extend(std::iter::repeat(0u8).take(bps - remainder));
    }

    padded
        .chunks(bps)
        .map(|chunk| {
            table
                .iter()
                .find(|(pattern, _)| pattern.as_slice() == chunk)
                .map(|(_, point)| *point)
                .expect("chunk matches a constellation pattern by construction")
        })
        .collect()
}

/// Hard-decision demodulation: nearest constellation point per symbol.
pub fn demodulate_hard(symbols: &[Complex64], scheme: Scheme) -> Vec<u8> {
    let table = scheme.constellation();
    symbols
        .iter()
        .flat_map(|&symbol| nearest(&table, symbol).0.clone())
        .collect()
}

/// Soft-decision demodulation: per-bit log-likelihood ratios via max-log
/// approximation (min squared distance among symbols with bit=1 minus min
/// among bit=0, scaled by `1 / (2 * noise_variance)`). Exact for QPSK (§4.4
/// requires QPSK soft decisions); implemented generically for BPSK/16-QAM too.
pub fn demodulate_soft(symbols: &[Complex64], scheme: Scheme, noise_variance: f64) -> Vec<f64> {
    let table = scheme.constellation();
    let bps = scheme.bits_per_symbol();
    let mut llrs = Vec::with_capacity(symbols.len() * bps);

    for &symbol in symbols {
        for bit_pos in 0..bps {
            let (mut min0, mut min1) = (f64::INFINITY, f64::INFINITY);
            for (pattern, point) in &table {
                let dist = (symbol - point).norm_sqr();
                if pattern[bit_pos] == 0 {
                    min0 = min0.min(dist);
                } else {
                    min1 = min1.min(dist);
                }
            }
            // Positive LLR favors bit=0.
            llrs.push((min1 - min0) / (2.0 * noise_variance.max(1e-12)));
        }
    }

    llrs
}

fn nearest(table: &[(Vec<u8>, Complex64)], symbol: Complex64) -> &(Vec<u8>, Complex64) {
    table
        .iter()
        .min_by(|a, b| {
            (symbol - a.1)
                .norm_sqr()
                .partial_cmp(&(symbol - b.1).norm_sqr())
                .unwrap()
        })
        .expect("constellation is non-empty")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn average_power(scheme: Scheme) -> f64 {
        let table = scheme.constellation();
        table.iter().map(|(_, p)| p.norm_sqr()).sum::<f64>() / table.len() as f64
    }

    #[test]
    fn i6_average_power_normalized_to_one() {
        for scheme in [Scheme::Bpsk, Scheme::Qpsk, Scheme::Qam16] {
            let power = average_power(scheme);
            assert!((power - 1.0).abs() < 1e-9, "{:?} power = {power}", scheme);
        }
    }

    #[test]
    fn qpsk_is_gray_coded() {
        let table = Scheme::Qpsk.constellation();
        // Adjacent constellation points (by 90 degree rotation) differ by 1 bit.
        let order = [
            Complex64::new(1.0, 1.0),
            Complex64::new(-1.0, 1.0),
            Complex64::new(-1.0, -1.0),
            Complex64::new(1.0, -1.0),
        ];
        let bits_for = |target: Complex64| -> Vec<u8> {
            table
                .iter()
                .find(|(_, p)| (p.re.signum(), p.im.signum()) == (target.re.signum(), target.im.signum()))
                .unwrap()
                .0
                .clone()
        };
        for w in 0..4 {
            let a = bits_for(order[w]);
            let b = bits_for(order[(w + 1) % 4]);
            let hamming: usize = a.iter().zip(&b).filter(|(x, y)| x != y).count();
            assert_eq!(hamming, 1);
        }
    }

    #[test]
    fn bpsk_hard_round_trip() {
        let bits = vec![0, 1, 1, 0, 1];
        let symbols = modulate(&bits, Scheme::Bpsk);
        assert_eq!(demodulate_hard(&symbols, Scheme::Bpsk), bits);
    }

    #[test]
    fn modulate_pads_with_zero_bits() {
        let bits = vec![1, 0, 1]; // not a multiple of 2 for QPSK
        let symbols = modulate(&bits, Scheme::Qpsk);
        assert_eq!(symbols.len(), 2);
        let recovered = demodulate_hard(&symbols, Scheme::Qpsk);
        assert_eq!(&recovered[..3], &bits[..]);
        assert_eq!(recovered[3], 0); // padding bit
    }

    #[test]
    fn qam16_round_trip() {
        let bits: Vec<u8> = vec![1, 1, 0, 0, 0, 0, 1, 1, 1, 0, 1, 0];
        let symbols = modulate(&bits, Scheme::Qam16);
        assert_eq!(demodulate_hard(&symbols, Scheme::Qam16), bits);
    }

    #[test]
    fn soft_llr_sign_matches_hard_decision() {
        let table = Scheme::Qpsk.constellation();
        for (pattern, point) in &table {
            let llrs = demodulate_soft(&[*point], Scheme::Qpsk, 0.1);
            for (bit, &llr) in pattern.iter().zip(&llrs) {
                if *bit == 0 {
                    assert!(llr > 0.0);
                } else {
                    assert!(llr < 0.0);
                }
            }
        }
    }

    proptest! {
        #[test]
        fn p5_modulation_round_trip(bits in proptest::collection::vec(0u8..=1, 0..200)) {
            for scheme in [Scheme::Bpsk, Scheme::Qpsk, Scheme::Qam16] {
                let symbols = modulate(&bits, scheme);
                let recovered = demodulate_hard(&symbols, scheme);
                prop_assert_eq!(&recovered[..bits.len()], &bits[..]);
            }
        }
    }
}
