//! Dependency-injected numeric backend (§9 redesign note: "replace the
//! ambient numeric-library dependency for convolution/RNG with an explicit
//! trait; provide a default implementation, let tests swap in a stub").
//!
//! `StdDsp` wraps the same direct-form convolution and Gaussian sampling
//! already used inline by `signal_processing::filters::convolve` and
//! `channel::Channel`; those call sites stay as-is (they own their own RNG
//! state per §5), `Dsp` exists for callers that want to swap the backend
//! without threading a generic through every function signature.

use crate::errors::DspError;
use rand::RngCore;
use rand_distr::{Distribution, StandardNormal};

pub trait Dsp {
    fn conv_same(&self, signal: &[f32], kernel: &[f32]) -> Result<Vec<f32>, DspError>;
    fn randn(&self, rng: &mut dyn RngCore, n: usize) -> Vec<f64>;
}

/// Default backend: direct-form convolution, `rand_distr::StandardNormal`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDsp;

impl Dsp for StdDsp {
    fn conv_same(&self, signal: &[f32], kernel: &[f32]) -> Result<Vec<f32>, DspError> {
        if signal.is_empty() {
            return Err(DspError::EmptySignal { stage: "conv_same" });
        }
        let half = kernel.len() / 2;
        Ok((0..signal.len())
            .map(|i| {
                let mut acc = 0.0f32;
                for (j, &k) in kernel.iter().enumerate() {
                    let idx = i as i64 + j as i64 - half as i64;
                    if idx >= 0 && (idx as usize) < signal.len() {
                        acc += signal[idx as usize] * k;
                    }
                }
                acc
            })
            .collect())
    }

    fn randn(&self, rng: &mut dyn RngCore, n: usize) -> Vec<f64> {
        (0..n).map(|_| StandardNormal.sample(rng)).collect()
    }
}
