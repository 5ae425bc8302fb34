//! Shared FFT primitive.
//!
//! Every transform in the crate goes through one of two planned wrappers:
//!
//! - [`RealFft`]: real-to-complex forward transform (`realfft`) used by the
//!   PSD estimators, one plan per segment length.
//! - [`ComplexFft`]: complex forward/inverse pair (`rustfft`) used by the
//!   wavelet convolution.
//!
//! Plans are built once per estimator call and are `Send + Sync`, so they
//! are shared by reference across the `rayon` workers.  Each call allocates
//! its own buffers; no state is mutated through `&self`.
use std::sync::Arc;

use realfft::{RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

use crate::error::Result;

/// One-sided frequency axis for an `n_fft`-point real transform:
/// `k · sfreq / n_fft` for `k = 0..=n_fft/2`.
pub fn rfft_freqs(n_fft: usize, sfreq: f64) -> Vec<f64> {
    (0..n_fft / 2 + 1)
        .map(|k| k as f64 * sfreq / n_fft as f64)
        .collect()
}

/// Planned real-to-complex forward transform of fixed length.
pub struct RealFft {
    n_fft: usize,
    r2c: Arc<dyn RealToComplex<f64>>,
}

impl RealFft {
    pub fn new(n_fft: usize) -> Self {
        let mut planner = RealFftPlanner::<f64>::new();
        let r2c = planner.plan_fft_forward(n_fft);
        Self { n_fft, r2c }
    }

    pub fn len(&self) -> usize {
        self.n_fft
    }

    /// Number of one-sided bins, `n_fft / 2 + 1`.
    pub fn n_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Half spectrum of `x`, zero-padded (or truncated) to `n_fft`.
    pub fn spectrum(&self, x: &[f64]) -> Result<Vec<Complex64>> {
        let mut input = self.r2c.make_input_vec();
        let n = x.len().min(self.n_fft);
        input[..n].copy_from_slice(&x[..n]);
        let mut output = self.r2c.make_output_vec();
        self.r2c.process(&mut input, &mut output)?;
        Ok(output)
    }

    /// `|X_k|²` for every one-sided bin.
    pub fn power(&self, x: &[f64]) -> Result<Vec<f64>> {
        Ok(self.spectrum(x)?.iter().map(|c| c.norm_sqr()).collect())
    }
}

/// Planned complex forward/inverse transform pair of fixed length.
pub struct ComplexFft {
    n_fft: usize,
    fwd: Arc<dyn Fft<f64>>,
    inv: Arc<dyn Fft<f64>>,
}

impl ComplexFft {
    pub fn new(n_fft: usize) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        let fwd = planner.plan_fft_forward(n_fft);
        let inv = planner.plan_fft_inverse(n_fft);
        Self { n_fft, fwd, inv }
    }

    pub fn len(&self) -> usize {
        self.n_fft
    }

    /// Forward transform of a real signal zero-padded to `n_fft`.
    pub fn forward_real(&self, x: &[f64]) -> Vec<Complex64> {
        let mut buf: Vec<Complex64> = x
            .iter()
            .take(self.n_fft)
            .map(|&v| Complex64::new(v, 0.0))
            .chain(std::iter::repeat(Complex64::default()))
            .take(self.n_fft)
            .collect();
        self.fwd.process(&mut buf);
        buf
    }

    /// Forward transform of a complex sequence zero-padded to `n_fft`.
    pub fn forward(&self, x: &[Complex64]) -> Vec<Complex64> {
        let mut buf: Vec<Complex64> = x
            .iter()
            .take(self.n_fft)
            .copied()
            .chain(std::iter::repeat(Complex64::default()))
            .take(self.n_fft)
            .collect();
        self.fwd.process(&mut buf);
        buf
    }

    /// In-place inverse transform, scaled by `1 / n_fft`.
    pub fn inverse(&self, buf: &mut [Complex64]) {
        self.inv.process(buf);
        let inv_scale = 1.0 / self.n_fft as f64;
        for v in buf.iter_mut() {
            *v *= inv_scale;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn freqs_cover_dc_to_nyquist() {
        let f = rfft_freqs(100, 200.0);
        assert_eq!(f.len(), 51);
        approx::assert_abs_diff_eq!(f[0], 0.0);
        approx::assert_abs_diff_eq!(f[5], 10.0, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(f[50], 100.0, epsilon = 1e-12);
    }

    #[test]
    fn real_power_of_cosine_lands_in_one_bin() {
        let n = 64;
        let x: Vec<f64> = (0..n).map(|i| (2.0 * PI * 4.0 * i as f64 / n as f64).cos()).collect();
        let p = RealFft::new(n).power(&x).unwrap();
        // Parseval on a pure bin-centred cosine: |X_4| = n/2.
        approx::assert_abs_diff_eq!(p[4], (n as f64 / 2.0).powi(2), epsilon = 1e-6);
        for (k, &v) in p.iter().enumerate() {
            if k != 4 {
                assert!(v < 1e-12, "leak at bin {k}: {v}");
            }
        }
    }

    #[test]
    fn complex_roundtrip_restores_signal() {
        let x: Vec<f64> = (0..50).map(|i| (i as f64 * 0.3).sin()).collect();
        let fft = ComplexFft::new(64);
        let mut spec = fft.forward_real(&x);
        fft.inverse(&mut spec);
        for i in 0..50 {
            approx::assert_abs_diff_eq!(spec[i].re, x[i], epsilon = 1e-12);
            approx::assert_abs_diff_eq!(spec[i].im, 0.0, epsilon = 1e-12);
        }
        for v in &spec[50..] {
            assert!(v.norm() < 1e-12);
        }
    }
}
