//! Complex Morlet wavelet bank.
//!
//! For centre frequency `f` and `n` cycles (as `mne.time_frequency.morlet`):
//!
//! ```text
//!   σ_t  = n / (2π f)
//!   t    ∈ [−5σ_t, 5σ_t]  sampled at 1/sfreq, symmetric around 0
//!   W(t) = exp(2πi f t) · exp(−t² / (2σ_t²))
//! ```
//!
//! With `zero_mean` the admissibility offset `exp(−2(π f σ_t)²)` is
//! subtracted from the oscillation.  Every wavelet is scaled to unit energy
//! (`Σ |W|² = 1`).
use std::f64::consts::PI;

use rustfft::num_complex::Complex64;

use crate::error::{config_bail, degenerate_bail, Result};

/// Support of each wavelet, in standard deviations either side of 0.
pub const SUPPORT_SIGMAS: f64 = 5.0;

/// Cycle count rule for a set of frequencies.
#[derive(Debug, Clone, PartialEq)]
pub enum NCycles {
    /// The same number of cycles at every frequency (wavelet duration
    /// shrinks as `1/f`).
    Fixed(f64),
    /// One value per frequency.
    PerFrequency(Vec<f64>),
    /// `f / divisor` cycles, giving every wavelet the same duration.
    Proportional(f64),
}

impl NCycles {
    /// Cycle count for each entry of `freqs`.
    pub fn resolve(&self, freqs: &[f64]) -> Result<Vec<f64>> {
        let cycles = match self {
            NCycles::Fixed(n) => vec![*n; freqs.len()],
            NCycles::PerFrequency(v) => {
                if v.len() != freqs.len() {
                    config_bail!("{} cycle counts for {} frequencies", v.len(), freqs.len());
                }
                v.clone()
            }
            NCycles::Proportional(divisor) => {
                if !divisor.is_finite() || *divisor <= 0.0 {
                    config_bail!("cycle divisor must be positive, got {divisor}");
                }
                freqs.iter().map(|f| f / divisor).collect()
            }
        };
        if let Some((f, n)) = freqs
            .iter()
            .zip(&cycles)
            .find(|(_, n)| !n.is_finite() || **n <= 0.0)
        {
            config_bail!("n_cycles must be positive, got {n} at {f} Hz");
        }
        Ok(cycles)
    }
}

/// One complex Morlet wavelet.
#[derive(Debug, Clone)]
pub struct Wavelet {
    pub freq: f64,
    pub n_cycles: f64,
    /// Gaussian standard deviation in seconds.
    pub sigma_t: f64,
    /// Odd-length, centred on the middle sample.
    pub samples: Vec<Complex64>,
}

impl Wavelet {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Samples on either side of the centre.  Output samples closer than
    /// this to an epoch boundary are affected by the zero padding.
    pub fn half_width(&self) -> usize {
        (self.samples.len() - 1) / 2
    }
}

/// Build one unit-energy Morlet wavelet.
fn morlet(sfreq: f64, freq: f64, n_cycles: f64, zero_mean: bool) -> Wavelet {
    let sigma_t = n_cycles / (2.0 * PI * freq);
    let n_half = ((SUPPORT_SIGMAS * sigma_t * sfreq).ceil() as usize).max(1);
    let offset = if zero_mean {
        (-2.0 * (PI * freq * sigma_t).powi(2)).exp()
    } else {
        0.0
    };

    let mut samples: Vec<Complex64> = (0..2 * n_half - 1)
        .map(|i| {
            let t = (i as f64 - (n_half - 1) as f64) / sfreq;
            let osc = Complex64::from_polar(1.0, 2.0 * PI * freq * t) - offset;
            osc * (-(t * t) / (2.0 * sigma_t * sigma_t)).exp()
        })
        .collect();

    let norm = samples.iter().map(|c| c.norm_sqr()).sum::<f64>().sqrt();
    for c in samples.iter_mut() {
        *c /= norm;
    }
    Wavelet { freq, n_cycles, sigma_t, samples }
}

/// An ordered family of Morlet wavelets sharing one sampling rate.
#[derive(Debug, Clone)]
pub struct WaveletBank {
    sfreq: f64,
    wavelets: Vec<Wavelet>,
}

impl WaveletBank {
    /// One wavelet per entry of `freqs`.
    ///
    /// # Errors
    ///
    /// * `Configuration`: empty or non-positive frequencies, non-positive
    ///   cycle counts, wrong number of per-frequency cycle counts, or a
    ///   non-positive sampling rate.
    /// * `NumericalDegeneracy`: a frequency at or above Nyquist.
    pub fn morlet(sfreq: f64, freqs: &[f64], n_cycles: &NCycles, zero_mean: bool) -> Result<Self> {
        if !sfreq.is_finite() || sfreq <= 0.0 {
            config_bail!("sampling rate must be positive, got {sfreq}");
        }
        if freqs.is_empty() {
            config_bail!("no frequencies given");
        }
        let nyquist = sfreq / 2.0;
        for &f in freqs {
            if !f.is_finite() || f <= 0.0 {
                config_bail!("wavelet frequencies must be positive, got {f}");
            }
            if f >= nyquist {
                degenerate_bail!("wavelet frequency {f} Hz is not below Nyquist ({nyquist} Hz)");
            }
        }
        let cycles = n_cycles.resolve(freqs)?;
        let wavelets = freqs
            .iter()
            .zip(cycles)
            .map(|(&f, n)| morlet(sfreq, f, n, zero_mean))
            .collect();
        Ok(Self { sfreq, wavelets })
    }

    pub fn sfreq(&self) -> f64 {
        self.sfreq
    }

    pub fn wavelets(&self) -> &[Wavelet] {
        &self.wavelets
    }

    pub fn freqs(&self) -> Vec<f64> {
        self.wavelets.iter().map(|w| w.freq).collect()
    }

    pub fn len(&self) -> usize {
        self.wavelets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelets.is_empty()
    }

    /// Length of the longest wavelet (the lowest-frequency one for fixed
    /// cycle counts).
    pub fn max_len(&self) -> usize {
        self.wavelets.iter().map(Wavelet::len).max().unwrap_or(0)
    }
}

/// `n` logarithmically spaced frequencies from `fmin` to `fmax` inclusive.
pub fn log_freqs(fmin: f64, fmax: f64, n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![fmin],
        _ => {
            let ratio = fmax / fmin;
            let mut f: Vec<f64> = (0..n)
                .map(|i| fmin * ratio.powf(i as f64 / (n - 1) as f64))
                .collect();
            f[n - 1] = fmax;
            f
        }
    }
}
