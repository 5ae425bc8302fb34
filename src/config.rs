//! Estimator configuration.
//!
//! Each estimator takes one plain struct of `pub` fields with a `Default`
//! impl, so callers override only what they need:
//!
//! ```
//! use exg_spectral::{Average, WelchConfig};
//!
//! let cfg = WelchConfig {
//!     fmin: 2.0,
//!     fmax: 40.0,
//!     n_per_seg: Some(100),
//!     overlap: 0.5,
//!     average: Average::Median,
//!     ..WelchConfig::default()
//! };
//! ```
//!
//! No field is validated here; every estimator checks its configuration
//! against the data before doing any work.
use crate::error::Result;
use crate::psd::Average;
use crate::taper::WindowKind;
use crate::tfr::{log_freqs, NCycles, WaveletBank};

/// Welch PSD parameters.
#[derive(Debug, Clone)]
pub struct WelchConfig {
    /// Lowest frequency kept in the output, Hz.
    ///
    /// Default: `0.0`.
    pub fmin: f64,

    /// Highest frequency kept in the output, Hz.
    ///
    /// `f64::INFINITY` means "up to Nyquist"; any finite value above the
    /// Nyquist frequency is an error.
    ///
    /// Default: `f64::INFINITY`.
    pub fmax: f64,

    /// Segment length in samples.
    ///
    /// `None` uses `min(256, n_times)`.
    ///
    /// Default: `None`.
    pub n_per_seg: Option<usize>,

    /// FFT length in samples, `≥ n_per_seg`.  Longer transforms zero-pad
    /// each segment and interpolate the spectrum; the frequency spacing
    /// becomes `sfreq / n_fft`.
    ///
    /// `None` uses `n_per_seg`.
    ///
    /// Default: `None`.
    pub n_fft: Option<usize>,

    /// Fractional overlap between consecutive segments, in `[0, 1)`.
    ///
    /// Default: `0.0`.
    pub overlap: f64,

    /// Window applied to every segment.
    ///
    /// Default: [`WindowKind::Hann`].
    pub window: WindowKind,

    /// How per-segment periodograms are combined.
    ///
    /// Default: [`Average::Mean`].
    pub average: Average,
}

impl Default for WelchConfig {
    fn default() -> Self {
        Self {
            fmin: 0.0,
            fmax: f64::INFINITY,
            n_per_seg: None,
            n_fft: None,
            overlap: 0.0,
            window: WindowKind::Hann,
            average: Average::Mean,
        }
    }
}

/// Multitaper PSD parameters.
#[derive(Debug, Clone)]
pub struct MultitaperConfig {
    /// Lowest frequency kept in the output, Hz.  Default: `0.0`.
    pub fmin: f64,

    /// Highest frequency kept, Hz.  `f64::INFINITY` means Nyquist.
    /// Default: `f64::INFINITY`.
    pub fmax: f64,

    /// Full spectral bandwidth of the tapers in Hz.
    ///
    /// The time half-bandwidth product is `bandwidth · n_times / (2 · sfreq)`
    /// and `⌊2·N·W⌋` tapers are computed.  `None` uses `N·W = 4`.
    ///
    /// Default: `None`.
    pub bandwidth: Option<f64>,

    /// Use Thomson's adaptive weights instead of fixed eigenvalue weights.
    ///
    /// Default: `false`.
    pub adaptive: bool,

    /// Drop tapers whose concentration ratio is `≤ 0.9`.
    ///
    /// Default: `true`.
    pub low_bias: bool,
}

impl Default for MultitaperConfig {
    fn default() -> Self {
        Self {
            fmin: 0.0,
            fmax: f64::INFINITY,
            bandwidth: None,
            adaptive: false,
            low_bias: true,
        }
    }
}

/// Morlet time-frequency parameters.
#[derive(Debug, Clone)]
pub struct MorletConfig {
    /// Centre frequencies in Hz, one wavelet each.
    ///
    /// Default: 8 log-spaced frequencies from 6 to 35 Hz.
    pub freqs: Vec<f64>,

    /// Cycle count rule.
    ///
    /// Default: [`NCycles::Proportional(2.0)`](NCycles::Proportional), i.e.
    /// `freq / 2` cycles, which makes every wavelet ≈ 0.8 s long (±5·σ_t).
    pub n_cycles: NCycles,

    /// Subtract the Morlet admissibility offset so each wavelet has zero mean.
    ///
    /// Default: `false`.
    pub zero_mean: bool,

    /// Keep every `decim`-th output time sample.
    ///
    /// Default: `1` (no decimation).
    pub decim: usize,

    /// Also compute inter-trial coherence.
    ///
    /// Default: `true`.
    pub return_itc: bool,
}

impl Default for MorletConfig {
    fn default() -> Self {
        Self {
            freqs: log_freqs(6.0, 35.0, 8),
            n_cycles: NCycles::Proportional(2.0),
            zero_mean: false,
            decim: 1,
            return_itc: true,
        }
    }
}

impl MorletConfig {
    /// Build the wavelet bank for data sampled at `sfreq`.
    pub fn bank(&self, sfreq: f64) -> Result<WaveletBank> {
        WaveletBank::morlet(sfreq, &self.freqs, &self.n_cycles, self.zero_mean)
    }
}
