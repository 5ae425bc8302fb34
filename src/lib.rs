//! # exg-spectral — spectral estimation for epoched EEG in pure Rust
//!
//! `exg-spectral` computes power spectral densities and time-frequency
//! representations of trigger-aligned epochs.  Every estimator follows the
//! conventions of [MNE-Python](https://mne.tools) / SciPy (density scaling,
//! one-sided doubling, median bias, DPSS normalisation, Morlet support), so
//! results can be compared directly with `mne.time_frequency`.
//!
//! _No Python, no BLAS, no C libraries: pure Rust + [RustFFT](https://crates.io/crates/rustfft)._
//!
//! ## Pipeline overview
//!
//! ```text
//! epochs.safetensors
//!   │
//!   ├─ EpochedSeries          [E, C, T] f64, sfreq, tmin, channel names
//!   │
//!   ├─ psd_welch()            windowed segments → periodograms → mean / median
//!   ├─ psd_multitaper()       DPSS tapers → eigenspectra → fixed / adaptive weights
//!   │     └─→ PsdResult       freqs + [E, C, F] (or [E, C, F, S] unaggregated)
//!   │
//!   └─ tfr_morlet()           Morlet bank → FFT convolution → power + ITC
//!         └─→ TfrResult       freqs, times, [C, F, T'] power / ITC
//!               └─ apply_baseline()   mean / ratio / logratio / percent / zscore / zlogratio
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use exg_spectral::{
//!     psd_welch, tfr_from_config, Baseline, BaselineMode, EpochedSeries,
//!     MorletConfig, WelchConfig,
//! };
//! use ndarray::Array3;
//!
//! // 10 epochs, 4 channels, 1 s at 200 Hz, starting 0.2 s before the trigger.
//! let data = Array3::from_shape_fn((10, 4, 200), |(_, c, t)| {
//!     ((c + 1) as f64 * 0.3 * t as f64).sin()
//! });
//! let epochs = EpochedSeries::with_default_names(data, 200.0, -0.2).unwrap();
//!
//! // Welch PSD, 0.5 s Hann segments with 50 % overlap.
//! let psd = psd_welch(&epochs, &WelchConfig {
//!     fmin: 2.0,
//!     fmax: 40.0,
//!     n_per_seg: Some(100),
//!     overlap: 0.5,
//!     ..WelchConfig::default()
//! }).unwrap();
//! println!("PSD shape {:?}", psd.shape());
//!
//! // Morlet power + ITC, dB change from the pre-stimulus interval.
//! let tfr = tfr_from_config(&epochs, &MorletConfig::default()).unwrap();
//! let db = tfr
//!     .apply_baseline(&Baseline::new(None, Some(0.0)), BaselineMode::LogRatio)
//!     .unwrap();
//! println!("TFR shape {:?}", db.power.dim());
//! ```
//!
//! ## Running individual steps
//!
//! Every building block is public:
//!
//! ```no_run
//! use exg_spectral::taper::{dpss, window, WindowKind};
//! use exg_spectral::psd::segments;
//! use exg_spectral::tfr::{cwt, log_freqs, NCycles, WaveletBank};
//!
//! let x = vec![0.0_f64; 1000];
//!
//! let hann = window(WindowKind::Hann, 256).unwrap();
//! let segs = segments(&x, 256, 0.5).unwrap();
//! let tapers = dpss(1000, 4.0, None, true).unwrap();
//!
//! let freqs = log_freqs(4.0, 40.0, 12);
//! let bank = WaveletBank::morlet(250.0, &freqs, &NCycles::Fixed(7.0), false).unwrap();
//! let coefs = cwt(&x, &bank, 1).unwrap(); // [freq, time] complex
//! ```

pub mod baseline;
pub mod config;
pub mod epochs;
pub mod error;
pub mod fft;
pub mod io;
pub mod psd;
pub mod taper;
pub mod tfr;

// ── Crate-root re-exports ────────────────────────────────────────────────────
//
// Everything a downstream user is likely to need is available directly as
// `exg_spectral::Foo` without having to know the internal module layout.

// baseline
pub use baseline::{rescale, Baseline, BaselineMode};

// config
pub use config::{MorletConfig, MultitaperConfig, WelchConfig};

// epochs
pub use epochs::EpochedSeries;

// error
pub use error::SpectralError;

// fft
pub use fft::{rfft_freqs, ComplexFft, RealFft};

// io — safetensors helpers
pub use io::StWriter;

// psd — estimators, result container, segmenter
pub use psd::{
    median_bias, psd_multitaper, psd_welch, segment_count, segment_step, segments, Average,
    PsdData, PsdResult, Segment,
};

// taper — windows and DPSS
pub use taper::{dpss, energy, window, TaperSet, WindowKind};

// tfr — wavelets, transform, results
pub use tfr::{
    cwt, log_freqs, tfr_from_config, tfr_morlet, tfr_morlet_epochs, EpochsTfr, NCycles,
    TfrResult, Wavelet, WaveletBank,
};
