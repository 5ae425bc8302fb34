//! Multitaper PSD with DPSS tapers.
//!
//! Per channel-epoch the whole (mean-removed) epoch is multiplied by each of
//! the K tapers and transformed.  The K eigenspectra `|X_k|²` are combined
//! either with fixed weights
//!
//! ```text
//!   S(f) = Σ λ_k |X_k(f)|² / Σ λ_k
//! ```
//!
//! or with Thomson's adaptive weights, iterated per frequency bin:
//!
//! ```text
//!   d_k(f) = √λ_k · S(f) / (λ_k · S(f) + (1 − λ_k) · σ²)
//!   S(f)   = Σ d_k² |X_k|² / Σ d_k²
//! ```
//!
//! where `σ²` is the mean fixed-weight power over all bins.  The result is
//! scaled to a one-sided density (`× 2 / sfreq`, DC and Nyquist undoubled).
use log::debug;
use ndarray::{Array1, Array3};
use rayon::prelude::*;

use super::{band_indices, check_band, onesided_factor, PsdData, PsdResult};
use crate::config::MultitaperConfig;
use crate::epochs::EpochedSeries;
use crate::error::{config_bail, Result};
use crate::fft::{rfft_freqs, RealFft};
use crate::taper::{dpss, TaperSet};

/// `N·W` used when no bandwidth is configured.
pub const DEFAULT_HALF_NBW: f64 = 4.0;

const ADAPTIVE_MAX_ITER: usize = 150;
const ADAPTIVE_TOL: f64 = 1e-10;

/// Multitaper PSD of every channel of every epoch, `[epoch, channel, freq]`.
///
/// Frequency resolution is `sfreq / n_times`.
///
/// # Errors
///
/// * `Configuration`: non-positive bandwidth, a bandwidth that yields no
///   usable taper, invalid or empty frequency band.
/// * `NumericalDegeneracy`: finite `fmax` above Nyquist.
pub fn psd_multitaper(epochs: &EpochedSeries, cfg: &MultitaperConfig) -> Result<PsdResult> {
    let (n_e, n_c, n_t) = epochs.data().dim();
    let sfreq = epochs.sfreq();
    let fmax = check_band(cfg.fmin, cfg.fmax, epochs.nyquist())?;

    let half_nbw = match cfg.bandwidth {
        Some(bw) if !bw.is_finite() || bw <= 0.0 => {
            config_bail!("multitaper bandwidth must be positive, got {bw}")
        }
        Some(bw) => bw * n_t as f64 / (2.0 * sfreq),
        None => DEFAULT_HALF_NBW,
    };
    let tapers = dpss(n_t, half_nbw, None, cfg.low_bias)?;

    let all_freqs = rfft_freqs(n_t, sfreq);
    let keep = band_indices(&all_freqs, cfg.fmin, fmax)?;
    let freqs: Vec<f64> = keep.iter().map(|&k| all_freqs[k]).collect();

    debug!(
        "multitaper: [{n_e}, {n_c}, {n_t}] @ {sfreq} Hz, N·W={half_nbw:.3} \
         tapers={} adaptive={} bins={}",
        tapers.n_tapers(),
        cfg.adaptive,
        freqs.len()
    );

    let fft = RealFft::new(n_t);
    let units: Vec<(usize, usize)> = (0..n_e)
        .flat_map(|e| (0..n_c).map(move |c| (e, c)))
        .collect();
    let per_unit: Vec<Array1<f64>> = units
        .par_iter()
        .map(|&(e, c)| {
            let x = epochs.signal(e, c).to_vec();
            let spectra = eigenspectra(&x, &tapers, &fft)?;
            let raw = if cfg.adaptive {
                adaptive_combine(&spectra, &tapers.weights)
            } else {
                fixed_combine(&spectra, &tapers.weights)
            };
            Ok(keep
                .iter()
                .map(|&k| raw[k] * onesided_factor(k, n_t) / sfreq)
                .collect::<Array1<f64>>())
        })
        .collect::<Result<_>>()?;

    let mut out = Array3::<f64>::zeros((n_e, n_c, freqs.len()));
    for (&(e, c), p) in units.iter().zip(&per_unit) {
        out.slice_mut(ndarray::s![e, c, ..]).assign(p);
    }
    Ok(PsdResult { freqs, data: PsdData::Averaged(out) })
}

/// `|X_k(f)|²` for each taper, over every one-sided bin.
fn eigenspectra(x: &[f64], tapers: &TaperSet, fft: &RealFft) -> Result<Vec<Vec<f64>>> {
    let mean = x.iter().sum::<f64>() / x.len() as f64;
    let mut buf = vec![0.0_f64; x.len()];
    tapers
        .iter()
        .map(|(taper, _)| {
            for ((b, &v), &w) in buf.iter_mut().zip(x).zip(taper.iter()) {
                *b = (v - mean) * w;
            }
            fft.power(&buf)
        })
        .collect()
}

fn fixed_combine(spectra: &[Vec<f64>], weights: &[f64]) -> Vec<f64> {
    let n_bins = spectra[0].len();
    let total: f64 = weights.iter().sum();
    (0..n_bins)
        .map(|f| {
            spectra
                .iter()
                .zip(weights)
                .map(|(s, &w)| w * s[f])
                .sum::<f64>()
                / total
        })
        .collect()
}

fn adaptive_combine(spectra: &[Vec<f64>], eig: &[f64]) -> Vec<f64> {
    let n_bins = spectra[0].len();
    let fixed = fixed_combine(spectra, eig);
    let var = fixed.iter().sum::<f64>() / n_bins as f64;

    (0..n_bins)
        .map(|f| {
            // Start from the two best-concentrated tapers.
            let init = spectra.iter().take(2).map(|s| s[f]).sum::<f64>();
            let mut est = init / spectra.len().min(2) as f64;
            if est <= 0.0 {
                return 0.0;
            }
            for _ in 0..ADAPTIVE_MAX_ITER {
                let (mut num, mut den) = (0.0, 0.0);
                for (s, &l) in spectra.iter().zip(eig) {
                    let d = l.sqrt() * est / (l * est + (1.0 - l) * var);
                    num += d * d * s[f];
                    den += d * d;
                }
                let next = if den > 0.0 { num / den } else { 0.0 };
                let converged = (next - est).abs() <= ADAPTIVE_TOL * est;
                est = next;
                if converged || est <= 0.0 {
                    break;
                }
            }
            est
        })
        .collect()
}
