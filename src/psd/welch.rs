//! Welch's averaged modified periodogram.
//!
//! Per channel-epoch (matches `scipy.signal.welch(detrend='constant',
//! scaling='density')` as used by MNE):
//!   1. Split into segments of `n_per_seg` samples ([`segments`]).
//!   2. Remove each segment's mean, multiply by the window.
//!   3. Zero-pad to `n_fft`, real FFT, `|X|² / (sfreq · Σw²)`.
//!   4. Double every bin except DC and even-length Nyquist.
//!   5. Combine segments by mean, bias-corrected median, or not at all.
use log::{debug, warn};
use ndarray::{Array2, Array3, Array4, Axis};
use rayon::prelude::*;

use super::segment::{segment_count, segments};
use super::{
    band_indices, check_band, median, median_bias, onesided_factor, Average, PsdData, PsdResult,
};
use crate::config::WelchConfig;
use crate::epochs::EpochedSeries;
use crate::error::{config_bail, Result};
use crate::fft::{rfft_freqs, RealFft};
use crate::taper::{energy, window};

/// Default segment length when `n_per_seg` is not given.
pub const DEFAULT_N_PER_SEG: usize = 256;

/// Welch PSD of every channel of every epoch.
///
/// Returns `[epoch, channel, freq]` for [`Average::Mean`] and
/// [`Average::Median`], `[epoch, channel, freq, segment]` for
/// [`Average::None`].
///
/// # Errors
///
/// * `Configuration`: `n_per_seg < 2`, `n_fft < n_per_seg`, overlap outside
///   `[0, 1)`, invalid or empty frequency band.
/// * `InsufficientData`: `n_per_seg` longer than the epochs.
/// * `NumericalDegeneracy`: finite `fmax` above Nyquist.
pub fn psd_welch(epochs: &EpochedSeries, cfg: &WelchConfig) -> Result<PsdResult> {
    let (n_e, n_c, n_t) = epochs.data().dim();
    let sfreq = epochs.sfreq();

    let n_per_seg = cfg.n_per_seg.unwrap_or(n_t.min(DEFAULT_N_PER_SEG));
    let n_fft = cfg.n_fft.unwrap_or(n_per_seg);
    if n_per_seg < 2 {
        config_bail!("n_per_seg must be at least 2, got {n_per_seg}");
    }
    if n_fft < n_per_seg {
        config_bail!("n_fft ({n_fft}) must be at least n_per_seg ({n_per_seg})");
    }
    let n_segments = segment_count(n_t, n_per_seg, cfg.overlap)?;
    let fmax = check_band(cfg.fmin, cfg.fmax, epochs.nyquist())?;

    let win = window(cfg.window, n_per_seg)?;
    let scale = 1.0 / (sfreq * energy(&win));
    let all_freqs = rfft_freqs(n_fft, sfreq);
    let keep = band_indices(&all_freqs, cfg.fmin, fmax)?;
    let freqs: Vec<f64> = keep.iter().map(|&k| all_freqs[k]).collect();

    if cfg.average == Average::Median && n_segments < 3 {
        warn!("median over {n_segments} segment(s) is no more robust than the mean");
    }
    debug!(
        "welch: [{n_e}, {n_c}, {n_t}] @ {sfreq} Hz, n_per_seg={n_per_seg} n_fft={n_fft} \
         overlap={} segments={n_segments} bins={}",
        cfg.overlap,
        freqs.len()
    );

    let fft = RealFft::new(n_fft);
    let plan = SegmentPlan {
        n_per_seg,
        overlap: cfg.overlap,
        window: &win,
        scale,
        keep: &keep,
        fft: &fft,
    };

    let units: Vec<(usize, usize)> = (0..n_e)
        .flat_map(|e| (0..n_c).map(move |c| (e, c)))
        .collect();
    let per_unit: Vec<Array2<f64>> = units
        .par_iter()
        .map(|&(e, c)| plan.periodograms(&epochs.signal(e, c).to_vec()))
        .collect::<Result<_>>()?;

    let n_f = freqs.len();
    let data = match cfg.average {
        Average::None => {
            let mut out = Array4::<f64>::zeros((n_e, n_c, n_f, n_segments));
            for (&(e, c), p) in units.iter().zip(&per_unit) {
                out.slice_mut(ndarray::s![e, c, .., ..]).assign(p);
            }
            PsdData::Segments(out)
        }
        Average::Mean => {
            let mut out = Array3::<f64>::zeros((n_e, n_c, n_f));
            for (&(e, c), p) in units.iter().zip(&per_unit) {
                let mean = p.sum_axis(Axis(1)) / n_segments as f64;
                out.slice_mut(ndarray::s![e, c, ..]).assign(&mean);
            }
            PsdData::Averaged(out)
        }
        Average::Median => {
            let bias = median_bias(n_segments);
            let mut out = Array3::<f64>::zeros((n_e, n_c, n_f));
            for (&(e, c), p) in units.iter().zip(&per_unit) {
                for (f, row) in p.rows().into_iter().enumerate() {
                    let mut vals = row.to_vec();
                    out[[e, c, f]] = median(&mut vals) / bias;
                }
            }
            PsdData::Averaged(out)
        }
    };

    Ok(PsdResult { freqs, data })
}

/// Everything needed to turn one signal into its segment periodograms.
struct SegmentPlan<'a> {
    n_per_seg: usize,
    overlap: f64,
    window: &'a [f64],
    scale: f64,
    keep: &'a [usize],
    fft: &'a RealFft,
}

impl SegmentPlan<'_> {
    /// `[freq, segment]` one-sided density of each segment of `x`.
    fn periodograms(&self, x: &[f64]) -> Result<Array2<f64>> {
        let segs = segments(x, self.n_per_seg, self.overlap)?;
        let n_fft = self.fft.len();
        let mut out = Array2::<f64>::zeros((self.keep.len(), segs.len()));
        let mut buf = vec![0.0_f64; self.n_per_seg];

        for (s, seg) in segs.iter().enumerate() {
            let mean = seg.samples.iter().sum::<f64>() / self.n_per_seg as f64;
            for ((b, &v), &w) in buf.iter_mut().zip(seg.samples).zip(self.window) {
                *b = (v - mean) * w;
            }
            let power = self.fft.power(&buf)?;
            for (f, &k) in self.keep.iter().enumerate() {
                out[[f, s]] = power[k] * self.scale * onesided_factor(k, n_fft);
            }
        }
        Ok(out)
    }
}
