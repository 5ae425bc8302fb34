//! Morlet time-frequency analysis.
//!
//! - [`morlet`]: wavelet bank construction (`mne.time_frequency.morlet`).
//! - [`cwt`]: FFT convolution, epoch-averaged power and inter-trial
//!   coherence (`mne.time_frequency.tfr_array_morlet` with
//!   `output='avg_power_itc'`), and per-epoch power.

pub mod cwt;
pub mod morlet;

pub use cwt::{cwt, tfr_morlet, tfr_morlet_epochs};
pub use morlet::{log_freqs, NCycles, Wavelet, WaveletBank, SUPPORT_SIGMAS};

use std::ops::Range;

use ndarray::{Array2, Array3, Array4, Axis};

use crate::baseline::{rescale_range, Baseline, BaselineMode};
use crate::config::MorletConfig;
use crate::epochs::EpochedSeries;
use crate::error::Result;

/// Epoch-averaged time-frequency power with optional ITC.
#[derive(Debug, Clone)]
pub struct TfrResult {
    /// Wavelet centre frequencies, Hz.
    pub freqs: Vec<f64>,
    /// Output sample times after decimation, s.
    pub times: Vec<f64>,
    /// `[channel, freq, time]`.
    pub power: Array3<f64>,
    /// `[channel, freq, time]`, every value in `[0, 1]`.
    pub itc: Option<Array3<f64>>,
    /// Number of epochs averaged.
    pub n_epochs: usize,
    pub decim: usize,
    /// Epoch length before decimation.
    pub n_input_times: usize,
    /// Per-frequency wavelet half width, in input samples.
    pub half_widths: Vec<usize>,
}

impl TfrResult {
    /// Baseline-normalise the power.  ITC is copied unchanged: it is already
    /// a bounded phase statistic.
    ///
    /// The baseline statistics come from the epoch-averaged power.  Bounds
    /// are checked against the full epoch, not the decimated time axis.
    pub fn apply_baseline(&self, baseline: &Baseline, mode: BaselineMode) -> Result<TfrResult> {
        let range = baseline_indices(baseline, &self.times, self.decim, self.n_input_times)?;
        let power = rescale_range(&self.power, range, mode)?;
        Ok(TfrResult { power, ..self.clone() })
    }

    /// `[freq, time]`, `true` where the output sample lies within the
    /// wavelet half width of an epoch boundary.
    pub fn edge_mask(&self) -> Array2<bool> {
        edge_mask(&self.half_widths, self.times.len(), self.decim, self.n_input_times)
    }
}

/// Per-epoch time-frequency power.
#[derive(Debug, Clone)]
pub struct EpochsTfr {
    pub freqs: Vec<f64>,
    pub times: Vec<f64>,
    /// `[epoch, channel, freq, time]`.
    pub power: Array4<f64>,
    pub decim: usize,
    pub n_input_times: usize,
    pub half_widths: Vec<usize>,
}

impl EpochsTfr {
    pub fn n_epochs(&self) -> usize {
        self.power.shape()[0]
    }

    /// Mean over epochs.  No ITC: phase was not kept.
    pub fn average(&self) -> TfrResult {
        let n_e = self.n_epochs();
        TfrResult {
            freqs: self.freqs.clone(),
            times: self.times.clone(),
            power: self.power.sum_axis(Axis(0)) / n_e as f64,
            itc: None,
            n_epochs: n_e,
            decim: self.decim,
            n_input_times: self.n_input_times,
            half_widths: self.half_widths.clone(),
        }
    }

    /// Baseline-normalise each epoch against its own baseline window.
    pub fn apply_baseline(&self, baseline: &Baseline, mode: BaselineMode) -> Result<EpochsTfr> {
        let range = baseline_indices(baseline, &self.times, self.decim, self.n_input_times)?;
        let power = rescale_range(&self.power, range, mode)?;
        Ok(EpochsTfr { power, ..self.clone() })
    }
}

/// Baseline samples of a decimated time axis, with the bounds checked
/// against the `n_in` input samples it was taken from.
fn baseline_indices(
    baseline: &Baseline,
    times: &[f64],
    decim: usize,
    n_in: usize,
) -> Result<Range<usize>> {
    let t0 = times.first().copied().unwrap_or(0.0);
    let dt = match times {
        [a, b, ..] => (b - a) / decim.max(1) as f64,
        _ => 0.0,
    };
    let t_end = t0 + n_in.saturating_sub(1) as f64 * dt;
    baseline.indices_within(times, t0..=t_end, dt)
}

fn edge_mask(half_widths: &[usize], n_out: usize, decim: usize, n_in: usize) -> Array2<bool> {
    Array2::from_shape_fn((half_widths.len(), n_out), |(f, j)| {
        let t = j * decim;
        let h = half_widths[f];
        t < h || t + h >= n_in
    })
}

/// Morlet TFR driven by a [`MorletConfig`].
pub fn tfr_from_config(epochs: &EpochedSeries, cfg: &MorletConfig) -> Result<TfrResult> {
    let bank = cfg.bank(epochs.sfreq())?;
    tfr_morlet(epochs, &bank, cfg.decim, cfg.return_itc)
}
