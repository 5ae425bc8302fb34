//! Power spectral density estimation.
//!
//! - [`segment`]: Welch segmentation.
//! - [`welch`]: averaged modified periodograms, matching
//!   `mne.time_frequency.psd_array_welch`.
//! - [`multitaper`]: DPSS multitaper estimate, matching
//!   `mne.time_frequency.psd_array_multitaper`.
//!
//! Both estimators return a one-sided density in `unit² / Hz`: every bin
//! except DC and (for even transform lengths) Nyquist is doubled.

pub mod multitaper;
pub mod segment;
pub mod welch;

pub use multitaper::psd_multitaper;
pub use segment::{segment_count, segment_step, segments, Segment};
pub use welch::psd_welch;

use ndarray::{Array2, Array3, Array4, Axis};

use crate::error::{config_bail, degenerate_bail, Result};

/// How Welch combines the periodograms of one channel-epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Average {
    /// Arithmetic mean over segments.
    #[default]
    Mean,
    /// Median over segments, divided by [`median_bias`] so that it is an
    /// unbiased estimate of the mean power.
    Median,
    /// Keep every segment; the result has a trailing segment axis.
    None,
}

impl std::str::FromStr for Average {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mean" => Ok(Self::Mean),
            "median" => Ok(Self::Median),
            "none" => Ok(Self::None),
            other => Err(format!("unknown average `{other}` (mean, median, none)")),
        }
    }
}

/// PSD values, aggregated or per segment.
#[derive(Debug, Clone)]
pub enum PsdData {
    /// `[epoch, channel, freq]`.
    Averaged(Array3<f64>),
    /// `[epoch, channel, freq, segment]`.
    Segments(Array4<f64>),
}

/// Output of both PSD estimators.
#[derive(Debug, Clone)]
pub struct PsdResult {
    /// Bin centres in Hz, identical for every epoch and channel.
    pub freqs: Vec<f64>,
    pub data: PsdData,
}

impl PsdResult {
    pub fn averaged(&self) -> Option<&Array3<f64>> {
        match &self.data {
            PsdData::Averaged(a) => Some(a),
            PsdData::Segments(_) => None,
        }
    }

    pub fn segments(&self) -> Option<&Array4<f64>> {
        match &self.data {
            PsdData::Segments(a) => Some(a),
            PsdData::Averaged(_) => None,
        }
    }

    pub fn shape(&self) -> &[usize] {
        match &self.data {
            PsdData::Averaged(a) => a.shape(),
            PsdData::Segments(a) => a.shape(),
        }
    }

    /// `[epoch, channel, freq]`; an unaggregated result is mean-reduced
    /// over its segment axis.
    pub fn to_averaged(&self) -> Array3<f64> {
        match &self.data {
            PsdData::Averaged(a) => a.clone(),
            PsdData::Segments(a) => {
                let n_seg = a.shape()[3] as f64;
                a.sum_axis(Axis(3)) / n_seg
            }
        }
    }

    /// `[channel, freq]` mean across epochs.
    pub fn mean_over_epochs(&self) -> Array2<f64> {
        let a = self.to_averaged();
        let n_e = a.shape()[0] as f64;
        a.sum_axis(Axis(0)) / n_e
    }

    /// `[channel, freq]` population standard deviation across epochs.
    pub fn std_over_epochs(&self) -> Array2<f64> {
        self.to_averaged().std_axis(Axis(0), 0.0)
    }

    /// Frequency of the largest epoch-mean power on `channel`.
    pub fn peak_frequency(&self, channel: usize) -> Option<f64> {
        let mean = self.mean_over_epochs();
        if channel >= mean.nrows() {
            return None;
        }
        mean.row(channel)
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| self.freqs[i])
    }
}

/// Ratio of the median to the mean of `n` i.i.d. χ²₂ periodogram values,
/// `1 + Σ_{k=1}^{(n−1)/2} (1/(2k+1) − 1/(2k))` (as `scipy.signal.welch`).
pub fn median_bias(n: usize) -> f64 {
    let m = n.saturating_sub(1) / 2;
    1.0 + (1..=m)
        .map(|k| {
            let ii = 2.0 * k as f64;
            1.0 / (ii + 1.0) - 1.0 / ii
        })
        .sum::<f64>()
}

/// Median with the even-length midpoint rule.
pub(crate) fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n == 0 {
        return f64::NAN;
    }
    if n % 2 == 1 {
        values[n / 2]
    } else {
        0.5 * (values[n / 2 - 1] + values[n / 2])
    }
}

/// Doubling factor for a one-sided density.
pub(crate) fn onesided_factor(k: usize, n_fft: usize) -> f64 {
    if k == 0 || (n_fft % 2 == 0 && k == n_fft / 2) {
        1.0
    } else {
        2.0
    }
}

/// Validate `[fmin, fmax]` against Nyquist and return the effective `fmax`.
pub(crate) fn check_band(fmin: f64, fmax: f64, nyquist: f64) -> Result<f64> {
    if !fmin.is_finite() || fmin < 0.0 {
        config_bail!("fmin must be a non-negative finite frequency, got {fmin}");
    }
    if fmax.is_nan() {
        config_bail!("fmax is NaN");
    }
    let fmax = if fmax == f64::INFINITY { nyquist } else { fmax };
    if fmax > nyquist * (1.0 + 1e-12) {
        degenerate_bail!("fmax {fmax} Hz exceeds the Nyquist frequency {nyquist} Hz");
    }
    if fmin > fmax {
        config_bail!("fmin {fmin} Hz is above fmax {fmax} Hz");
    }
    Ok(fmax)
}

/// Indices of `freqs` that fall inside `[fmin, fmax]`.
pub(crate) fn band_indices(freqs: &[f64], fmin: f64, fmax: f64) -> Result<Vec<usize>> {
    let tol = 1e-10 * fmax.abs().max(1.0);
    let idx: Vec<usize> = freqs
        .iter()
        .enumerate()
        .filter(|&(_, &f)| f >= fmin - tol && f <= fmax + tol)
        .map(|(i, _)| i)
        .collect();
    if idx.is_empty() {
        config_bail!(
            "no frequency bins between {fmin} and {fmax} Hz (resolution {} Hz)",
            freqs.get(1).copied().unwrap_or(0.0)
        );
    }
    Ok(idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_bias_values() {
        approx::assert_abs_diff_eq!(median_bias(1), 1.0);
        approx::assert_abs_diff_eq!(median_bias(2), 1.0);
        approx::assert_abs_diff_eq!(median_bias(3), 1.0 + 1.0 / 3.0 - 0.5, epsilon = 1e-15);
        // Converges to ln 2 for many segments.
        approx::assert_abs_diff_eq!(median_bias(100_001), std::f64::consts::LN_2, epsilon = 1e-4);
    }

    #[test]
    fn median_even_and_odd() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn band_checks() {
        assert_eq!(check_band(0.0, f64::INFINITY, 100.0).unwrap(), 100.0);
        assert!(matches!(
            check_band(0.0, 120.0, 100.0),
            Err(crate::SpectralError::NumericalDegeneracy(_))
        ));
        assert!(matches!(
            check_band(50.0, 10.0, 100.0),
            Err(crate::SpectralError::Configuration(_))
        ));
        assert!(check_band(-1.0, 10.0, 100.0).is_err());
    }

    #[test]
    fn band_selection_is_inclusive() {
        let freqs: Vec<f64> = (0..=50).map(|k| k as f64 * 2.0).collect();
        let idx = band_indices(&freqs, 2.0, 40.0).unwrap();
        assert_eq!(idx.first(), Some(&1));
        assert_eq!(idx.last(), Some(&20));
        assert!(band_indices(&freqs, 2.5, 3.5).is_err());
    }

    #[test]
    fn averaged_view_of_segments() {
        let a = Array4::from_shape_fn((2, 1, 3, 4), |(_, _, f, s)| (f * 10 + s) as f64);
        let r = PsdResult { freqs: vec![0.0, 1.0, 2.0], data: PsdData::Segments(a) };
        let avg = r.to_averaged();
        assert_eq!(avg.shape(), &[2, 1, 3]);
        approx::assert_abs_diff_eq!(avg[[1, 0, 2]], 21.5);
        assert_eq!(r.peak_frequency(0), Some(2.0));
        assert_eq!(r.peak_frequency(5), None);
    }
}
