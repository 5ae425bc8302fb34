//! Baseline normalisation of time-resolved power.
//!
//! Matches `mne.baseline.rescale`, with time on the last axis of an array of
//! any dimensionality.  For every lane along time, with `m` and `s` the mean
//! and standard deviation (ddof = 0) of the samples in the baseline window:
//!
//! ```text
//!   Mean       x − m
//!   Ratio      x / m
//!   LogRatio   10 · log10(x / m)                (dB)
//!   Percent    (x − m) / m
//!   ZScore     (x − m) / s
//!   ZLogRatio  log10(x / m) / std(log10(b / m))  (b = baseline samples)
//! ```
//!
//! The input is never modified; a new array is returned.
use std::ops::{Range, RangeInclusive};

use ndarray::{s, Array, Axis, Dimension};

use crate::error::{config_bail, data_bail, degenerate_bail, Result};

/// Baseline window in seconds.  `None` extends to the first / last sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Baseline {
    pub start: Option<f64>,
    pub end: Option<f64>,
}

impl Baseline {
    pub fn new(start: Option<f64>, end: Option<f64>) -> Self {
        Self { start, end }
    }

    /// The whole time axis.
    pub fn whole() -> Self {
        Self::default()
    }

    /// Sample range `[imin, imax)` of `times` covered by the window.
    ///
    /// # Errors
    ///
    /// * `Configuration` if `start > end`.
    /// * `InsufficientData` if a bound lies outside the time axis (by more
    ///   than half a sample) or the window contains no sample.
    pub fn indices(&self, times: &[f64]) -> Result<Range<usize>> {
        let (Some(&t_first), Some(&t_last)) = (times.first(), times.last()) else {
            data_bail!("empty time axis");
        };
        let dt = if times.len() > 1 { times[1] - times[0] } else { 0.0 };
        self.indices_within(times, t_first..=t_last, dt)
    }

    /// Like [`indices`](Self::indices), but the bounds are checked against
    /// `extent`, the time span of the underlying data sampled every `dt`
    /// seconds.  `times` may be a decimated subset of that span; the window
    /// then selects the entries of `times` that fall inside it.
    pub fn indices_within(
        &self,
        times: &[f64],
        extent: RangeInclusive<f64>,
        dt: f64,
    ) -> Result<Range<usize>> {
        if times.is_empty() {
            data_bail!("empty time axis");
        }
        if let (Some(a), Some(b)) = (self.start, self.end) {
            if a > b {
                config_bail!("baseline start {a} s is after its end {b} s");
            }
        }
        let (t_first, t_last) = extent.into_inner();
        let slack = 0.5 * dt;
        let tol = 1e-6 * dt.max(f64::EPSILON);
        let outside = |x: f64| !x.is_finite() || x < t_first - slack || x > t_last + slack;

        let imin = match self.start {
            None => 0,
            Some(a) => {
                if outside(a) {
                    data_bail!(
                        "baseline start {a} s lies outside the data ({t_first} .. {t_last} s)"
                    );
                }
                times.iter().position(|&t| t >= a - tol).unwrap_or(times.len())
            }
        };
        let imax = match self.end {
            None => times.len(),
            Some(b) => {
                if outside(b) {
                    data_bail!(
                        "baseline end {b} s lies outside the data ({t_first} .. {t_last} s)"
                    );
                }
                times.iter().rposition(|&t| t <= b + tol).map_or(0, |i| i + 1)
            }
        };
        if imin >= imax {
            data_bail!("baseline window {:?} .. {:?} s contains no samples", self.start, self.end);
        }
        Ok(imin..imax)
    }
}

/// Closed set of baseline rescaling formulas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineMode {
    Mean,
    Ratio,
    LogRatio,
    Percent,
    ZScore,
    ZLogRatio,
}

impl std::str::FromStr for BaselineMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mean" => Ok(Self::Mean),
            "ratio" => Ok(Self::Ratio),
            "logratio" => Ok(Self::LogRatio),
            "percent" => Ok(Self::Percent),
            "zscore" => Ok(Self::ZScore),
            "zlogratio" => Ok(Self::ZLogRatio),
            other => Err(format!(
                "unknown baseline mode `{other}` \
                 (mean, ratio, logratio, percent, zscore, zlogratio)"
            )),
        }
    }
}

/// Rescale `data` (time on the last axis) relative to `baseline`.
///
/// # Errors
///
/// * `Configuration` if `times` does not match the last axis, or the window
///   is inverted.
/// * `InsufficientData` if the window lies outside `times` or is empty.
/// * `NumericalDegeneracy` if a ratio-type mode meets a non-positive
///   baseline mean, or a z-score mode a zero baseline deviation.
pub fn rescale<D: Dimension>(
    data: &Array<f64, D>,
    times: &[f64],
    baseline: &Baseline,
    mode: BaselineMode,
) -> Result<Array<f64, D>> {
    if data.ndim() == 0 {
        config_bail!("cannot rescale a 0-dimensional array");
    }
    let axis = Axis(data.ndim() - 1);
    if data.len_of(axis) != times.len() {
        config_bail!("{} time points for a time axis of {}", times.len(), data.len_of(axis));
    }
    let range = baseline.indices(times)?;
    rescale_range(data, range, mode)
}

/// [`rescale`] with the baseline given as a sample range of the last axis.
pub(crate) fn rescale_range<D: Dimension>(
    data: &Array<f64, D>,
    range: Range<usize>,
    mode: BaselineMode,
) -> Result<Array<f64, D>> {
    let Some(last) = data.ndim().checked_sub(1) else {
        config_bail!("cannot rescale a 0-dimensional array");
    };
    let axis = Axis(last);
    if range.is_empty() || range.end > data.len_of(axis) {
        data_bail!("baseline samples {range:?} outside a time axis of {}", data.len_of(axis));
    }

    let mut out = data.clone();
    for mut lane in out.lanes_mut(axis) {
        let base = lane.slice(s![range.clone()]);
        let n = base.len() as f64;
        let m = base.sum() / n;

        match mode {
            BaselineMode::Mean => lane.mapv_inplace(|x| x - m),
            BaselineMode::Ratio | BaselineMode::LogRatio | BaselineMode::Percent => {
                if !(m > 0.0) {
                    degenerate_bail!("baseline mean is {m}; {mode:?} needs positive power");
                }
                match mode {
                    BaselineMode::Ratio => lane.mapv_inplace(|x| x / m),
                    BaselineMode::LogRatio => lane.mapv_inplace(|x| 10.0 * (x / m).log10()),
                    _ => lane.mapv_inplace(|x| (x - m) / m),
                }
            }
            BaselineMode::ZScore => {
                let sd = (base.iter().map(|x| (x - m).powi(2)).sum::<f64>() / n).sqrt();
                if !(sd > 0.0) {
                    degenerate_bail!("baseline standard deviation is {sd}; cannot z-score");
                }
                lane.mapv_inplace(|x| (x - m) / sd);
            }
            BaselineMode::ZLogRatio => {
                if !(m > 0.0) {
                    degenerate_bail!("baseline mean is {m}; ZLogRatio needs positive power");
                }
                let logs: Vec<f64> = base.iter().map(|x| (x / m).log10()).collect();
                let lm = logs.iter().sum::<f64>() / n;
                let sd = (logs.iter().map(|v| (v - lm).powi(2)).sum::<f64>() / n).sqrt();
                if !(sd > 0.0) || !sd.is_finite() {
                    degenerate_bail!("baseline log-ratio deviation is {sd}; cannot z-score");
                }
                lane.mapv_inplace(|x| (x / m).log10() / sd);
            }
        }
    }
    Ok(out)
}
