//! Trigger-aligned epoched data.
//!
//! [`EpochedSeries`] is the single input type of every estimator: an
//! `[E, C, T]` array of real samples, the sampling rate, the time of the
//! first sample relative to the trigger, and one name per channel.  All
//! epochs share the same channel count, sample count and time axis.
use ndarray::{s, Array2, Array3, ArrayView1, ArrayView2, Axis};

use crate::error::{config_bail, Result};

#[derive(Debug, Clone)]
pub struct EpochedSeries {
    data: Array3<f64>,
    sfreq: f64,
    tmin: f64,
    ch_names: Vec<String>,
}

impl EpochedSeries {
    /// Wrap an `[E, C, T]` array.
    ///
    /// # Errors
    ///
    /// `Configuration` if any axis is empty, `T < 2`, `sfreq` is not a
    /// positive finite number, `tmin` is not finite, or the number of
    /// channel names differs from `C`.
    pub fn new(data: Array3<f64>, sfreq: f64, tmin: f64, ch_names: Vec<String>) -> Result<Self> {
        let (n_e, n_c, n_t) = data.dim();
        if n_e == 0 || n_c == 0 {
            config_bail!(
                "epoched data needs at least one epoch and one channel, got [{n_e}, {n_c}, {n_t}]"
            );
        }
        if n_t < 2 {
            config_bail!("epochs must have at least 2 samples, got {n_t}");
        }
        if !sfreq.is_finite() || sfreq <= 0.0 {
            config_bail!("sampling rate must be positive, got {sfreq}");
        }
        if !tmin.is_finite() {
            config_bail!("tmin must be finite, got {tmin}");
        }
        if ch_names.len() != n_c {
            config_bail!("{} channel names for {n_c} channels", ch_names.len());
        }
        Ok(Self { data, sfreq, tmin, ch_names })
    }

    /// Like [`new`](Self::new) with channels named `ch0`, `ch1`, ….
    pub fn with_default_names(data: Array3<f64>, sfreq: f64, tmin: f64) -> Result<Self> {
        let names = default_names(data.shape()[1]);
        Self::new(data, sfreq, tmin, names)
    }

    /// Stack a list of `[C, T]` epochs.  Every epoch must have the same shape.
    pub fn from_epochs(
        epochs: &[Array2<f64>],
        sfreq: f64,
        tmin: f64,
        ch_names: Vec<String>,
    ) -> Result<Self> {
        let Some(first) = epochs.first() else {
            config_bail!("no epochs given");
        };
        let (n_c, n_t) = first.dim();
        let mut data = Array3::<f64>::zeros((epochs.len(), n_c, n_t));
        for (e, ep) in epochs.iter().enumerate() {
            if ep.dim() != (n_c, n_t) {
                config_bail!("epoch {e} has shape {:?}, expected {:?}", ep.dim(), (n_c, n_t));
            }
            data.slice_mut(s![e, .., ..]).assign(ep);
        }
        Self::new(data, sfreq, tmin, ch_names)
    }

    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    pub fn into_data(self) -> Array3<f64> {
        self.data
    }

    pub fn sfreq(&self) -> f64 {
        self.sfreq
    }

    pub fn nyquist(&self) -> f64 {
        self.sfreq / 2.0
    }

    pub fn tmin(&self) -> f64 {
        self.tmin
    }

    pub fn ch_names(&self) -> &[String] {
        &self.ch_names
    }

    pub fn n_epochs(&self) -> usize {
        self.data.shape()[0]
    }

    pub fn n_channels(&self) -> usize {
        self.data.shape()[1]
    }

    pub fn n_times(&self) -> usize {
        self.data.shape()[2]
    }

    /// Sample times in seconds, `tmin + i / sfreq`.
    pub fn times(&self) -> Vec<f64> {
        (0..self.n_times())
            .map(|i| self.tmin + i as f64 / self.sfreq)
            .collect()
    }

    /// One epoch, `[C, T]`.
    pub fn epoch(&self, e: usize) -> ArrayView2<'_, f64> {
        self.data.index_axis(Axis(0), e)
    }

    /// One channel of one epoch, `[T]`.
    pub fn signal(&self, e: usize, c: usize) -> ArrayView1<'_, f64> {
        self.data.slice(s![e, c, ..])
    }

    /// Keep only the channels at `indices`, in the given order.
    ///
    /// # Errors
    ///
    /// `Configuration` if `indices` is empty or out of range.
    pub fn pick(&self, indices: &[usize]) -> Result<Self> {
        if indices.is_empty() {
            config_bail!("channel selection is empty");
        }
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.n_channels()) {
            config_bail!("channel index {bad} out of range for {} channels", self.n_channels());
        }
        let data = self.data.select(Axis(1), indices);
        let names = indices.iter().map(|&i| self.ch_names[i].clone()).collect();
        Self::new(data, self.sfreq, self.tmin, names)
    }

    /// Keep channels by name.
    ///
    /// Name matching is case-insensitive and ignores spaces
    /// (e.g. `"fp 1"` matches `"Fp1"`).
    pub fn pick_names<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        let norm = |s: &str| s.replace(' ', "").to_lowercase();
        let mut indices = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            match self.ch_names.iter().position(|n| norm(n) == norm(name)) {
                Some(idx) => indices.push(idx),
                None => config_bail!("no channel named `{name}`"),
            }
        }
        self.pick(&indices)
    }

    /// Keep the channels whose mask entry is `true`.
    pub fn pick_mask(&self, mask: &[bool]) -> Result<Self> {
        if mask.len() != self.n_channels() {
            config_bail!("mask has {} entries for {} channels", mask.len(), self.n_channels());
        }
        let indices: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(i, &keep)| keep.then_some(i))
            .collect();
        self.pick(&indices)
    }
}

pub(crate) fn default_names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("ch{i}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series() -> EpochedSeries {
        let data = Array3::from_shape_fn((3, 4, 50), |(e, c, t)| {
            (e * 100 + c * 10) as f64 + t as f64 * 0.01
        });
        let names = vec!["Fp1".into(), "Fp2".into(), "Cz".into(), "Oz".into()];
        EpochedSeries::new(data, 100.0, -0.2, names).unwrap()
    }

    #[test]
    fn shape_and_time_axis() {
        let x = series();
        assert_eq!((x.n_epochs(), x.n_channels(), x.n_times()), (3, 4, 50));
        let t = x.times();
        approx::assert_abs_diff_eq!(t[0], -0.2, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(t[20], 0.0, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(x.nyquist(), 50.0);
    }

    #[test]
    fn pick_keeps_order_and_names() {
        let x = series().pick(&[3, 0]).unwrap();
        assert_eq!(x.ch_names(), &["Oz".to_string(), "Fp1".to_string()]);
        approx::assert_abs_diff_eq!(x.signal(1, 0)[0], 130.0);
        approx::assert_abs_diff_eq!(x.signal(1, 1)[0], 100.0);
    }

    #[test]
    fn pick_names_ignores_case_and_spaces() {
        let x = series().pick_names(&["fp 2", "CZ"]).unwrap();
        assert_eq!(x.ch_names(), &["Fp2".to_string(), "Cz".to_string()]);
    }

    #[test]
    fn empty_or_unknown_selection_fails() {
        let x = series();
        assert!(x.pick(&[]).is_err());
        assert!(x.pick(&[9]).is_err());
        assert!(x.pick_names(&["T7"]).is_err());
        assert!(x.pick_mask(&[false; 4]).is_err());
        assert_eq!(x.pick_mask(&[true, false, true, false]).unwrap().n_channels(), 2);
    }

    #[test]
    fn from_epochs_rejects_ragged_input() {
        let a = Array2::zeros((2, 10));
        let b = Array2::zeros((2, 11));
        assert!(EpochedSeries::from_epochs(&[a.clone(), b], 10.0, 0.0, default_names(2)).is_err());
        let ok = EpochedSeries::from_epochs(&[a.clone(), a], 10.0, 0.0, default_names(2)).unwrap();
        assert_eq!(ok.n_epochs(), 2);
    }

    #[test]
    fn invalid_metadata_fails() {
        let data = Array3::zeros((1, 2, 10));
        assert!(EpochedSeries::with_default_names(data.clone(), 0.0, 0.0).is_err());
        assert!(EpochedSeries::with_default_names(data.clone(), 10.0, f64::NAN).is_err());
        assert!(EpochedSeries::new(data, 10.0, 0.0, vec!["a".into()]).is_err());
    }
}
