//! FFT-based wavelet convolution and the epoch reductions built on it.
//!
//! Each signal is convolved with every wavelet of the bank through one
//! shared complex FFT of length `next_pow2(n_times + max_wavelet_len − 1)`,
//! which makes the convolution linear (no circular wrap).  The output is
//! aligned so that sample `t` is the wavelet centred on input sample `t`
//! ("same" mode), then decimated.
//!
//! Edge policy: the signal is implicitly zero-padded.  The first and last
//! [`Wavelet::half_width`](super::Wavelet::half_width) samples of each
//! frequency row mix in those zeros and are less reliable; see
//! [`TfrResult::edge_mask`].
//!
//! Power and ITC are reduced incrementally: each `rayon` worker folds whole
//! epochs into its own `[C, F, T]` accumulators, and the accumulators are
//! summed at the end.  The full `[E, C, F, T]` coefficient array is never
//! materialised.
use log::{debug, warn};
use ndarray::{s, Array2, Array3, Array4, Zip};
use rayon::prelude::*;
use rustfft::num_complex::Complex64;

use super::morlet::WaveletBank;
use super::{EpochsTfr, TfrResult};
use crate::epochs::EpochedSeries;
use crate::error::{config_bail, data_bail, Result};
use crate::fft::ComplexFft;

/// Wavelet spectra planned for signals of one length.
pub(crate) struct Convolver<'a> {
    bank: &'a WaveletBank,
    fft: ComplexFft,
    kernels: Vec<Vec<Complex64>>,
    n_times: usize,
    decim: usize,
}

impl<'a> Convolver<'a> {
    pub(crate) fn new(bank: &'a WaveletBank, n_times: usize, decim: usize) -> Result<Self> {
        if decim == 0 {
            config_bail!("decimation factor must be at least 1");
        }
        if bank.is_empty() {
            config_bail!("wavelet bank is empty");
        }
        for w in bank.wavelets() {
            if w.len() > n_times {
                data_bail!(
                    "the {:.3} Hz wavelet ({} samples, {:.3} s) is longer than the signal \
                     ({n_times} samples); use fewer cycles or longer epochs",
                    w.freq,
                    w.len(),
                    w.len() as f64 / bank.sfreq()
                );
            }
            if 2 * w.half_width() >= n_times {
                warn!("{:.3} Hz: every output sample lies within the wavelet edge region", w.freq);
            }
        }

        let n_fft = (n_times + bank.max_len() - 1).next_power_of_two();
        let fft = ComplexFft::new(n_fft);
        let kernels = bank.wavelets().iter().map(|w| fft.forward(&w.samples)).collect();
        Ok(Self { bank, fft, kernels, n_times, decim })
    }

    /// Number of output samples after decimation.
    pub(crate) fn n_out(&self) -> usize {
        self.n_times.div_ceil(self.decim)
    }

    /// `[freq, time]` complex coefficients of one signal.
    pub(crate) fn transform(&self, x: &[f64]) -> Array2<Complex64> {
        let spectrum = self.fft.forward_real(x);
        let mut out = Array2::<Complex64>::zeros((self.kernels.len(), self.n_out()));
        let mut buf = vec![Complex64::default(); self.fft.len()];

        for (i, (kernel, wavelet)) in self.kernels.iter().zip(self.bank.wavelets()).enumerate() {
            for ((b, &x), &k) in buf.iter_mut().zip(&spectrum).zip(kernel) {
                *b = x * k;
            }
            self.fft.inverse(&mut buf);
            let start = wavelet.half_width();
            for (j, t) in (0..self.n_times).step_by(self.decim).enumerate() {
                out[[i, j]] = buf[start + t];
            }
        }
        out
    }
}

/// Complex wavelet coefficients of a single signal, `[freq, time]`.
///
/// # Errors
///
/// `Configuration` if `decim == 0`; `InsufficientData` if any wavelet is
/// longer than `signal`.
pub fn cwt(signal: &[f64], bank: &WaveletBank, decim: usize) -> Result<Array2<Complex64>> {
    let conv = Convolver::new(bank, signal.len(), decim)?;
    Ok(conv.transform(signal))
}

/// Per-worker running sums.
struct Accumulator {
    power: Array3<f64>,
    phase: Option<Array3<Complex64>>,
}

impl Accumulator {
    fn zeros(shape: (usize, usize, usize), with_phase: bool) -> Self {
        Self {
            power: Array3::zeros(shape),
            phase: with_phase.then(|| Array3::zeros(shape)),
        }
    }

    fn add_channel(&mut self, c: usize, coefs: &Array2<Complex64>) {
        Zip::from(self.power.slice_mut(s![c, .., ..]))
            .and(coefs)
            .for_each(|p, z| *p += z.norm_sqr());
        if let Some(phase) = self.phase.as_mut() {
            Zip::from(phase.slice_mut(s![c, .., ..]))
                .and(coefs)
                .for_each(|acc, z| {
                    let mag = z.norm();
                    if mag > 0.0 {
                        *acc += *z / mag;
                    }
                });
        }
    }

    fn merge(mut self, other: Self) -> Self {
        self.power += &other.power;
        if let (Some(a), Some(b)) = (self.phase.as_mut(), other.phase.as_ref()) {
            *a += b;
        }
        self
    }
}

fn check_rates(epochs: &EpochedSeries, bank: &WaveletBank) -> Result<()> {
    let (a, b) = (epochs.sfreq(), bank.sfreq());
    if (a - b).abs() > 1e-9 * a.max(b) {
        config_bail!("wavelet bank built for {b} Hz but data is sampled at {a} Hz");
    }
    Ok(())
}

fn decimated_times(epochs: &EpochedSeries, decim: usize) -> Vec<f64> {
    epochs.times().into_iter().step_by(decim).collect()
}

/// Epoch-averaged Morlet power and, optionally, inter-trial coherence.
///
/// * power `[C, F, T']` = mean over epochs of `|C|²`
/// * ITC   `[C, F, T']` = `|mean over epochs of C / |C||`, in `[0, 1]`
///
/// with `T' = ⌈T / decim⌉`.
///
/// # Errors
///
/// * `Configuration`: `decim == 0`, bank/data sampling rates differ.
/// * `InsufficientData`: a wavelet is longer than the epochs.
pub fn tfr_morlet(
    epochs: &EpochedSeries,
    bank: &WaveletBank,
    decim: usize,
    return_itc: bool,
) -> Result<TfrResult> {
    check_rates(epochs, bank)?;
    let (n_e, n_c, n_t) = epochs.data().dim();
    let conv = Convolver::new(bank, n_t, decim)?;
    let shape = (n_c, bank.len(), conv.n_out());
    debug!(
        "tfr_morlet: [{n_e}, {n_c}, {n_t}] @ {} Hz, {} wavelets (max {} samples), \
         decim={decim}, itc={return_itc}",
        epochs.sfreq(),
        bank.len(),
        bank.max_len()
    );

    let total = (0..n_e)
        .into_par_iter()
        .fold(
            || Accumulator::zeros(shape, return_itc),
            |mut acc, e| {
                for c in 0..n_c {
                    let coefs = conv.transform(&epochs.signal(e, c).to_vec());
                    acc.add_channel(c, &coefs);
                }
                acc
            },
        )
        .reduce(|| Accumulator::zeros(shape, return_itc), Accumulator::merge);

    let inv = 1.0 / n_e as f64;
    let power = total.power * inv;
    let itc = total.phase.map(|p| p.mapv(|z| (z.norm() * inv).min(1.0)));

    Ok(TfrResult {
        freqs: bank.freqs(),
        times: decimated_times(epochs, decim),
        power,
        itc,
        n_epochs: n_e,
        decim,
        n_input_times: n_t,
        half_widths: bank.wavelets().iter().map(|w| w.half_width()).collect(),
    })
}

/// Per-epoch Morlet power `[E, C, F, T']`, without averaging.
pub fn tfr_morlet_epochs(
    epochs: &EpochedSeries,
    bank: &WaveletBank,
    decim: usize,
) -> Result<EpochsTfr> {
    check_rates(epochs, bank)?;
    let (n_e, n_c, n_t) = epochs.data().dim();
    let conv = Convolver::new(bank, n_t, decim)?;
    let n_out = conv.n_out();

    let per_epoch: Vec<Array3<f64>> = (0..n_e)
        .into_par_iter()
        .map(|e| {
            let mut p = Array3::<f64>::zeros((n_c, bank.len(), n_out));
            for c in 0..n_c {
                let coefs = conv.transform(&epochs.signal(e, c).to_vec());
                p.slice_mut(s![c, .., ..]).assign(&coefs.mapv(|z| z.norm_sqr()));
            }
            p
        })
        .collect();

    let mut power = Array4::<f64>::zeros((n_e, n_c, bank.len(), n_out));
    for (e, p) in per_epoch.iter().enumerate() {
        power.slice_mut(s![e, .., .., ..]).assign(p);
    }
    Ok(EpochsTfr {
        freqs: bank.freqs(),
        times: decimated_times(epochs, decim),
        power,
        decim,
        n_input_times: n_t,
        half_widths: bank.wavelets().iter().map(|w| w.half_width()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tfr::NCycles;
    use std::f64::consts::PI;

    /// Textbook O(N·L) "same"-mode convolution.
    fn direct_same(x: &[f64], w: &[Complex64]) -> Vec<Complex64> {
        let (n, l) = (x.len(), w.len());
        let start = (l - 1) / 2;
        (0..n)
            .map(|t| {
                let m = t + start;
                (0..n)
                    .filter(|&k| m >= k && m - k < l)
                    .map(|k| w[m - k] * x[k])
                    .sum()
            })
            .collect()
    }

    #[test]
    fn fft_path_matches_direct_convolution() {
        let sfreq = 100.0;
        let x: Vec<f64> = (0..120)
            .map(|i| (0.31 * i as f64).sin() + 0.5 * (0.07 * i as f64 * i as f64).cos())
            .collect();
        let bank =
            WaveletBank::morlet(sfreq, &[8.0, 15.0, 30.0], &NCycles::Fixed(4.0), false).unwrap();
        let fast = cwt(&x, &bank, 1).unwrap();
        for (i, w) in bank.wavelets().iter().enumerate() {
            let slow = direct_same(&x, &w.samples);
            for (t, z) in slow.iter().enumerate() {
                let d = (fast[[i, t]] - z).norm();
                assert!(d < 1e-10, "freq {i} t {t}: |Δ| = {d:.2e}");
            }
        }
    }

    #[test]
    fn decimation_keeps_every_dth_sample() {
        let x: Vec<f64> = (0..101).map(|i| (2.0 * PI * 10.0 * i as f64 / 100.0).sin()).collect();
        let bank = WaveletBank::morlet(100.0, &[10.0], &NCycles::Fixed(3.0), false).unwrap();
        let full = cwt(&x, &bank, 1).unwrap();
        let dec = cwt(&x, &bank, 4).unwrap();
        assert_eq!(dec.ncols(), 26);
        for j in 0..dec.ncols() {
            assert_eq!(dec[[0, j]], full[[0, 4 * j]]);
        }
    }

    #[test]
    fn sinusoid_power_flat_in_interior() {
        let sfreq = 200.0;
        let x: Vec<f64> = (0..400).map(|i| (2.0 * PI * 10.0 * i as f64 / sfreq).cos()).collect();
        let bank = WaveletBank::morlet(sfreq, &[10.0], &NCycles::Fixed(5.0), false).unwrap();
        let c = cwt(&x, &bank, 1).unwrap();
        let h = bank.wavelets()[0].half_width();
        let p: Vec<f64> = (h..400 - h).map(|t| c[[0, t]].norm_sqr()).collect();
        let (lo, hi) = p.iter().fold((f64::MAX, f64::MIN), |(a, b), &v| (a.min(v), b.max(v)));
        assert!((hi - lo) / hi < 1e-3, "interior power varies: {lo}..{hi}");
    }

    #[test]
    fn errors_are_eager() {
        let bank = WaveletBank::morlet(100.0, &[2.0], &NCycles::Fixed(7.0), false).unwrap();
        let short = vec![0.0; 50];
        assert!(matches!(cwt(&short, &bank, 1), Err(crate::SpectralError::InsufficientData(_))));
        let long = vec![0.0; 5000];
        assert!(matches!(cwt(&long, &bank, 0), Err(crate::SpectralError::Configuration(_))));
    }
}
