/// Shared synthetic-signal generators.
use exg_spectral::EpochedSeries;
use ndarray::{Array, Array3, Dimension};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;

pub const SEED: u64 = 0x5eed_e7e6;

pub fn rng(salt: u64) -> StdRng {
    StdRng::seed_from_u64(SEED ^ salt)
}

#[allow(unused)]
/// `[E, C, T]` white Gaussian noise with standard deviation `sd`.
pub fn noise(shape: (usize, usize, usize), sd: f64, salt: u64) -> Array3<f64> {
    let mut r = rng(salt);
    let normal = Normal::new(0.0, sd).unwrap();
    Array3::from_shape_simple_fn(shape, || normal.sample(&mut r))
}

#[allow(unused)]
/// Sine of `freq` Hz and amplitude `amp` in every epoch and channel, with the
/// same phase at the trigger (`t = 0`), plus white noise.
pub fn phase_locked(
    n_epochs: usize,
    n_channels: usize,
    n_times: usize,
    sfreq: f64,
    tmin: f64,
    freq: f64,
    amp: f64,
    noise_sd: f64,
    salt: u64,
) -> EpochedSeries {
    let mut data = noise((n_epochs, n_channels, n_times), noise_sd, salt);
    for ((_, _, t), v) in data.indexed_iter_mut() {
        let time = tmin + t as f64 / sfreq;
        *v += amp * (2.0 * PI * freq * time).sin();
    }
    EpochedSeries::with_default_names(data, sfreq, tmin).unwrap()
}

#[allow(unused)]
/// Like [`phase_locked`] but each epoch/channel gets a uniform random phase.
pub fn random_phase(
    n_epochs: usize,
    n_channels: usize,
    n_times: usize,
    sfreq: f64,
    freq: f64,
    salt: u64,
) -> EpochedSeries {
    let mut r = rng(salt);
    let mut data = Array3::<f64>::zeros((n_epochs, n_channels, n_times));
    for e in 0..n_epochs {
        for c in 0..n_channels {
            let phi: f64 = r.gen_range(0.0..2.0 * PI);
            for t in 0..n_times {
                data[[e, c, t]] = (2.0 * PI * freq * t as f64 / sfreq + phi).sin();
            }
        }
    }
    EpochedSeries::with_default_names(data, sfreq, 0.0).unwrap()
}

#[allow(unused)]
/// Maximum absolute difference between two arrays.
pub fn max_abs_diff<D: Dimension>(a: &Array<f64, D>, b: &Array<f64, D>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).fold(0.0_f64, f64::max)
}

#[allow(unused)]
/// Index of the bin closest to `f`.
pub fn bin_of(freqs: &[f64], f: f64) -> usize {
    freqs
        .iter()
        .enumerate()
        .min_by(|a, b| (a.1 - f).abs().total_cmp(&(b.1 - f).abs()))
        .map(|(i, _)| i)
        .unwrap()
}
