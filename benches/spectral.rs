use std::hint::black_box;
use criterion::{criterion_group, criterion_main, Criterion};
use exg_spectral::{
    psd_multitaper, psd_welch, tfr_morlet, EpochedSeries, MultitaperConfig, NCycles, WaveletBank,
    WelchConfig, log_freqs,
};
use ndarray::Array3;
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// 20 epochs × 32 channels × 2 s at 256 Hz.
fn epochs() -> EpochedSeries {
    let mut rng = StdRng::seed_from_u64(7);
    let normal = Normal::new(0.0, 1.0).unwrap();
    let data = Array3::from_shape_simple_fn((20, 32, 512), || normal.sample(&mut rng));
    EpochedSeries::with_default_names(data, 256.0, -0.5).unwrap()
}

fn bench_welch(c: &mut Criterion) {
    let x = epochs();
    let cfg = WelchConfig { n_per_seg: Some(128), overlap: 0.5, ..WelchConfig::default() };
    c.bench_function("psd_welch [20×32×512] seg=128 ovl=0.5", |b| {
        b.iter(|| black_box(psd_welch(black_box(&x), &cfg).unwrap().freqs.len()))
    });
}

fn bench_multitaper(c: &mut Criterion) {
    let x = epochs();
    let fixed = MultitaperConfig::default();
    let adaptive = MultitaperConfig { adaptive: true, ..MultitaperConfig::default() };
    c.bench_function("psd_multitaper [20×32×512] NW=4", |b| {
        b.iter(|| black_box(psd_multitaper(black_box(&x), &fixed).unwrap().freqs.len()))
    });
    c.bench_function("psd_multitaper adaptive [20×32×512] NW=4", |b| {
        b.iter(|| black_box(psd_multitaper(black_box(&x), &adaptive).unwrap().freqs.len()))
    });
}

fn bench_tfr(c: &mut Criterion) {
    let x = epochs();
    let freqs = log_freqs(6.0, 40.0, 16);
    let bank = WaveletBank::morlet(256.0, &freqs, &NCycles::Fixed(5.0), false).unwrap();
    c.bench_function("tfr_morlet [20×32×512] 16 freqs + ITC", |b| {
        b.iter(|| black_box(tfr_morlet(black_box(&x), &bank, 1, true).unwrap().power.len()))
    });
}

criterion_group!(benches, bench_welch, bench_multitaper, bench_tfr);
criterion_main!(benches);
