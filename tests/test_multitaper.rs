mod common;
use common::{noise, phase_locked};
use exg_spectral::{psd_multitaper, psd_welch, EpochedSeries, MultitaperConfig, WelchConfig};
use ndarray::{s, Array2};

/// Mean over interior bins of (std across epochs / mean across epochs).
fn relative_spread(mean: &Array2<f64>, std: &Array2<f64>) -> f64 {
    let n_f = mean.ncols();
    let rel = &std.slice(s![0, 2..n_f - 2]) / &mean.slice(s![0, 2..n_f - 2]);
    rel.mean().unwrap()
}

#[test]
fn peak_matches_welch() {
    let x = phase_locked(10, 1, 400, 200.0, 0.0, 10.0, 1.0, 0.5, 11);
    let welch = psd_welch(&x, &WelchConfig {
        fmin: 2.0,
        fmax: 40.0,
        n_per_seg: Some(100),
        overlap: 0.5,
        ..WelchConfig::default()
    })
    .unwrap();
    // 1 Hz bandwidth over 2 s keeps a single, unimodal taper.
    let mt = psd_multitaper(&x, &MultitaperConfig {
        fmin: 2.0,
        fmax: 40.0,
        bandwidth: Some(1.0),
        ..MultitaperConfig::default()
    })
    .unwrap();
    let pw = welch.peak_frequency(0).unwrap();
    let pm = mt.peak_frequency(0).unwrap();
    approx::assert_abs_diff_eq!(pw, 10.0, epsilon = 1e-9);
    approx::assert_abs_diff_eq!(pm, pw, epsilon = 1e-9);
}

#[test]
fn lower_variance_than_single_window_periodogram() {
    // Same resolution: one Hann window over the whole epoch vs. 7 DPSS tapers.
    let n_t = 400;
    let x = EpochedSeries::with_default_names(noise((30, 1, n_t), 1.0, 12), 200.0, 0.0).unwrap();
    let cfg = WelchConfig { n_per_seg: Some(n_t), ..WelchConfig::default() };
    let welch = psd_welch(&x, &cfg).unwrap();
    let mt = psd_multitaper(&x, &MultitaperConfig::default()).unwrap();
    assert_eq!(welch.freqs.len(), mt.freqs.len());

    let rw = relative_spread(&welch.mean_over_epochs(), &welch.std_over_epochs());
    let rm = relative_spread(&mt.mean_over_epochs(), &mt.std_over_epochs());
    assert!(rm < 0.6 * rw, "multitaper spread {rm:.3} vs Welch {rw:.3}");
}

#[test]
fn adaptive_and_fixed_agree_on_white_noise() {
    let x = EpochedSeries::with_default_names(noise((5, 2, 512), 1.0, 13), 256.0, 0.0).unwrap();
    let fixed = psd_multitaper(&x, &MultitaperConfig::default()).unwrap().mean_over_epochs();
    let cfg = MultitaperConfig { adaptive: true, ..MultitaperConfig::default() };
    let adaptive = psd_multitaper(&x, &cfg).unwrap().mean_over_epochs();
    let f = fixed.slice(s![.., 1..]).mean().unwrap();
    let a = adaptive.slice(s![.., 1..]).mean().unwrap();
    approx::assert_relative_eq!(a, f, max_relative = 0.05);
}

#[test]
fn bandwidth_sets_taper_count() {
    // Wider bandwidth averages more tapers: the spread across epochs drops.
    let x = EpochedSeries::with_default_names(noise((30, 1, 400), 1.0, 14), 200.0, 0.0).unwrap();
    let spread = |bandwidth| {
        let cfg = MultitaperConfig { bandwidth: Some(bandwidth), ..MultitaperConfig::default() };
        let r = psd_multitaper(&x, &cfg).unwrap();
        relative_spread(&r.mean_over_epochs(), &r.std_over_epochs())
    };
    assert!(spread(8.0) < spread(2.0));
}
