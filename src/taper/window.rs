//! Single analysis windows for Welch estimation.
//!
//! All windows are generated in their periodic (DFT-even) form, which is
//! what `scipy.signal.get_window` returns for spectral analysis:
//!   Hann     w[i] = 0.5  − 0.5  · cos(2πi / N)
//!   Hamming  w[i] = 0.54 − 0.46 · cos(2πi / N)
//!   Boxcar   w[i] = 1
use std::f64::consts::PI;

use crate::error::{config_bail, degenerate_bail, Result};

/// Closed set of Welch window shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowKind {
    #[default]
    Hann,
    Hamming,
    Boxcar,
}

impl std::str::FromStr for WindowKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hann" | "hanning" => Ok(Self::Hann),
            "hamming" => Ok(Self::Hamming),
            "boxcar" | "rect" | "rectangular" => Ok(Self::Boxcar),
            other => Err(format!("unknown window `{other}`")),
        }
    }
}

/// Build a window of length `n`.
///
/// # Errors
///
/// * `Configuration` if `n < 2`.
/// * `NumericalDegeneracy` if the window has zero energy.
pub fn window(kind: WindowKind, n: usize) -> Result<Vec<f64>> {
    if n < 2 {
        config_bail!("window length must be at least 2, got {n}");
    }
    let w = match kind {
        WindowKind::Hann => cosine_window(n, 0.5, 0.5),
        WindowKind::Hamming => cosine_window(n, 0.54, 0.46),
        WindowKind::Boxcar => vec![1.0; n],
    };
    if energy(&w) <= 0.0 {
        degenerate_bail!("{kind:?} window of length {n} has zero energy");
    }
    Ok(w)
}

/// Sum of squares, the Welch density normaliser.
pub fn energy(w: &[f64]) -> f64 {
    w.iter().map(|v| v * v).sum()
}

fn cosine_window(n: usize, a0: f64, a1: f64) -> Vec<f64> {
    (0..n)
        .map(|i| a0 - a1 * (2.0 * PI * i as f64 / n as f64).cos())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hann_is_periodic() {
        // Periodic Hann: w[0] = 0, peak 1 at n/2, w[n-i] == w[i].
        let w = window(WindowKind::Hann, 8).unwrap();
        approx::assert_abs_diff_eq!(w[0], 0.0, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(w[4], 1.0, epsilon = 1e-12);
        for i in 1..8 {
            approx::assert_abs_diff_eq!(w[i], w[8 - i], epsilon = 1e-12);
        }
    }

    #[test]
    fn hamming_endpoints() {
        let w = window(WindowKind::Hamming, 100).unwrap();
        approx::assert_abs_diff_eq!(w[0], 0.08, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(w[50], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn hann_energy_is_three_eighths_n() {
        let w = window(WindowKind::Hann, 256).unwrap();
        approx::assert_abs_diff_eq!(energy(&w), 0.375 * 256.0, epsilon = 1e-9);
    }

    #[test]
    fn too_short_is_rejected() {
        assert!(window(WindowKind::Boxcar, 1).is_err());
        assert!(window(WindowKind::Hann, 0).is_err());
    }

    #[test]
    fn parse_names() {
        assert_eq!("Hann".parse::<WindowKind>().unwrap(), WindowKind::Hann);
        assert_eq!("hamming".parse::<WindowKind>().unwrap(), WindowKind::Hamming);
        assert!("kaiser".parse::<WindowKind>().is_err());
    }
}
