//! Discrete prolate spheroidal sequences (Slepian tapers) for multitaper PSD.
//!
//! The tapers are the leading eigenvectors of the symmetric tridiagonal
//! matrix (Percival & Walden, eq. 378)
//!
//! ```text
//!   diag[i]   = ((N − 1 − 2i) / 2)² · cos(2πW)
//!   off[i]    = (i + 1)(N − i − 1) / 2
//! ```
//!
//! with `W = half_nbw / N`.  Eigenvalues are located by Sturm-sequence
//! bisection, eigenvectors by inverse iteration with a partially pivoted
//! tridiagonal solve (LAPACK `dgttrf` / `dgtts2`).
//!
//! The weight attached to each taper is its spectral concentration ratio
//! in `[−W, W]`, computed from the taper autocorrelation exactly as
//! `scipy.signal.windows.dpss(..., return_ratios=True)` does.
use std::f64::consts::PI;

use log::debug;
use ndarray::{Array2, ArrayView1};

use crate::error::{config_bail, Result};

/// Tapers with a concentration ratio at or below this are dropped when
/// `low_bias` is requested.
pub const LOW_BIAS_THRESHOLD: f64 = 0.9;

const INVERSE_ITERATIONS: usize = 3;
const MAX_BISECTIONS: usize = 200;

/// An ordered set of unit-energy tapers with their eigenvalue weights.
#[derive(Debug, Clone)]
pub struct TaperSet {
    /// `[K, N]`, one taper per row, each with `Σ w² = 1`.
    pub tapers: Array2<f64>,
    /// Concentration ratio per taper, in `(0, 1]`.  Sums to roughly `K`.
    pub weights: Vec<f64>,
    /// Time half-bandwidth product `N·W` used to build the set.
    pub half_nbw: f64,
}

impl TaperSet {
    pub fn n_tapers(&self) -> usize {
        self.tapers.nrows()
    }

    /// Taper length `N`.
    pub fn len(&self) -> usize {
        self.tapers.ncols()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArrayView1<'_, f64>, f64)> {
        self.tapers.rows().into_iter().zip(self.weights.iter().copied())
    }
}

/// Compute `n_tapers` DPSS tapers of length `n` for time half-bandwidth
/// `half_nbw`.
///
/// `n_tapers = None` selects `⌊2·half_nbw⌋`, the number of tapers that are
/// well concentrated in the band.  With `low_bias = true` tapers whose
/// concentration ratio is `≤ 0.9` are discarded.
///
/// # Errors
///
/// `Configuration` if `n < 2`, `half_nbw` is not in `(0, n/2)`, the taper
/// count is zero or exceeds `n`, or `low_bias` leaves no taper.
pub fn dpss(n: usize, half_nbw: f64, n_tapers: Option<usize>, low_bias: bool) -> Result<TaperSet> {
    if n < 2 {
        config_bail!("taper length must be at least 2, got {n}");
    }
    if !half_nbw.is_finite() || half_nbw <= 0.0 || half_nbw >= n as f64 / 2.0 {
        config_bail!("time half-bandwidth must lie in (0, {}), got {half_nbw}", n as f64 / 2.0);
    }
    let k_max = n_tapers.unwrap_or((2.0 * half_nbw).floor() as usize);
    if k_max == 0 {
        config_bail!("time half-bandwidth {half_nbw} yields no tapers (need N·W ≥ 0.5)");
    }
    if k_max > n {
        config_bail!("cannot compute {k_max} tapers of length {n}");
    }

    let w = half_nbw / n as f64;
    let (diag, off) = slepian_tridiagonal(n, w);

    let mut vectors: Vec<Vec<f64>> = Vec::with_capacity(k_max);
    for k in 0..k_max {
        // k-th largest eigenvalue = index n-1-k in ascending order.
        let lambda = bisect_eigenvalue(&diag, &off, n - 1 - k);
        let mut v = inverse_iteration(&diag, &off, lambda, &vectors);
        fix_sign(&mut v, k);
        vectors.push(v);
    }

    let ratios: Vec<f64> = vectors.iter().map(|v| concentration(v, w)).collect();
    debug!("dpss: n={n} half_nbw={half_nbw} ratios={ratios:?}");

    let keep: Vec<usize> = if low_bias {
        (0..k_max).filter(|&k| ratios[k] > LOW_BIAS_THRESHOLD).collect()
    } else {
        (0..k_max).collect()
    };
    if keep.is_empty() {
        config_bail!(
            "no taper has concentration above {LOW_BIAS_THRESHOLD} for N·W = {half_nbw}; \
             increase the bandwidth"
        );
    }

    let mut tapers = Array2::<f64>::zeros((keep.len(), n));
    let mut weights = Vec::with_capacity(keep.len());
    for (row, &k) in keep.iter().enumerate() {
        tapers.row_mut(row).assign(&ArrayView1::from(&vectors[k]));
        weights.push(ratios[k].clamp(f64::MIN_POSITIVE, 1.0));
    }
    Ok(TaperSet { tapers, weights, half_nbw })
}

// ── Tridiagonal eigen-solver ─────────────────────────────────────────────────

fn slepian_tridiagonal(n: usize, w: f64) -> (Vec<f64>, Vec<f64>) {
    let cos_w = (2.0 * PI * w).cos();
    let diag = (0..n)
        .map(|i| {
            let h = (n as f64 - 1.0 - 2.0 * i as f64) / 2.0;
            h * h * cos_w
        })
        .collect();
    let off = (1..n)
        .map(|i| i as f64 * (n - i) as f64 / 2.0)
        .collect();
    (diag, off)
}

/// Number of eigenvalues strictly below `x` (Sturm sequence count).
fn sturm_count(diag: &[f64], off: &[f64], x: f64, pivmin: f64) -> usize {
    let mut count = 0;
    let mut q = diag[0] - x;
    if q.abs() < pivmin {
        q = -pivmin;
    }
    if q < 0.0 {
        count += 1;
    }
    for i in 1..diag.len() {
        q = diag[i] - x - off[i - 1] * off[i - 1] / q;
        if q.abs() < pivmin {
            q = -pivmin;
        }
        if q < 0.0 {
            count += 1;
        }
    }
    count
}

/// The eigenvalue with ascending index `j`.
fn bisect_eigenvalue(diag: &[f64], off: &[f64], j: usize) -> f64 {
    let n = diag.len();
    let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
    for i in 0..n {
        let left = if i > 0 { off[i - 1].abs() } else { 0.0 };
        let right = if i + 1 < n { off[i].abs() } else { 0.0 };
        lo = lo.min(diag[i] - left - right);
        hi = hi.max(diag[i] + left + right);
    }
    let max_off_sq = off.iter().map(|e| e * e).fold(1.0_f64, f64::max);
    let pivmin = f64::MIN_POSITIVE * max_off_sq;
    let tol = 4.0 * f64::EPSILON * lo.abs().max(hi.abs()).max(1.0);

    for _ in 0..MAX_BISECTIONS {
        if hi - lo <= tol {
            break;
        }
        let mid = 0.5 * (lo + hi);
        if sturm_count(diag, off, mid, pivmin) > j {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    0.5 * (lo + hi)
}

/// Unit-norm eigenvector for `lambda`, orthogonalised against `previous`.
fn inverse_iteration(diag: &[f64], off: &[f64], lambda: f64, previous: &[Vec<f64>]) -> Vec<f64> {
    let n = diag.len();
    let lu = TridiagonalLu::factor(diag, off, lambda);

    // Start vector with both even and odd components.
    let mut v: Vec<f64> = (0..n).map(|i| 1.0 + i as f64 / n as f64).collect();
    for _ in 0..INVERSE_ITERATIONS {
        lu.solve(&mut v);
        for p in previous {
            let dot: f64 = v.iter().zip(p).map(|(a, b)| a * b).sum();
            v.iter_mut().zip(p).for_each(|(a, b)| *a -= dot * b);
        }
        let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
    }
    v
}

/// LU factorisation with partial pivoting of `T − λI`.
struct TridiagonalLu {
    dl: Vec<f64>,
    d: Vec<f64>,
    du: Vec<f64>,
    du2: Vec<f64>,
    swapped: Vec<bool>,
}

impl TridiagonalLu {
    fn factor(diag: &[f64], off: &[f64], lambda: f64) -> Self {
        let n = diag.len();
        let mut d: Vec<f64> = diag.iter().map(|v| v - lambda).collect();
        let mut dl = off.to_vec();
        let mut du = off.to_vec();
        let mut du2 = vec![0.0; n.saturating_sub(2)];
        let mut swapped = vec![false; n - 1];

        for i in 0..n - 1 {
            if d[i].abs() >= dl[i].abs() {
                if d[i] != 0.0 {
                    let fact = dl[i] / d[i];
                    dl[i] = fact;
                    d[i + 1] -= fact * du[i];
                }
            } else {
                let fact = d[i] / dl[i];
                d[i] = dl[i];
                dl[i] = fact;
                let temp = du[i];
                du[i] = d[i + 1];
                d[i + 1] = temp - fact * d[i + 1];
                if i + 2 < n {
                    du2[i] = du[i + 1];
                    du[i + 1] = -fact * du[i + 1];
                }
                swapped[i] = true;
            }
        }

        // T − λI is singular to working precision; nudge zero pivots.
        let scale = diag.iter().fold(1.0_f64, |m, v| m.max(v.abs()));
        let eps = f64::EPSILON * scale;
        for p in d.iter_mut() {
            if p.abs() < eps {
                *p = if *p < 0.0 { -eps } else { eps };
            }
        }
        Self { dl, d, du, du2, swapped }
    }

    fn solve(&self, b: &mut [f64]) {
        let n = b.len();
        for i in 0..n - 1 {
            if self.swapped[i] {
                let temp = b[i];
                b[i] = b[i + 1];
                b[i + 1] = temp - self.dl[i] * b[i];
            } else {
                b[i + 1] -= self.dl[i] * b[i];
            }
        }
        b[n - 1] /= self.d[n - 1];
        b[n - 2] = (b[n - 2] - self.du[n - 2] * b[n - 1]) / self.d[n - 2];
        for i in (0..n.saturating_sub(2)).rev() {
            b[i] = (b[i] - self.du[i] * b[i + 1] - self.du2[i] * b[i + 2]) / self.d[i];
        }
    }
}

// ── Post-processing ──────────────────────────────────────────────────────────

/// Even tapers get a positive sum, odd tapers a positive first lobe.
fn fix_sign(v: &mut [f64], k: usize) {
    let flip = if k % 2 == 0 {
        v.iter().sum::<f64>() < 0.0
    } else {
        let thresh = (1.0 / v.len() as f64).max(1e-7);
        v.iter().find(|x| *x * *x > thresh).is_some_and(|x| *x < 0.0)
    };
    if flip {
        v.iter_mut().for_each(|x| *x = -*x);
    }
}

/// Fraction of the taper's energy inside `|f| < W`.
fn concentration(v: &[f64], w: f64) -> f64 {
    let n = v.len();
    let mut ratio = 2.0 * w * v.iter().map(|x| x * x).sum::<f64>();
    for lag in 1..n {
        let rxx: f64 = v[..n - lag].iter().zip(&v[lag..]).map(|(a, b)| a * b).sum();
        let x = 2.0 * w * lag as f64;
        let sinc = (PI * x).sin() / (PI * x);
        ratio += 4.0 * w * sinc * rxx;
    }
    ratio
}
