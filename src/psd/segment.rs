//! Splitting one channel of one epoch into Welch segments.
//!
//! Segments of `n` samples start every `step = round(n · (1 − overlap))`
//! samples (at least 1).  The last segment is the one that still fits
//! entirely; any trailing partial tail is dropped, never zero-padded:
//!
//! ```text
//!   S = ⌊(L − n) / step⌋ + 1
//! ```
use crate::error::{config_bail, data_bail, Result};

/// A contiguous run of samples and where it starts in the source signal.
#[derive(Debug, Clone, Copy)]
pub struct Segment<'a> {
    pub offset: usize,
    pub samples: &'a [f64],
}

/// Hop between consecutive segment starts.
pub fn segment_step(n: usize, overlap: f64) -> usize {
    ((n as f64 * (1.0 - overlap)).round() as usize).max(1)
}

/// Number of whole segments of `n` samples in a signal of `len` samples.
///
/// # Errors
///
/// * `Configuration` if `n == 0` or `overlap ∉ [0, 1)`.
/// * `InsufficientData` if `n > len`.
pub fn segment_count(len: usize, n: usize, overlap: f64) -> Result<usize> {
    validate(len, n, overlap)?;
    Ok((len - n) / segment_step(n, overlap) + 1)
}

/// Split `x` into overlapping segments of `n` samples.
pub fn segments(x: &[f64], n: usize, overlap: f64) -> Result<Vec<Segment<'_>>> {
    let count = segment_count(x.len(), n, overlap)?;
    let step = segment_step(n, overlap);
    Ok((0..count)
        .map(|s| {
            let offset = s * step;
            Segment { offset, samples: &x[offset..offset + n] }
        })
        .collect())
}

fn validate(len: usize, n: usize, overlap: f64) -> Result<()> {
    if n == 0 {
        config_bail!("segment length must be positive");
    }
    if !(0.0..1.0).contains(&overlap) {
        config_bail!("overlap must lie in [0, 1), got {overlap}");
    }
    if n > len {
        data_bail!("segment length {n} exceeds signal length {len}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_overlap_count() {
        // 200 samples, 100-sample segments, 50 % overlap → starts 0, 50, 100.
        assert_eq!(segment_count(200, 100, 0.5).unwrap(), 3);
        let x: Vec<f64> = (0..200).map(|i| i as f64).collect();
        let segs = segments(&x, 100, 0.5).unwrap();
        let offsets: Vec<usize> = segs.iter().map(|s| s.offset).collect();
        assert_eq!(offsets, vec![0, 50, 100]);
        assert_eq!(segs[2].samples[0], 100.0);
        assert_eq!(segs[2].samples.len(), 100);
    }

    #[test]
    fn tail_is_discarded() {
        // 250 samples, no overlap → 2 segments, 50 trailing samples dropped.
        assert_eq!(segment_count(250, 100, 0.0).unwrap(), 2);
    }

    #[test]
    fn whole_signal_is_one_segment() {
        assert_eq!(segment_count(64, 64, 0.75).unwrap(), 1);
    }

    #[test]
    fn step_never_zero() {
        assert_eq!(segment_step(4, 0.99), 1);
        assert_eq!(segment_count(10, 4, 0.99).unwrap(), 7);
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(segment_count(10, 20, 0.0).is_err());
        assert!(segment_count(10, 0, 0.0).is_err());
        assert!(segment_count(10, 5, 1.0).is_err());
        assert!(segment_count(10, 5, -0.1).is_err());
    }
}
