//! Error type shared by every estimator.
//!
//! All checks run before any numerical work starts, so an `Err` never comes
//! with a partially filled result.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpectralError {
    /// Invalid parameter: frequency range, lengths, overlap, mode, selection.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The data is too short (or the window lies outside it) for the request.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// The request is well-formed but numerically meaningless
    /// (zero-energy window, frequency at or above Nyquist, zero baseline).
    #[error("numerical degeneracy: {0}")]
    NumericalDegeneracy(String),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    #[error("fft: {0}")]
    Fft(#[from] realfft::FftError),
}

pub type Result<T> = std::result::Result<T, SpectralError>;

/// `return Err(SpectralError::Configuration(format!(...)))`.
macro_rules! config_bail {
    ($($arg:tt)*) => {
        return Err($crate::error::SpectralError::Configuration(format!($($arg)*)))
    };
}

/// `return Err(SpectralError::InsufficientData(format!(...)))`.
macro_rules! data_bail {
    ($($arg:tt)*) => {
        return Err($crate::error::SpectralError::InsufficientData(format!($($arg)*)))
    };
}

/// `return Err(SpectralError::NumericalDegeneracy(format!(...)))`.
macro_rules! degenerate_bail {
    ($($arg:tt)*) => {
        return Err($crate::error::SpectralError::NumericalDegeneracy(format!($($arg)*)))
    };
}

pub(crate) use {config_bail, data_bail, degenerate_bail};
