//! Window and taper provider.
//!
//! - [`window`]: single periodic windows (Hann, Hamming, boxcar) applied to
//!   each Welch segment.
//! - [`dpss`]: Slepian taper sets with concentration-ratio weights for the
//!   multitaper estimator.

pub mod dpss;
pub mod window;

pub use dpss::{dpss, TaperSet, LOW_BIAS_THRESHOLD};
pub use window::{energy, window, WindowKind};
