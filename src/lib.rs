//! Processing engine for point-scanned spectral (Raman) maps.
//!
//! A [`SpectralMap`](data::SpectralMap) is loaded from a container file and
//! run through in-place processing stages (cropping, spike removal, baseline
//! removal, smoothing, linearization, water normalization, decomposition).
//! Every stage records itself in a [`ReproLog`](log::reproducibility::ReproLog)
//! so a session can be exported or replayed.

pub mod batch;
pub mod config;
pub mod data;
pub mod error;
pub mod log;
pub mod numeric;
pub mod pipeline;

#[cfg(test)]
mod test_support;

pub use error::{ProcessError, ProcessResult};
