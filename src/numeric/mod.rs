//! Numerical kernels shared by the processing stages.
//!
//! Everything here works on plain slices or ndarray views and knows nothing
//! about spectral maps.

pub mod banded;
pub mod dense;
pub mod eigen;
pub mod polyfit;
pub mod spline;
pub mod stats;
