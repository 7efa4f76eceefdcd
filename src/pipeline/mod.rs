//! Processing stages.
//!
//! Every stage is a free function that mutates a [`SpectralMap`](crate::data::SpectralMap)
//! in place and records its [`ops::ProcessingOp`] in the reproducibility log.

pub mod baseline;
pub mod crop;
pub mod decomposition;
pub mod kmeans;
pub mod linearize;
pub mod morphology;
pub mod ops;
pub mod progress;
pub mod smoothing;
pub mod spikes;
pub mod water;
