//! Engine error type.

use std::io;
use thiserror::Error;

/// Everything a processing, loading or export call can fail with.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("x-axis has {axis} points but data has {bins} spectral bins")]
    ShapeMismatch { axis: usize, bins: usize },
    #[error("Spectral map is empty")]
    EmptyMap,
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("No pixel matched the water reference (distance threshold {threshold})")]
    NoWaterMatch { threshold: f64 },
    #[error("Numerical failure: {0}")]
    Numerical(String),
    #[error("No components to export; run a decomposition first")]
    NoComponents,
    #[error("Pixel ({row}, {col}): {source}")]
    Pixel {
        row: usize,
        col: usize,
        #[source]
        source: Box<ProcessError>,
    },
    #[error("Container error: {0}")]
    Container(#[from] mapfile::ContainerError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProcessError {
    /// Attach the pixel coordinate to an error raised while processing one spectrum.
    pub fn at_pixel(self, row: usize, col: usize) -> Self {
        ProcessError::Pixel {
            row,
            col,
            source: Box::new(self),
        }
    }
}

pub type ProcessResult<T> = Result<T, ProcessError>;

/// Shorthand for `Err(ProcessError::InvalidParameter(..))`.
pub(crate) fn invalid<T>(msg: impl Into<String>) -> ProcessResult<T> {
    Err(ProcessError::InvalidParameter(msg.into()))
}
