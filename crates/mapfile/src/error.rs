//! Container errors.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Not a spectral map container (magic {0:?})")]
    BadMagic([u8; 4]),
    #[error("Unsupported container version {0}")]
    UnsupportedVersion(u16),
    #[error("Unrecognised byte-order marker {0}")]
    BadByteOrder(f32),
    #[error("Data truncated: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },
    #[error("{what} length mismatch: expected {expected}, got {got}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("Invalid shape {rows}×{cols}×{bins}: {reason}")]
    InvalidShape {
        rows: usize,
        cols: usize,
        bins: usize,
        reason: &'static str,
    },
    #[error("Unit label '{0}' exceeds {max} bytes", max = crate::header::UNIT_BYTES)]
    UnitTooLong(String),
}
