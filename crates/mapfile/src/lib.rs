//! Spectral map container: fixed header, x-axis and intensity tensor.
//!
//! The layout follows the "header of fixed slots, then raw numbers" idea:
//!
//! ```text
//!   0..4    magic  b"RMAP"
//!   4..6    format version (u16)
//!   6..8    reserved
//!   8..12   byte-order marker (f32, 2.345)
//!  12..16   rows  (u32)
//!  16..20   cols  (u32)
//!  20..24   bins  (u32)
//!  24..56   unit label (UTF-8, zero padded)
//!  56..64   reserved
//!  64..     x-axis: bins × f64
//!           data:   rows × cols × bins × f64, row-major pixel order
//! ```
//!
//! Files are written little-endian; the reader detects swapped files from
//! the byte-order marker.

pub mod error;
pub mod header;
pub mod reader;
pub mod writer;

pub use error::*;
pub use header::*;
pub use reader::*;
pub use writer::*;

/// A fully decoded container: header, axis and flattened tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub header: Header,
    pub x_axis: Vec<f64>,
    /// Row-major `[row][col][bin]` intensities.
    pub data: Vec<f64>,
}

impl Container {
    /// Build a container, checking that axis and data agree with the header.
    pub fn new(header: Header, x_axis: Vec<f64>, data: Vec<f64>) -> Result<Self, ContainerError> {
        if x_axis.len() != header.bins {
            return Err(ContainerError::ShapeMismatch {
                what: "x-axis",
                expected: header.bins,
                got: x_axis.len(),
            });
        }
        let expected = header.value_count()?;
        if data.len() != expected {
            return Err(ContainerError::ShapeMismatch {
                what: "data",
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            header,
            x_axis,
            data,
        })
    }
}
