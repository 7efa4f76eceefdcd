//! Container header: 64 bytes of fixed slots.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::ContainerError;

/// Header size in bytes.
pub const HEADER_BYTES: usize = 64;
/// File magic.
pub const MAGIC: [u8; 4] = *b"RMAP";
/// Current format version.
pub const VERSION: u16 = 1;
/// Byte-order test constant.
pub const ORDER_CONS: f32 = 2.345;
/// Maximum length of the unit label in bytes.
pub const UNIT_BYTES: usize = 32;

/// Slot offsets (bytes).
mod off {
    pub const MAGIC: usize = 0;
    pub const VERSION: usize = 4;
    pub const ORDER: usize = 8;
    pub const ROWS: usize = 12;
    pub const COLS: usize = 16;
    pub const BINS: usize = 20;
    pub const UNIT: usize = 24;
}

/// Byte order detected from (or used for) a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

/// Shape and unit metadata of a stored map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub rows: usize,
    pub cols: usize,
    pub bins: usize,
    pub unit: String,
}

impl Header {
    pub fn new(rows: usize, cols: usize, bins: usize, unit: &str) -> Self {
        Self {
            rows,
            cols,
            bins,
            unit: unit.to_string(),
        }
    }

    fn invalid(&self, reason: &'static str) -> ContainerError {
        ContainerError::InvalidShape {
            rows: self.rows,
            cols: self.cols,
            bins: self.bins,
            reason,
        }
    }

    /// Number of pixels in the spatial grid.
    pub fn pixel_count(&self) -> Result<usize, ContainerError> {
        self.rows
            .checked_mul(self.cols)
            .ok_or_else(|| self.invalid("pixel count overflows"))
    }

    /// Number of f64 intensity values following the axis.
    pub fn value_count(&self) -> Result<usize, ContainerError> {
        self.pixel_count()?
            .checked_mul(self.bins)
            .ok_or_else(|| self.invalid("value count overflows"))
    }

    /// Total payload size (axis + data) in bytes.
    pub fn payload_bytes(&self) -> Result<usize, ContainerError> {
        self.value_count()?
            .checked_add(self.bins)
            .and_then(|n| n.checked_mul(8))
            .ok_or_else(|| self.invalid("payload size overflows"))
    }

    fn slot(&self, value: usize) -> Result<u32, ContainerError> {
        u32::try_from(value).map_err(|_| self.invalid("dimension does not fit the u32 header slot"))
    }

    /// Serialise with the given byte order.
    pub fn to_bytes<B: ByteOrder>(&self) -> Result<[u8; HEADER_BYTES], ContainerError> {
        let unit = self.unit.as_bytes();
        if unit.len() > UNIT_BYTES {
            return Err(ContainerError::UnitTooLong(self.unit.clone()));
        }
        let mut buf = [0u8; HEADER_BYTES];
        buf[off::MAGIC..off::MAGIC + 4].copy_from_slice(&MAGIC);
        B::write_u16(&mut buf[off::VERSION..], VERSION);
        B::write_f32(&mut buf[off::ORDER..], ORDER_CONS);
        B::write_u32(&mut buf[off::ROWS..], self.slot(self.rows)?);
        B::write_u32(&mut buf[off::COLS..], self.slot(self.cols)?);
        B::write_u32(&mut buf[off::BINS..], self.slot(self.bins)?);
        buf[off::UNIT..off::UNIT + unit.len()].copy_from_slice(unit);
        Ok(buf)
    }

    /// Parse a header, detecting the byte order from the marker slot.
    pub fn from_bytes(buf: &[u8]) -> Result<(Self, Endian), ContainerError> {
        if buf.len() < HEADER_BYTES {
            return Err(ContainerError::Truncated {
                expected: HEADER_BYTES,
                got: buf.len(),
            });
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&buf[off::MAGIC..off::MAGIC + 4]);
        if magic != MAGIC {
            return Err(ContainerError::BadMagic(magic));
        }

        let le = LittleEndian::read_f32(&buf[off::ORDER..]);
        let be = BigEndian::read_f32(&buf[off::ORDER..]);
        if (le - ORDER_CONS).abs() < 0.01 {
            Ok((Self::parse::<LittleEndian>(buf)?, Endian::Little))
        } else if (be - ORDER_CONS).abs() < 0.01 {
            Ok((Self::parse::<BigEndian>(buf)?, Endian::Big))
        } else {
            Err(ContainerError::BadByteOrder(le))
        }
    }

    fn parse<B: ByteOrder>(buf: &[u8]) -> Result<Self, ContainerError> {
        let version = B::read_u16(&buf[off::VERSION..]);
        if version != VERSION {
            return Err(ContainerError::UnsupportedVersion(version));
        }
        let unit_raw = &buf[off::UNIT..off::UNIT + UNIT_BYTES];
        let end = unit_raw.iter().position(|&b| b == 0).unwrap_or(UNIT_BYTES);
        let header = Self {
            rows: B::read_u32(&buf[off::ROWS..]) as usize,
            cols: B::read_u32(&buf[off::COLS..]) as usize,
            bins: B::read_u32(&buf[off::BINS..]) as usize,
            unit: String::from_utf8_lossy(&unit_raw[..end]).into_owned(),
        };
        header.payload_bytes()?;
        Ok(header)
    }
}
