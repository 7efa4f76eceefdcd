//! Container reader.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::ContainerError;
use crate::header::{Endian, Header, HEADER_BYTES};
use crate::Container;

/// Read a complete container (header, axis, data) from a reader.
pub fn read_container<R: Read>(reader: &mut R) -> Result<Container, ContainerError> {
    let mut hdr_buf = [0u8; HEADER_BYTES];
    read_exact_counted(reader, &mut hdr_buf)?;
    let (header, endian) = Header::from_bytes(&hdr_buf)?;

    // The header is only a claim: grow the buffer from what the stream
    // actually holds instead of allocating the claimed size up front.
    let expected = header.payload_bytes()?;
    let mut payload = Vec::new();
    reader.by_ref().take(expected as u64).read_to_end(&mut payload)?;
    if payload.len() < expected {
        return Err(ContainerError::Truncated {
            expected,
            got: payload.len(),
        });
    }

    let (axis_bytes, data_bytes) = payload.split_at(header.bins * 8);
    let (x_axis, data) = match endian {
        Endian::Little => (
            decode_f64::<LittleEndian>(axis_bytes),
            decode_f64::<LittleEndian>(data_bytes),
        ),
        Endian::Big => (
            decode_f64::<BigEndian>(axis_bytes),
            decode_f64::<BigEndian>(data_bytes),
        ),
    };

    Container::new(header, x_axis, data)
}

/// Open and read a container file.
pub fn read_file(path: &Path) -> Result<Container, ContainerError> {
    let mut reader = BufReader::new(File::open(path)?);
    read_container(&mut reader)
}

fn decode_f64<B: ByteOrder>(bytes: &[u8]) -> Vec<f64> {
    let mut out = vec![0.0f64; bytes.len() / 8];
    B::read_f64_into(bytes, &mut out);
    out
}

/// `read_exact`, but reports how many bytes were actually available.
fn read_exact_counted<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), ContainerError> {
    let mut got = 0;
    while got < buf.len() {
        match reader.read(&mut buf[got..]) {
            Ok(0) => {
                return Err(ContainerError::Truncated {
                    expected: buf.len(),
                    got,
                })
            }
            Ok(n) => got += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
