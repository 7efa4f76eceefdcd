//! Container writer.

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::ContainerError;
use crate::Container;

/// Write a container with an explicit byte order.
pub fn write_container_as<W: Write, B: ByteOrder>(
    writer: &mut W,
    container: &Container,
) -> Result<(), ContainerError> {
    let header = &container.header;
    if container.x_axis.len() != header.bins {
        return Err(ContainerError::ShapeMismatch {
            what: "x-axis",
            expected: header.bins,
            got: container.x_axis.len(),
        });
    }
    let expected = header.value_count()?;
    if container.data.len() != expected {
        return Err(ContainerError::ShapeMismatch {
            what: "data",
            expected,
            got: container.data.len(),
        });
    }

    writer.write_all(&header.to_bytes::<B>()?)?;
    for &v in container.x_axis.iter().chain(container.data.iter()) {
        writer.write_f64::<B>(v)?;
    }
    Ok(())
}

/// Write a container in the default (little-endian) byte order.
pub fn write_container<W: Write>(
    writer: &mut W,
    container: &Container,
) -> Result<(), ContainerError> {
    write_container_as::<W, LittleEndian>(writer, container)
}

/// Create (or overwrite) a container file.
pub fn write_file(path: &Path, container: &Container) -> Result<(), ContainerError> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_container(&mut writer, container)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{read_container, Header};
    use byteorder::BigEndian;
    use std::io::Cursor;

    fn sample() -> Container {
        let header = Header::new(2, 3, 4, "1/cm");
        let x_axis = vec![100.0, 100.5, 101.0, 101.5];
        let data = (0..24).map(|i| i as f64 * 0.25 - 3.0).collect();
        Container::new(header, x_axis, data).unwrap()
    }

    #[test]
    fn test_roundtrip_little_endian() {
        let c = sample();
        let mut buf = Vec::new();
        write_container(&mut buf, &c).unwrap();
        assert_eq!(buf.len(), 64 + (4 + 24) * 8);

        let back = read_container(&mut Cursor::new(buf)).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_reads_big_endian() {
        let c = sample();
        let mut buf = Vec::new();
        write_container_as::<_, BigEndian>(&mut buf, &c).unwrap();
        let back = read_container(&mut Cursor::new(buf)).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_truncated_payload() {
        let c = sample();
        let mut buf = Vec::new();
        write_container(&mut buf, &c).unwrap();
        buf.truncate(buf.len() - 8);
        match read_container(&mut Cursor::new(buf)) {
            Err(ContainerError::Truncated { expected, got }) => {
                assert_eq!(expected, 28 * 8);
                assert_eq!(got, 27 * 8);
            }
            other => panic!("expected Truncated, got {:?}", other),
        }
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let header = Header::new(1, 1, 3, "");
        let err = Container::new(header, vec![1.0, 2.0], vec![0.0; 3]).unwrap_err();
        assert!(matches!(err, ContainerError::ShapeMismatch { what: "x-axis", .. }));
    }
}
