//! Load and save spectral maps through the `mapfile` container format.

use ndarray::{Array1, Array3};
use std::path::Path;

use super::map::SpectralMap;
use super::units::AxisUnit;
use crate::error::{ProcessError, ProcessResult};
use crate::log::reproducibility::ReproLog;

/// Load a map from a container file.
pub fn load_map(path: &Path, log: &mut ReproLog) -> ProcessResult<SpectralMap> {
    let container = mapfile::read_file(path)?;
    let mut map = from_container(container)?;
    map.source_path = path.to_path_buf();
    map.sample_name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let (rows, cols, bins) = map.shape();
    log.set_source(&path.display().to_string());
    log.add_note(
        "Load",
        &format!(
            "Loaded {}: {}×{} pixels, {} bins, unit '{}'",
            path.display(),
            rows,
            cols,
            bins,
            map.unit()
        ),
    );
    Ok(map)
}

/// Save a map (current shape and axis) to a container file.
pub fn save_map(map: &SpectralMap, path: &Path, log: &mut ReproLog) -> ProcessResult<()> {
    let container = to_container(map)?;
    mapfile::write_file(path, &container)?;
    log.add_note("Save", &format!("Saved map to {}", path.display()));
    Ok(())
}

/// Turn a decoded container into a map, checking the axis/data invariant.
pub fn from_container(container: mapfile::Container) -> ProcessResult<SpectralMap> {
    let hdr = &container.header;
    let unit: AxisUnit = hdr.unit.parse().unwrap_or(AxisUnit::Other(hdr.unit.clone()));
    if container.x_axis.len() != hdr.bins {
        return Err(ProcessError::ShapeMismatch {
            axis: container.x_axis.len(),
            bins: hdr.bins,
        });
    }
    let data = Array3::from_shape_vec((hdr.rows, hdr.cols, hdr.bins), container.data)
        .map_err(|e| ProcessError::InvalidParameter(format!("container tensor: {}", e)))?;
    SpectralMap::new(data, Array1::from(container.x_axis), unit)
}

/// Flatten a map back to the container's row-major pixel order.
pub fn to_container(map: &SpectralMap) -> ProcessResult<mapfile::Container> {
    let (rows, cols, bins) = map.shape();
    let header = mapfile::Header::new(rows, cols, bins, &map.unit().to_string());
    let x_axis = map.x_axis().to_vec();
    let data = map.data().iter().copied().collect();
    Ok(mapfile::Container::new(header, x_axis, data)?)
}
