//! Spectral-range and spatial cropping.

use ndarray::{s, Axis};

use super::ops::ProcessingOp;
use crate::data::regions::Region;
use crate::data::SpectralMap;
use crate::error::ProcessResult;
use crate::log::reproducibility::ReproLog;

/// Keep the bins whose x value lies in `[start, end]` (inclusive).
pub fn crop_spectra_absolute(
    map: &mut SpectralMap,
    start: f64,
    end: f64,
    log: &mut ReproLog,
) -> ProcessResult<()> {
    let before = map.bins();
    let keep = Region::new(start, end).indices(map.x_axis().view());
    let data = map.data().select(Axis(2), &keep);
    let x = map.x_axis().select(Axis(0), &keep);
    map.replace(data, x)?;

    log.add_entry(
        &ProcessingOp::CropSpectraAbsolute { start, end },
        &format!("Kept {} of {} bins in [{:.2}, {:.2}]", keep.len(), before, start, end),
    );
    Ok(())
}

/// Drop `from_start` bins from the low end and `from_end` from the high end.
pub fn crop_spectra_relative(
    map: &mut SpectralMap,
    from_start: usize,
    from_end: usize,
    log: &mut ReproLog,
) -> ProcessResult<()> {
    let before = map.bins();
    let hi = before.saturating_sub(from_end);
    let lo = from_start.min(hi);
    let data = map.data().slice(s![.., .., lo..hi]).to_owned();
    let x = map.x_axis().slice(s![lo..hi]).to_owned();
    map.replace(data, x)?;

    log.add_entry(
        &ProcessingOp::CropSpectraRelative {
            from_start,
            from_end,
        },
        &format!("Kept bins {}..{} of {}", lo, hi, before),
    );
    Ok(())
}

/// Keep rows `top..bottom` and columns `left..right`. Bounds are clamped to
/// the grid; an empty result is allowed.
pub fn crop_map(
    map: &mut SpectralMap,
    left: usize,
    top: usize,
    right: usize,
    bottom: usize,
    log: &mut ReproLog,
) -> ProcessResult<()> {
    let (rows, cols, _) = map.shape();
    let r1 = bottom.min(rows);
    let r0 = top.min(r1);
    let c1 = right.min(cols);
    let c0 = left.min(c1);
    let data = map.data().slice(s![r0..r1, c0..c1, ..]).to_owned();
    let x = map.x_axis().clone();
    map.replace(data, x)?;

    if map.is_empty() {
        log::warn!("Spatial crop produced an empty map");
    }
    log.add_entry(
        &ProcessingOp::CropMap {
            left,
            top,
            right,
            bottom,
        },
        &format!(
            "Cropped {}×{} grid to rows {}..{}, cols {}..{}",
            rows, cols, r0, r1, c0, c1
        ),
    );
    Ok(())
}
