//! Resampling onto a uniform x-axis.

use ndarray::{s, Array1, Array3};

use super::ops::ProcessingOp;
use super::progress::Progress;
use crate::data::SpectralMap;
use crate::error::{invalid, ProcessError, ProcessResult};
use crate::log::reproducibility::ReproLog;
use crate::numeric::spline::CubicSpline;

/// Uniform grid `start + i·step` over `[ceil(first), floor(last))`.
pub fn uniform_grid(x: &[f64], step: f64) -> ProcessResult<Array1<f64>> {
    if !(step > 0.0) || !step.is_finite() {
        return invalid(format!("linearization step must be positive, got {}", step));
    }
    if x.len() < 2 {
        return invalid("linearization needs at least 2 axis points");
    }
    let start = x[0].ceil();
    let stop = x[x.len() - 1].floor();
    let count = ((stop - start) / step).ceil().max(0.0) as usize;
    Ok(Array1::from_iter((0..count).map(|i| start + step * i as f64)))
}

/// Spline-resample every spectrum onto a grid of fixed `step`. Replaces both
/// the data and the x-axis.
pub fn linearize(
    map: &mut SpectralMap,
    step: f64,
    progress: &mut Progress<'_>,
    log: &mut ReproLog,
) -> ProcessResult<()> {
    if map.is_empty() {
        return Err(ProcessError::EmptyMap);
    }
    let x = map.x_axis().to_vec();
    let grid = uniform_grid(&x, step)?;
    let query = grid.to_vec();
    let (rows, cols, _) = map.shape();
    let mut out = Array3::<f64>::zeros((rows, cols, grid.len()));
    for row in 0..rows {
        for col in 0..cols {
            let y = map.spectrum(row, col).to_vec();
            let spline = CubicSpline::new(&x, &y).map_err(|e| e.at_pixel(row, col))?;
            out.slice_mut(s![row, col, ..])
                .assign(&Array1::from(spline.eval_all(&query)));
            progress.tick();
        }
    }
    let before = x.len();
    let (first, last) = (grid.first().copied(), grid.last().copied());
    map.replace(out, grid)?;

    log.add_entry(
        &ProcessingOp::Linearize { step },
        &format!(
            "Resampled {} bins to {} bins at step {} ({:?}..{:?})",
            before,
            map.bins(),
            step,
            first,
            last
        ),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::AxisUnit;
    use crate::test_support::synthetic_map;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_grid_bounds() {
        let g = uniform_grid(&[0.3, 1.7, 4.9], 1.0).unwrap();
        assert_eq!(g.to_vec(), vec![1.0, 2.0, 3.0]);
        assert!(uniform_grid(&[0.0, 1.0], 0.0).is_err());
        assert!(uniform_grid(&[0.0], 1.0).is_err());
    }

    #[test]
    fn test_step_law() {
        let mut map = synthetic_map(2, 2, 3);
        let mut log = ReproLog::new();
        linearize(&mut map, 0.5, &mut Progress::none(), &mut log).unwrap();
        assert_eq!(map.bins(), map.x_axis().len());
        for w in map.x_axis().windows(2) {
            assert_abs_diff_eq!(w[1] - w[0], 0.5, epsilon = 1e-9);
        }
        assert!(map.data().iter().all(|v| v.is_finite()));
        assert_eq!(log.recipe(), vec![ProcessingOp::Linearize { step: 0.5 }]);
    }

    #[test]
    fn test_irregular_axis_values_preserved() {
        let x = Array1::from(vec![0.0, 0.7, 2.1, 3.0, 4.4, 6.0]);
        let data = Array3::from_shape_fn((1, 1, 6), |(_, _, b)| 2.0 * x[b] + 1.0);
        let mut map = SpectralMap::new(data, x, AxisUnit::RamanShift).unwrap();
        let mut log = ReproLog::new();
        linearize(&mut map, 1.0, &mut Progress::none(), &mut log).unwrap();
        assert_eq!(map.x_axis().to_vec(), vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        for (xv, yv) in map.x_axis().iter().zip(map.spectrum(0, 0).iter()) {
            assert_abs_diff_eq!(*yv, 2.0 * xv + 1.0, epsilon = 1e-9);
        }
    }
}
