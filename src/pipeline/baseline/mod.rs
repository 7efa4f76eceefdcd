//! Background (baseline) removal.
//!
//! Every variant reduces to "estimate a baseline for one spectrum". The map
//! operation runs that estimate for each pixel and subtracts it; the preview
//! returns the estimate for one pixel without touching the map.

pub mod airpls;
pub mod bubblefill;
pub mod imodpoly;
pub mod morphological;
pub mod polynomial;

use ndarray::{s, Array1, Array3, ArrayView1};
use serde::{Deserialize, Serialize};

use super::ops::ProcessingOp;
use super::progress::Progress;
use crate::data::regions::{Region, WATER_BAND_BASELINE};
use crate::data::SpectralMap;
use crate::error::{invalid, ProcessError, ProcessResult};
use crate::log::reproducibility::ReproLog;

/// Baseline estimation algorithm and its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BaselineMethod {
    /// Mathematical morphology with automatic structuring-element width
    Morphological,
    /// Improved modified polynomial fit (Zhao et al.)
    IModPoly {
        degree: usize,
        max_iter: usize,
        tol: f64,
    },
    Polynomial { degree: usize },
    /// Adaptive iteratively reweighted penalized least squares
    AirPls { lambda: f64, max_iter: usize },
    /// Bubble growth; widths are in bins
    Bubblefill {
        min_width: usize,
        water_min_width: usize,
        fit_order: usize,
    },
}

impl Default for BaselineMethod {
    fn default() -> Self {
        BaselineMethod::IModPoly {
            degree: 5,
            max_iter: imodpoly::MAX_ITER,
            tol: imodpoly::TOLERANCE,
        }
    }
}

impl std::fmt::Display for BaselineMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BaselineMethod::Morphological => write!(f, "Morphological"),
            BaselineMethod::IModPoly { degree, .. } => write!(f, "I-ModPoly (degree {})", degree),
            BaselineMethod::Polynomial { degree } => write!(f, "Polynomial (degree {})", degree),
            BaselineMethod::AirPls { lambda, .. } => write!(f, "airPLS (λ={:.0e})", lambda),
            BaselineMethod::Bubblefill { min_width, .. } => {
                write!(f, "Bubblefill (min width {})", min_width)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineParams {
    pub method: BaselineMethod,
    /// Exclude `water_band` from the fitting input
    pub ignore_water: bool,
    pub water_band: Region,
}

impl Default for BaselineParams {
    fn default() -> Self {
        Self {
            method: BaselineMethod::default(),
            ignore_water: false,
            water_band: WATER_BAND_BASELINE,
        }
    }
}

impl BaselineParams {
    pub fn new(method: BaselineMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> ProcessResult<()> {
        match &self.method {
            BaselineMethod::IModPoly { max_iter, tol, .. } => {
                if *max_iter == 0 || !(*tol > 0.0) {
                    return invalid("I-ModPoly needs max_iter > 0 and tol > 0");
                }
            }
            BaselineMethod::AirPls { lambda, max_iter } => {
                if !(*lambda > 0.0) || *max_iter == 0 {
                    return invalid("airPLS needs lambda > 0 and max_iter > 0");
                }
            }
            BaselineMethod::Bubblefill {
                min_width,
                water_min_width,
                ..
            } => {
                if *min_width == 0 || *water_min_width == 0 {
                    return invalid("bubble widths must be at least 1 bin");
                }
            }
            BaselineMethod::Morphological | BaselineMethod::Polynomial { .. } => {}
        }
        Ok(())
    }

    fn water_mask(&self, x: &[f64]) -> Option<Vec<bool>> {
        self.ignore_water
            .then(|| self.water_band.mask(ArrayView1::from(x)))
    }
}

/// Shared core: baseline of one spectrum.
fn estimate(x: &[f64], y: &[f64], params: &BaselineParams) -> ProcessResult<Vec<f64>> {
    if y.is_empty() {
        return Ok(Vec::new());
    }
    let mask = params.water_mask(x);
    let mask = mask.as_deref();
    match &params.method {
        BaselineMethod::Morphological => Ok(morphological::baseline(y, mask)),
        BaselineMethod::IModPoly {
            degree,
            max_iter,
            tol,
        } => imodpoly::baseline(x, y, *degree, *max_iter, *tol, mask),
        BaselineMethod::Polynomial { degree } => polynomial::baseline(x, y, *degree, mask),
        BaselineMethod::AirPls { lambda, max_iter } => {
            airpls::baseline(y, *lambda, *max_iter, mask)
        }
        BaselineMethod::Bubblefill {
            min_width,
            water_min_width,
            fit_order,
        } => {
            let widths: Vec<usize> = match mask {
                Some(m) => m
                    .iter()
                    .map(|&w| if w { *water_min_width } else { *min_width })
                    .collect(),
                None => vec![*min_width; y.len()],
            };
            bubblefill::baseline(y, &widths, *fit_order)
        }
    }
}

/// Baseline of a single pixel, leaving the map untouched.
pub fn preview_baseline(
    map: &SpectralMap,
    row: usize,
    col: usize,
    params: &BaselineParams,
) -> ProcessResult<Array1<f64>> {
    params.validate()?;
    if row >= map.rows() || col >= map.cols() {
        return invalid(format!(
            "pixel ({}, {}) outside {}×{} map",
            row,
            col,
            map.rows(),
            map.cols()
        ));
    }
    let x = map.x_axis().to_vec();
    let y = map.spectrum(row, col).to_vec();
    estimate(&x, &y, params).map(Array1::from)
}

/// Estimate and subtract the baseline of every pixel. The map is only
/// modified once all baselines have been computed, so a failing pixel leaves
/// it unchanged.
pub fn remove_background(
    map: &mut SpectralMap,
    params: &BaselineParams,
    progress: &mut Progress<'_>,
    log: &mut ReproLog,
) -> ProcessResult<()> {
    params.validate()?;
    if map.is_empty() {
        return Err(ProcessError::EmptyMap);
    }
    let (rows, cols, bins) = map.shape();
    let x = map.x_axis().to_vec();
    let mut baselines = Array3::<f64>::zeros((rows, cols, bins));
    for row in 0..rows {
        for col in 0..cols {
            let y = map.spectrum(row, col).to_vec();
            let b = estimate(&x, &y, params).map_err(|e| e.at_pixel(row, col))?;
            baselines
                .slice_mut(s![row, col, ..])
                .assign(&Array1::from(b));
            progress.tick();
        }
    }
    map.modify(|mut data| data -= &baselines);

    log.add_entry(
        &ProcessingOp::RemoveBackground(params.clone()),
        &format!(
            "Subtracted {} baseline from {} spectra{}",
            params.method,
            rows * cols,
            if params.ignore_water {
                format!(" (water band {} excluded)", params.water_band)
            } else {
                String::new()
            }
        ),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::synthetic_map;

    fn all_methods() -> Vec<BaselineMethod> {
        vec![
            BaselineMethod::Morphological,
            BaselineMethod::default(),
            BaselineMethod::Polynomial { degree: 3 },
            BaselineMethod::AirPls {
                lambda: 1e5,
                max_iter: 20,
            },
            BaselineMethod::Bubblefill {
                min_width: 40,
                water_min_width: 150,
                fit_order: 1,
            },
        ]
    }

    #[test]
    fn test_every_method_changes_the_data() {
        for method in all_methods() {
            for ignore_water in [false, true] {
                let mut map = synthetic_map(2, 2, 5);
                let before = map.data().clone();
                let mut log = ReproLog::new();
                let params = BaselineParams {
                    ignore_water,
                    ..BaselineParams::new(method.clone())
                };
                remove_background(&mut map, &params, &mut Progress::none(), &mut log).unwrap();
                assert_eq!(map.bins(), map.x_axis().len());
                assert_ne!(map.data(), &before, "{} left data unchanged", method);
                assert!(map.data().iter().all(|v| v.is_finite()), "{}", method);
            }
        }
    }

    #[test]
    fn test_preview_matches_map_operation() {
        let mut map = synthetic_map(2, 3, 6);
        let params = BaselineParams::new(BaselineMethod::Polynomial { degree: 2 });
        let original = map.spectrum(1, 2).to_owned();
        let preview = preview_baseline(&map, 1, 2, &params).unwrap();
        assert_eq!(map.spectrum(1, 2), original.view());

        let mut log = ReproLog::new();
        remove_background(&mut map, &params, &mut Progress::none(), &mut log).unwrap();
        let expected = &original - &preview;
        assert_eq!(map.spectrum(1, 2), expected.view());
    }

    #[test]
    fn test_progress_once_per_spectrum() {
        let mut map = synthetic_map(3, 2, 7);
        let mut ticks = 0;
        let mut cb = || ticks += 1;
        let mut log = ReproLog::new();
        remove_background(
            &mut map,
            &BaselineParams::new(BaselineMethod::Morphological),
            &mut Progress::new(&mut cb),
            &mut log,
        )
        .unwrap();
        assert_eq!(ticks, 6);
        assert_eq!(log.recipe().len(), 1);
    }

    #[test]
    fn test_invalid_params_rejected_before_work() {
        let mut map = synthetic_map(1, 1, 0);
        let before = map.data().clone();
        let params = BaselineParams::new(BaselineMethod::AirPls {
            lambda: -1.0,
            max_iter: 20,
        });
        let mut log = ReproLog::new();
        assert!(remove_background(&mut map, &params, &mut Progress::none(), &mut log).is_err());
        assert_eq!(map.data(), &before);
        assert!(log.is_empty());
    }

    #[test]
    fn test_water_mask_follows_band() {
        let x = [2700.0, 2750.0, 3000.0, 3750.0, 3800.0];
        assert!(BaselineParams::default().water_mask(&x).is_none());
        let params = BaselineParams {
            ignore_water: true,
            ..BaselineParams::default()
        };
        assert_eq!(params.water_mask(&x), Some(vec![false, true, true, true, false]));
    }

    #[test]
    fn test_preview_out_of_bounds() {
        let map = synthetic_map(2, 2, 0);
        assert!(preview_baseline(&map, 2, 0, &BaselineParams::default()).is_err());
    }

    #[test]
    fn test_params_serde() {
        let params = BaselineParams {
            ignore_water: true,
            ..BaselineParams::new(BaselineMethod::AirPls {
                lambda: 1e4,
                max_iter: 10,
            })
        };
        let json = serde_json::to_string(&params).unwrap();
        let back: BaselineParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
        let partial: BaselineParams =
            serde_json::from_str(r#"{"method":"Morphological"}"#).unwrap();
        assert_eq!(partial.water_band, WATER_BAND_BASELINE);
    }
}
