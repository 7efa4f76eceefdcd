//! Water-band normalization against a reference water spectrum.
//!
//! Pixels are matched to the reference by the cosine distance of their first
//! differences (insensitive to offset and scale). The matched pixels are
//! averaged into a map-specific water spectrum whose band integral is then
//! brought to a fixed target by scaling the whole map.

use std::ops::Range;

use ndarray::{s, Array1, Array2};
use serde::{Deserialize, Serialize};

use super::ops::ProcessingOp;
use crate::data::regions::{Region, WATER_BAND_INTEGRAL};
use crate::data::{ReferenceSpectrum, SpectralMap};
use crate::error::{invalid, ProcessError, ProcessResult};
use crate::log::reproducibility::ReproLog;
use crate::numeric::spline::CubicSpline;
use crate::numeric::stats::{cosine_distance, diff, trapz};

pub const TARGET_INTEGRAL: f64 = 100_000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterParams {
    /// Maximum cosine distance for a pixel to count as water
    pub threshold: f64,
    /// Integration band
    pub band: Region,
    pub target: f64,
}

impl Default for WaterParams {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            band: WATER_BAND_INTEGRAL,
            target: TARGET_INTEGRAL,
        }
    }
}

/// Memoized match result, valid until the map data changes.
#[derive(Debug, Clone)]
pub struct WaterInfo {
    /// [`ReferenceSpectrum::fingerprint`] the distances were computed against
    pub reference: u64,
    /// Bins where the interpolated reference is defined
    pub span: Range<usize>,
    /// Cosine distance per pixel
    pub distances: Array2<f64>,
}

fn compute_match(map: &SpectralMap, reference: &ReferenceSpectrum) -> ProcessResult<WaterInfo> {
    let spline = CubicSpline::new(&reference.x, &reference.y)?;
    let x = map.x_axis().to_vec();
    let values = spline.eval_all(&x);
    let first = values.iter().position(|v| v.is_finite());
    let last = values.iter().rposition(|v| v.is_finite());
    let span = match (first, last) {
        (Some(a), Some(b)) if b > a => a..b + 1,
        _ => {
            return invalid(format!(
                "reference '{}' does not overlap the map axis",
                reference.name
            ))
        }
    };
    let ref_diff = diff(&values[span.clone()]);

    let (rows, cols, _) = map.shape();
    let distances = Array2::from_shape_fn((rows, cols), |(r, c)| {
        let own = map.spectrum(r, c).slice(s![span.clone()]).to_vec();
        cosine_distance(&diff(&own), &ref_diff)
    });
    Ok(WaterInfo {
        reference: reference.fingerprint(),
        span,
        distances,
    })
}

/// Cosine distance of every pixel to the reference, memoized on the map.
pub fn water_distances(
    map: &mut SpectralMap,
    reference: &ReferenceSpectrum,
) -> ProcessResult<Array2<f64>> {
    if map.is_empty() {
        return Err(ProcessError::EmptyMap);
    }
    let fingerprint = reference.fingerprint();
    if let Some(info) = &map.water_info {
        if info.reference == fingerprint {
            return Ok(info.distances.clone());
        }
    }
    let info = compute_match(map, reference)?;
    let distances = info.distances.clone();
    map.water_info = Some(info);
    Ok(distances)
}

/// Preview: which pixels count as water for `threshold`.
pub fn preview_water_match(
    map: &mut SpectralMap,
    reference: &ReferenceSpectrum,
    threshold: f64,
) -> ProcessResult<Array2<bool>> {
    Ok(water_distances(map, reference)?.mapv(|d| d <= threshold))
}

/// Mean raw spectrum of the water-like pixels.
pub fn average_water_spectrum(
    map: &mut SpectralMap,
    reference: &ReferenceSpectrum,
    threshold: f64,
) -> ProcessResult<Array1<f64>> {
    let matches = preview_water_match(map, reference, threshold)?;
    let mut sum = Array1::<f64>::zeros(map.bins());
    let mut count = 0usize;
    for ((r, c), &hit) in matches.indexed_iter() {
        if hit {
            sum += &map.spectrum(r, c);
            count += 1;
        }
    }
    if count == 0 {
        return Err(ProcessError::NoWaterMatch { threshold });
    }
    log::debug!("{} pixels matched the water reference", count);
    Ok(sum / count as f64)
}

/// Scale the map so the band integral of its average water spectrum equals
/// `params.target`. Returns the applied factor.
pub fn normalize_water(
    map: &mut SpectralMap,
    reference: &ReferenceSpectrum,
    params: &WaterParams,
    log: &mut ReproLog,
) -> ProcessResult<f64> {
    let avg = average_water_spectrum(map, reference, params.threshold)?;
    let band = params.band.indices(map.x_axis().view());
    if band.len() < 2 {
        return invalid(format!("water band {} has fewer than 2 axis points", params.band));
    }
    let xs: Vec<f64> = band.iter().map(|&i| map.x_axis()[i]).collect();
    let ys: Vec<f64> = band.iter().map(|&i| avg[i]).collect();
    let integral = trapz(&xs, &ys);
    if !(integral > 0.0) || !integral.is_finite() {
        return Err(ProcessError::Numerical(format!(
            "water band integral is {}; cannot normalize",
            integral
        )));
    }
    let factor = params.target / integral;
    map.modify(|mut data| data *= factor);

    log.add_entry(
        &ProcessingOp::NormalizeWater(params.clone()),
        &format!(
            "Scaled map by {:.6} (water integral {:.3} over {} → {}) using reference '{}'",
            factor, integral, params.band, params.target, reference.name
        ),
    );
    Ok(factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{synthetic_map, synthetic_water, water_map};
    use approx::assert_relative_eq;

    #[test]
    fn test_water_pixels_matched() {
        let mut map = water_map(4, 3, 1);
        let water = synthetic_water();
        let matches = preview_water_match(&mut map, &water, 0.1).unwrap();
        for r in 0..4 {
            assert!(matches[[r, 0]]);
            assert!(!matches[[r, 1]]);
            assert!(!matches[[r, 2]]);
        }
        assert!(map.water_info.is_some());
    }

    #[test]
    fn test_normalization_hits_target() {
        let mut map = water_map(4, 3, 2);
        let water = synthetic_water();
        let params = WaterParams::default();
        let mut log = ReproLog::new();
        let factor = normalize_water(&mut map, &water, &params, &mut log).unwrap();
        assert!(factor > 0.0);

        let avg = average_water_spectrum(&mut map, &water, params.threshold).unwrap();
        let band = params.band.indices(map.x_axis().view());
        let xs: Vec<f64> = band.iter().map(|&i| map.x_axis()[i]).collect();
        let ys: Vec<f64> = band.iter().map(|&i| avg[i]).collect();
        assert_relative_eq!(trapz(&xs, &ys), TARGET_INTEGRAL, max_relative = 1e-9);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_no_match_is_reported() {
        let mut map = synthetic_map(2, 2, 0);
        let before = map.data().clone();
        let mut log = ReproLog::new();
        let water = synthetic_water();
        let params = WaterParams {
            threshold: 0.01,
            ..WaterParams::default()
        };
        assert!(matches!(
            normalize_water(&mut map, &water, &params, &mut log),
            Err(ProcessError::NoWaterMatch { .. })
        ));
        assert_eq!(map.data(), &before);
    }

    #[test]
    fn test_memo_is_keyed_by_reference() {
        let mut map = water_map(2, 2, 3);
        let water = synthetic_water();
        let d1 = water_distances(&mut map, &water).unwrap();
        let mut other = water.clone();
        other.name = "shifted".into();
        other.y.iter_mut().enumerate().for_each(|(i, v)| *v += i as f64 * 1e-3);
        water_distances(&mut map, &other).unwrap();
        assert_eq!(map.water_info.as_ref().unwrap().reference, other.fingerprint());
        assert_eq!(water_distances(&mut map, &water).unwrap(), d1);
    }

    #[test]
    fn test_reference_outside_axis() {
        let mut map = synthetic_map(1, 1, 0);
        let far =
            ReferenceSpectrum::new("far", vec![5000.0, 5001.0, 5002.0], vec![1.0, 2.0, 3.0])
                .unwrap();
        assert!(water_distances(&mut map, &far).is_err());
    }
}
