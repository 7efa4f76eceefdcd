//! Mathematical-morphology baseline.

use crate::data::regions::runs;
use crate::pipeline::morphology::{dilation, erosion, opening};

/// Number of consecutive equal openings that marks the optimal width.
const STABLE_RUNS: usize = 3;

/// Smallest half-width whose opening stays unchanged for three consecutive
/// widths. Falls back to the largest admissible width.
pub fn optimal_half_width(y: &[f64]) -> usize {
    let max_w = (y.len().saturating_sub(1) / 2).max(1);
    let mut prev = opening(y, 1);
    let mut stable = 1;
    for w in 2..=max_w {
        let cur = opening(y, w);
        if cur == prev {
            stable += 1;
            if stable == STABLE_RUNS {
                return w + 1 - STABLE_RUNS;
            }
        } else {
            stable = 1;
        }
        prev = cur;
    }
    max_w
}

/// `min(opening, (erosion(opening) + dilation(opening)) / 2)` at half-width `w`.
pub fn baseline_with_width(y: &[f64], w: usize) -> Vec<f64> {
    let open = opening(y, w);
    let lo = erosion(&open, w);
    let hi = dilation(&open, w);
    open.iter()
        .zip(lo.iter().zip(&hi))
        .map(|(&o, (&e, &d))| o.min(0.5 * (e + d)))
        .collect()
}

/// Baseline with automatic width. With a water mask, the water run uses a
/// fixed width of a third of its length and every other run gets its own
/// optimal width.
pub fn baseline(y: &[f64], water: Option<&[bool]>) -> Vec<f64> {
    let Some(mask) = water else {
        return baseline_with_width(y, optimal_half_width(y));
    };
    let mut out = Vec::with_capacity(y.len());
    for (range, is_water) in runs(mask) {
        let segment = &y[range.clone()];
        let w = if is_water {
            (range.len() / 3).max(1)
        } else {
            optimal_half_width(segment)
        };
        out.extend(baseline_with_width(segment, w));
    }
    out
}
