//! Named regions of the spectral axis, resolved to masks or index lists
//! over a concrete x-axis.

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Closed interval `[start, end]` on the spectral axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub start: f64,
    pub end: f64,
}

/// Shift range without chemical information, excluded from spike clustering.
pub const SILENT_REGION: Region = Region::new(1900.0, 2600.0);

/// Water band excluded from baseline fitting when "ignore water" is set.
pub const WATER_BAND_BASELINE: Region = Region::new(2750.0, 3750.0);

/// Water band integrated for water normalization.
pub const WATER_BAND_INTEGRAL: Region = Region::new(2800.0, 3800.0);

impl Region {
    pub const fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Inclusive membership test. Reversed bounds are accepted.
    pub fn contains(&self, x: f64) -> bool {
        let (lo, hi) = self.bounds();
        x >= lo && x <= hi
    }

    pub fn bounds(&self) -> (f64, f64) {
        if self.start <= self.end {
            (self.start, self.end)
        } else {
            (self.end, self.start)
        }
    }

    /// Boolean mask over `x`: true where the axis value lies in the region.
    pub fn mask(&self, x: ArrayView1<f64>) -> Vec<bool> {
        x.iter().map(|&v| self.contains(v)).collect()
    }

    /// Positions of `x` inside the region.
    pub fn indices(&self, x: ArrayView1<f64>) -> Vec<usize> {
        x.iter()
            .enumerate()
            .filter(|&(_, &v)| self.contains(v))
            .map(|(i, _)| i)
            .collect()
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}–{:.1}", self.start, self.end)
    }
}

/// Split a mask into maximal runs of equal value: `(range, flag)`.
pub fn runs(mask: &[bool]) -> Vec<(Range<usize>, bool)> {
    let mut out = Vec::new();
    let mut start = 0;
    for i in 1..=mask.len() {
        if i == mask.len() || mask[i] != mask[start] {
            if start < mask.len() {
                out.push((start..i, mask[start]));
            }
            start = i;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    #[test]
    fn test_mask_and_indices() {
        let x = Array1::range(0.0, 10.0, 1.0);
        let r = Region::new(2.5, 7.5);
        assert_eq!(r.indices(x.view()), vec![3, 4, 5, 6, 7]);
        let mask = r.mask(x.view());
        assert_eq!(mask.iter().filter(|&&m| m).count(), 5);
        assert!(mask[3] && mask[7] && !mask[2] && !mask[8]);
    }

    #[test]
    fn test_reversed_bounds_and_empty() {
        let x = Array1::range(0.0, 10.0, 1.0);
        assert_eq!(Region::new(4.0, 2.0).indices(x.view()), vec![2, 3, 4]);
        assert!(Region::new(20.0, 30.0).indices(x.view()).is_empty());
    }

    #[test]
    fn test_runs() {
        let mask = [false, false, true, true, true, false];
        assert_eq!(
            runs(&mask),
            vec![(0..2, false), (2..5, true), (5..6, false)]
        );
        assert!(runs(&[]).is_empty());
    }
}
