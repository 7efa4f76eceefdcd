//! Least-squares polynomial fitting.

use ndarray::{Array1, Array2};

use super::dense;
use crate::error::{invalid, ProcessResult};

/// A fitted polynomial. The abscissa is mapped to `[-1, 1]` and the
/// Vandermonde system is solved by QR, which keeps degree 5 and above
/// accurate on wide Raman axes.
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    /// Ascending-power coefficients in the scaled variable
    coeffs: Vec<f64>,
    center: f64,
    half_width: f64,
}

impl Polynomial {
    /// Fit `y ≈ p(x)` of the given degree. Needs at least `degree + 1` points.
    pub fn fit(x: &[f64], y: &[f64], degree: usize) -> ProcessResult<Self> {
        if x.len() != y.len() {
            return invalid(format!(
                "polyfit: {} x values but {} y values",
                x.len(),
                y.len()
            ));
        }
        if x.len() < degree + 1 {
            return invalid(format!(
                "polyfit: degree {} needs at least {} points, got {}",
                degree,
                degree + 1,
                x.len()
            ));
        }

        let lo = x.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let center = 0.5 * (lo + hi);
        let half_width = if hi > lo { 0.5 * (hi - lo) } else { 1.0 };

        let m = degree + 1;
        let vander = Array2::from_shape_fn((x.len(), m), |(i, k)| {
            ((x[i] - center) / half_width).powi(k as i32)
        });
        let coeffs = dense::lstsq(vander, Array1::from(y.to_vec()))?.to_vec();
        Ok(Self {
            coeffs,
            center,
            half_width,
        })
    }

    pub fn degree(&self) -> usize {
        self.coeffs.len().saturating_sub(1)
    }

    /// Evaluate at one point (Horner).
    pub fn eval(&self, x: f64) -> f64 {
        let t = (x - self.center) / self.half_width;
        self.coeffs.iter().rev().fold(0.0, |acc, &c| acc * t + c)
    }

    pub fn eval_all(&self, x: &[f64]) -> Vec<f64> {
        x.iter().map(|&v| self.eval(v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_exact_quadratic() {
        let x: Vec<f64> = (0..30).map(|i| 400.0 + 100.0 * i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 - 0.01 * v + 2e-6 * v * v).collect();
        let p = Polynomial::fit(&x, &y, 2).unwrap();
        assert_eq!(p.degree(), 2);
        for (xi, yi) in x.iter().zip(&y) {
            assert_abs_diff_eq!(p.eval(*xi), *yi, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_constant_fit_is_mean() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [1.0, 3.0, 2.0, 6.0];
        let p = Polynomial::fit(&x, &y, 0).unwrap();
        assert_abs_diff_eq!(p.eval(10.0), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_too_few_points() {
        assert!(Polynomial::fit(&[1.0, 2.0], &[1.0, 2.0], 2).is_err());
        assert!(Polynomial::fit(&[1.0, 2.0], &[1.0], 0).is_err());
    }

    #[test]
    fn test_single_point_constant() {
        let p = Polynomial::fit(&[5.0], &[7.0], 0).unwrap();
        assert_abs_diff_eq!(p.eval(5.0), 7.0, epsilon = 1e-12);
    }

    #[test]
    fn test_high_degree_on_raman_axis() {
        // Degree 7 in the scaled variable over 400..3800, 681 points
        let x: Vec<f64> = (0..=680).map(|i| 400.0 + 5.0 * i as f64).collect();
        let truth = [2.0, -1.0, 0.5, 3.0, -2.0, 0.25, 1.5, -0.75];
        let y: Vec<f64> = x
            .iter()
            .map(|v| {
                let t = (v - 2100.0) / 1700.0;
                truth.iter().rev().fold(0.0f64, |acc, c| acc * t + c)
            })
            .collect();
        let p = Polynomial::fit(&x, &y, 7).unwrap();
        for (a, b) in p.coeffs.iter().zip(truth) {
            assert_abs_diff_eq!(*a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_repeated_abscissa_is_rank_deficient() {
        assert!(Polynomial::fit(&[2.0; 5], &[1.0, 2.0, 3.0, 4.0, 5.0], 1).is_err());
    }
}
