//! Cubic spline interpolation.

use crate::error::{invalid, ProcessResult};

/// Interpolating cubic spline with not-a-knot end conditions: the third
/// derivative is continuous across the second and the second-to-last knot,
/// so any cubic is reproduced exactly. Three knots give the interpolating
/// parabola, two a straight line. Queries outside the knot span return `NaN`.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    /// Second derivatives at the knots
    m: Vec<f64>,
}

impl CubicSpline {
    /// Knots must be strictly increasing. Two knots give a straight line.
    pub fn new(x: &[f64], y: &[f64]) -> ProcessResult<Self> {
        let n = x.len();
        if n != y.len() {
            return invalid(format!("spline: {} knots but {} values", n, y.len()));
        }
        if n < 2 {
            return invalid("spline needs at least 2 knots");
        }
        if x.windows(2).any(|w| w[1] <= w[0]) {
            return invalid("spline knots must be strictly increasing");
        }

        let mut m = vec![0.0f64; n];
        if n == 3 {
            let (h0, h1) = (x[1] - x[0], x[2] - x[1]);
            let curvature = 2.0 * ((y[2] - y[1]) / h1 - (y[1] - y[0]) / h0) / (h0 + h1);
            m.fill(curvature);
        } else if n > 3 {
            // Tridiagonal system for interior second derivatives; the end
            // values are eliminated through the not-a-knot conditions
            let k = n - 2;
            let mut sub = vec![0.0f64; k];
            let mut diag = vec![0.0f64; k];
            let mut upper = vec![0.0f64; k];
            let mut rhs = vec![0.0f64; k];
            for i in 1..n - 1 {
                let h0 = x[i] - x[i - 1];
                let h1 = x[i + 1] - x[i];
                sub[i - 1] = h0;
                diag[i - 1] = 2.0 * (h0 + h1);
                upper[i - 1] = h1;
                rhs[i - 1] = 6.0 * ((y[i + 1] - y[i]) / h1 - (y[i] - y[i - 1]) / h0);
            }
            let (h0, h1) = (x[1] - x[0], x[2] - x[1]);
            diag[0] += h0 * (h0 + h1) / h1;
            upper[0] -= h0 * h0 / h1;
            let (ha, hb) = (x[n - 2] - x[n - 3], x[n - 1] - x[n - 2]);
            diag[k - 1] += hb * (ha + hb) / ha;
            sub[k - 1] -= hb * hb / ha;

            // Thomas algorithm
            for r in 1..k {
                let w = sub[r] / diag[r - 1];
                diag[r] -= w * upper[r - 1];
                rhs[r] -= w * rhs[r - 1];
            }
            m[k] = rhs[k - 1] / diag[k - 1];
            for r in (0..k - 1).rev() {
                m[r + 1] = (rhs[r] - upper[r] * m[r + 2]) / diag[r];
            }
            m[0] = ((h0 + h1) * m[1] - h0 * m[2]) / h1;
            m[n - 1] = ((ha + hb) * m[n - 2] - hb * m[n - 3]) / ha;
        }

        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            m,
        })
    }

    pub fn span(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }

    pub fn eval(&self, q: f64) -> f64 {
        let (lo, hi) = self.span();
        if !(q >= lo && q <= hi) {
            return f64::NAN;
        }
        // Interval with x[i] <= q <= x[i+1]
        let i = match self.x.partition_point(|&v| v <= q) {
            0 => 0,
            p => (p - 1).min(self.x.len() - 2),
        };
        let h = self.x[i + 1] - self.x[i];
        let a = (self.x[i + 1] - q) / h;
        let b = (q - self.x[i]) / h;
        a * self.y[i]
            + b * self.y[i + 1]
            + ((a * a * a - a) * self.m[i] + (b * b * b - b) * self.m[i + 1]) * h * h / 6.0
    }

    pub fn eval_all(&self, q: &[f64]) -> Vec<f64> {
        q.iter().map(|&v| self.eval(v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_passes_through_knots() {
        let x = [0.0, 1.0, 2.5, 3.0, 5.0];
        let y = [1.0, -2.0, 0.5, 4.0, 3.0];
        let s = CubicSpline::new(&x, &y).unwrap();
        for (xi, yi) in x.iter().zip(&y) {
            assert_abs_diff_eq!(s.eval(*xi), *yi, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_reproduces_line() {
        let x: Vec<f64> = (0..10).map(|i| i as f64 * 1.7).collect();
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v - 1.0).collect();
        let s = CubicSpline::new(&x, &y).unwrap();
        assert_abs_diff_eq!(s.eval(4.2), 7.4, epsilon = 1e-10);
    }

    #[test]
    fn test_smooth_function_accuracy() {
        let x: Vec<f64> = (0..=60).map(|i| i as f64 * 0.1).collect();
        let y: Vec<f64> = x.iter().map(|v| v.sin()).collect();
        let s = CubicSpline::new(&x, &y).unwrap();
        assert_abs_diff_eq!(s.eval(2.55), 2.55f64.sin(), epsilon = 1e-4);
    }

    #[test]
    fn test_outside_span_is_nan() {
        let s = CubicSpline::new(&[0.0, 1.0, 2.0], &[0.0, 1.0, 0.0]).unwrap();
        assert!(s.eval(-0.1).is_nan());
        assert!(s.eval(2.1).is_nan());
        assert!(!s.eval(2.0).is_nan());
    }

    #[test]
    fn test_reproduces_cubic_up_to_the_ends() {
        let f = |v: f64| v * v * v - 2.0 * v * v + 0.5 * v + 3.0;
        let x = [0.0, 0.4, 1.5, 2.0, 3.1, 4.0];
        let y: Vec<f64> = x.iter().map(|&v| f(v)).collect();
        let s = CubicSpline::new(&x, &y).unwrap();
        for q in [0.05, 0.2, 1.0, 2.7, 3.9] {
            assert_abs_diff_eq!(s.eval(q), f(q), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_three_knots_parabola() {
        let f = |v: f64| 2.0 * v * v - v + 1.0;
        let x = [0.0, 1.0, 3.0];
        let y: Vec<f64> = x.iter().map(|&v| f(v)).collect();
        let s = CubicSpline::new(&x, &y).unwrap();
        assert_abs_diff_eq!(s.eval(2.0), f(2.0), epsilon = 1e-12);
        assert_abs_diff_eq!(s.eval(0.5), f(0.5), epsilon = 1e-12);
    }

    #[test]
    fn test_two_knots_linear() {
        let s = CubicSpline::new(&[0.0, 2.0], &[1.0, 5.0]).unwrap();
        assert_abs_diff_eq!(s.eval(0.5), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_unsorted() {
        assert!(CubicSpline::new(&[0.0, 0.0, 1.0], &[1.0, 2.0, 3.0]).is_err());
    }
}
