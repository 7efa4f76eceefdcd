//! Small dense linear solves (filter design, polynomial least squares).

use ndarray::{Array1, Array2};

use crate::error::{ProcessError, ProcessResult};

/// Solve `a · x = b` by Gaussian elimination with partial pivoting.
pub fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> ProcessResult<Array1<f64>> {
    let n = b.len();
    if a.dim() != (n, n) {
        return Err(ProcessError::Numerical(format!(
            "system matrix is {:?}, expected ({n}, {n})",
            a.dim()
        )));
    }

    for col in 0..n {
        // Pivot
        let mut max_row = col;
        let mut max_val = a[[col, col]].abs();
        for row in (col + 1)..n {
            if a[[row, col]].abs() > max_val {
                max_val = a[[row, col]].abs();
                max_row = row;
            }
        }
        if max_val < 1e-300 || !max_val.is_finite() {
            return Err(ProcessError::Numerical("singular linear system".into()));
        }
        if max_row != col {
            for k in 0..n {
                a.swap([col, k], [max_row, k]);
            }
            b.swap(col, max_row);
        }

        let pivot = a[[col, col]];
        for row in (col + 1)..n {
            let factor = a[[row, col]] / pivot;
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = b[i];
        for k in (i + 1)..n {
            sum -= a[[i, k]] * x[k];
        }
        x[i] = sum / a[[i, i]];
    }
    Ok(x)
}

/// Least-squares solution of the overdetermined system `a · x ≈ b`
/// (`a` is `m × n` with `m ≥ n`) by Householder QR. Avoids forming `aᵀa`,
/// which squares the condition number.
pub fn lstsq(mut a: Array2<f64>, mut b: Array1<f64>) -> ProcessResult<Array1<f64>> {
    let (m, n) = a.dim();
    if b.len() != m || m < n {
        return Err(ProcessError::Numerical(format!(
            "least squares needs a tall system, got {:?} with {} right-hand values",
            a.dim(),
            b.len()
        )));
    }

    let mut v = vec![0.0f64; m];
    for k in 0..n {
        let norm = (k..m).map(|i| a[[i, k]] * a[[i, k]]).sum::<f64>().sqrt();
        if !(norm > 0.0) || !norm.is_finite() {
            return Err(ProcessError::Numerical("rank-deficient least-squares system".into()));
        }
        let alpha = if a[[k, k]] > 0.0 { -norm } else { norm };
        for i in k..m {
            v[i] = a[[i, k]];
        }
        v[k] -= alpha;
        let vv: f64 = v[k..m].iter().map(|e| e * e).sum();

        // Reflect the remaining columns and the right-hand side
        for j in k..n {
            let dot: f64 = (k..m).map(|i| v[i] * a[[i, j]]).sum();
            let f = 2.0 * dot / vv;
            for i in k..m {
                a[[i, j]] -= f * v[i];
            }
        }
        let dot: f64 = (k..m).map(|i| v[i] * b[i]).sum();
        let f = 2.0 * dot / vv;
        for i in k..m {
            b[i] -= f * v[i];
        }
    }

    let scale = (0..n).map(|k| a[[k, k]].abs()).fold(0.0f64, f64::max);
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let r = a[[i, i]];
        if r.abs() <= 1e-13 * scale {
            return Err(ProcessError::Numerical("rank-deficient least-squares system".into()));
        }
        let mut sum = b[i];
        for k in (i + 1)..n {
            sum -= a[[i, k]] * x[k];
        }
        x[i] = sum / r;
    }
    Ok(x)
}
