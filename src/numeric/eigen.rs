//! Symmetric eigenproblems.
//!
//! [`jacobi`] solves small dense symmetric matrices exactly. [`top_k`] finds the
//! leading eigenpairs of a large symmetric operator that is only available as
//! a product `A·Q` (the covariance or Gram matrix of a flattened map is never
//! formed), using block subspace iteration with a Rayleigh–Ritz projection.

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const JACOBI_SWEEPS: usize = 100;
const SUBSPACE_MAX_ITER: usize = 500;
const SUBSPACE_TOL: f64 = 1e-12;

/// Eigenpairs sorted by descending eigenvalue; `vectors` holds them as columns.
#[derive(Debug, Clone)]
pub struct EigenPairs {
    pub values: Array1<f64>,
    pub vectors: Array2<f64>,
}

/// Cyclic Jacobi rotation for a dense symmetric matrix.
pub fn jacobi(a: &Array2<f64>) -> EigenPairs {
    let n = a.nrows();
    let mut a = a.clone();
    let mut v = Array2::<f64>::eye(n);

    for _ in 0..JACOBI_SWEEPS {
        let off: f64 = (0..n)
            .flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
            .map(|(i, j)| a[[i, j]] * a[[i, j]])
            .sum();
        let scale: f64 = a.iter().map(|x| x * x).sum();
        if off <= 1e-30 * scale.max(f64::MIN_POSITIVE) {
            break;
        }
        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[[p, q]];
                if apq == 0.0 {
                    continue;
                }
                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let akp = a[[k, p]];
                    let akq = a[[k, q]];
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[[p, k]];
                    let aqk = a[[q, k]];
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let vkp = v[[k, p]];
                    let vkq = v[[k, q]];
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| a[[j, j]].total_cmp(&a[[i, i]]));
    let values = Array1::from_iter(order.iter().map(|&i| a[[i, i]]));
    let vectors = v.select(Axis(1), &order);
    EigenPairs { values, vectors }
}

/// Orthonormalise the columns of `q` in place (modified Gram–Schmidt).
/// Columns that collapse are replaced by fresh random directions.
pub fn orthonormalize(q: &mut Array2<f64>, rng: &mut StdRng) {
    let (rows, cols) = q.dim();
    for j in 0..cols {
        for attempt in 0..3 {
            for i in 0..j {
                let proj = q.column(i).dot(&q.column(j));
                let qi = q.column(i).to_owned();
                q.column_mut(j).scaled_add(-proj, &qi);
            }
            let norm = q.column(j).dot(&q.column(j)).sqrt();
            if norm > 1e-12 {
                q.column_mut(j).mapv_inplace(|v| v / norm);
                break;
            }
            if attempt == 2 {
                q.column_mut(j).fill(0.0);
                break;
            }
            for r in 0..rows {
                q[[r, j]] = rng.gen_range(-1.0..1.0);
            }
        }
    }
}

/// Leading `k` eigenpairs of a symmetric positive semi-definite operator of
/// size `dim`, given as `apply(Q) = A·Q`. Deterministic for a fixed `seed`.
pub fn top_k<F>(dim: usize, k: usize, seed: u64, apply: F) -> EigenPairs
where
    F: Fn(&Array2<f64>) -> Array2<f64>,
{
    let k = k.min(dim);
    let m = (k + 5).min(dim);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut q = Array2::from_shape_fn((dim, m), |_| rng.gen_range(-1.0..1.0));
    orthonormalize(&mut q, &mut rng);

    let mut prev: Option<Array1<f64>> = None;
    for _ in 0..SUBSPACE_MAX_ITER {
        let z = apply(&q);
        // Rayleigh quotients of the current basis track convergence
        let ritz: Array1<f64> = (0..m).map(|j| q.column(j).dot(&z.column(j))).collect();
        q = z;
        orthonormalize(&mut q, &mut rng);
        if let Some(p) = &prev {
            let scale = ritz.iter().fold(0.0f64, |a, v| a.max(v.abs())).max(f64::MIN_POSITIVE);
            let change = ritz
                .iter()
                .zip(p.iter())
                .take(k)
                .fold(0.0f64, |a, (x, y)| a.max((x - y).abs()));
            if change <= SUBSPACE_TOL * scale {
                break;
            }
        }
        prev = Some(ritz);
    }

    // Rayleigh–Ritz on the converged subspace
    let aq = apply(&q);
    let small = q.t().dot(&aq);
    let small = (&small + &small.t()) * 0.5;
    let inner = jacobi(&small);
    let vectors = q.dot(&inner.vectors);

    let idx: Vec<usize> = (0..k).collect();
    EigenPairs {
        values: inner.values.select(Axis(0), &idx),
        vectors: vectors.select(Axis(1), &idx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_jacobi_2x2() {
        let a = array![[2.0, 1.0], [1.0, 2.0]];
        let e = jacobi(&a);
        assert_abs_diff_eq!(e.values[0], 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(e.values[1], 1.0, epsilon = 1e-12);
        let v0 = e.vectors.column(0);
        assert_abs_diff_eq!(v0[0].abs(), 0.5f64.sqrt(), epsilon = 1e-10);
        assert_abs_diff_eq!(v0[0], v0[1], epsilon = 1e-10);
    }

    #[test]
    fn test_jacobi_reconstructs() {
        let a = array![[4.0, 1.0, 0.5], [1.0, 3.0, 0.2], [0.5, 0.2, 1.0]];
        let e = jacobi(&a);
        let d = Array2::from_diag(&e.values);
        let back = e.vectors.dot(&d).dot(&e.vectors.t());
        for (x, y) in back.iter().zip(a.iter()) {
            assert_abs_diff_eq!(x, y, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_top_k_matches_jacobi() {
        let n = 30;
        let mut rng = StdRng::seed_from_u64(7);
        let b = Array2::from_shape_fn((n, n), |_| rng.gen_range(-1.0..1.0));
        let a = b.t().dot(&b);
        let full = jacobi(&a);
        let top = top_k(n, 3, 1, |q| a.dot(q));
        for i in 0..3 {
            assert_abs_diff_eq!(top.values[i], full.values[i], epsilon = 1e-6 * full.values[0]);
            let dot = top.vectors.column(i).dot(&full.vectors.column(i)).abs();
            assert_abs_diff_eq!(dot, 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_orthonormalize_handles_dependent_columns() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut q = array![[1.0, 2.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]];
        orthonormalize(&mut q, &mut rng);
        let gram = q.t().dot(&q);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(gram[[i, j]], expected, epsilon = 1e-10);
            }
        }
    }
}
