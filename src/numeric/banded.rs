//! Symmetric positive-definite banded systems.
//!
//! The Whittaker smoother and airPLS both solve `(W + λ·DᵀD) z = W y`, where
//! `D` is the d-th order difference operator. `DᵀD` has half-bandwidth `d`, so
//! the system is factored as a banded Cholesky `L·Lᵀ` in `O(n·d²)`.

use crate::error::{ProcessError, ProcessResult};

/// Lower band of a symmetric matrix: `low[i * (p + 1) + k] = A[i][i - k]`.
#[derive(Debug, Clone)]
pub struct SymBand {
    n: usize,
    p: usize,
    low: Vec<f64>,
}

impl SymBand {
    pub fn zeros(n: usize, p: usize) -> Self {
        Self {
            n,
            p,
            low: vec![0.0f64; n * (p + 1)],
        }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Element `A[i][j]` for `j <= i`, `i - j <= p`.
    #[inline]
    fn at(&self, i: usize, j: usize) -> f64 {
        self.low[i * (self.p + 1) + (i - j)]
    }

    #[inline]
    fn add(&mut self, i: usize, j: usize, v: f64) {
        let (i, j) = if i >= j { (i, j) } else { (j, i) };
        self.low[i * (self.p + 1) + (i - j)] += v;
    }

    /// Add `v[i]` to the diagonal.
    pub fn add_diagonal(&mut self, v: &[f64]) {
        for (i, &w) in v.iter().enumerate().take(self.n) {
            self.low[i * (self.p + 1)] += w;
        }
    }

    /// `λ·DᵀD` for the `order`-th difference operator on `n` points.
    pub fn difference_penalty(n: usize, order: usize, lambda: f64) -> Self {
        let coeffs = difference_coefficients(order);
        let mut band = Self::zeros(n, order);
        if n <= order {
            return band;
        }
        for r in 0..(n - order) {
            for (a, &ca) in coeffs.iter().enumerate() {
                for (b, &cb) in coeffs.iter().enumerate().skip(a) {
                    band.add(r + b, r + a, lambda * ca * cb);
                }
            }
        }
        band
    }

    /// Matrix-vector product, used to check solutions.
    #[cfg(test)]
    pub fn mul_vec(&self, x: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0f64; self.n];
        for i in 0..self.n {
            let lo = i.saturating_sub(self.p);
            for j in lo..=i {
                let a = self.at(i, j);
                out[i] += a * x[j];
                if i != j {
                    out[j] += a * x[i];
                }
            }
        }
        out
    }
}

/// Coefficients of the `order`-th forward difference, e.g. `[1, -2, 1]` for 2.
pub fn difference_coefficients(order: usize) -> Vec<f64> {
    let mut c = vec![1.0];
    for _ in 0..order {
        let mut next = vec![0.0f64; c.len() + 1];
        for (i, &v) in c.iter().enumerate() {
            next[i] -= v;
            next[i + 1] += v;
        }
        c = next;
    }
    // Sign convention does not matter for DᵀD; keep the leading coefficient positive.
    if c[0] < 0.0 {
        c.iter_mut().for_each(|v| *v = -*v);
    }
    c
}

/// Banded Cholesky factor `L` of a [`SymBand`].
#[derive(Debug, Clone)]
pub struct BandedCholesky {
    n: usize,
    p: usize,
    low: Vec<f64>,
}

impl BandedCholesky {
    pub fn factor(a: &SymBand) -> ProcessResult<Self> {
        let (n, p) = (a.n, a.p);
        let w = p + 1;
        let mut l = vec![0.0f64; n * w];
        for i in 0..n {
            let j0 = i.saturating_sub(p);
            for j in j0..=i {
                let mut sum = a.at(i, j);
                let k0 = j0.max(j.saturating_sub(p));
                for k in k0..j {
                    sum -= l[i * w + (i - k)] * l[j * w + (j - k)];
                }
                if i == j {
                    if sum <= 0.0 || !sum.is_finite() {
                        return Err(ProcessError::Numerical(format!(
                            "banded system not positive definite at row {}",
                            i
                        )));
                    }
                    l[i * w] = sum.sqrt();
                } else {
                    l[i * w + (i - j)] = sum / l[j * w];
                }
            }
        }
        Ok(Self { n, p, low: l })
    }

    /// Solve `L·Lᵀ x = b`.
    pub fn solve(&self, b: &[f64]) -> Vec<f64> {
        let (n, p, w) = (self.n, self.p, self.p + 1);
        let mut y = b.to_vec();
        for i in 0..n {
            let mut sum = y[i];
            for k in i.saturating_sub(p)..i {
                sum -= self.low[i * w + (i - k)] * y[k];
            }
            y[i] = sum / self.low[i * w];
        }
        for i in (0..n).rev() {
            let mut sum = y[i];
            for k in (i + 1)..n.min(i + p + 1) {
                sum -= self.low[k * w + (k - i)] * y[k];
            }
            y[i] = sum / self.low[i * w];
        }
        y
    }
}

/// Solve the weighted Whittaker system `(W + λ·DᵀD) z = W y` once.
pub fn whittaker_solve(
    y: &[f64],
    weights: &[f64],
    lambda: f64,
    order: usize,
) -> ProcessResult<Vec<f64>> {
    let mut a = SymBand::difference_penalty(y.len(), order, lambda);
    a.add_diagonal(weights);
    let chol = BandedCholesky::factor(&a)?;
    let rhs: Vec<f64> = y.iter().zip(weights).map(|(v, w)| v * w).collect();
    Ok(chol.solve(&rhs))
}
