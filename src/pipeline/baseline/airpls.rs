//! airPLS: adaptive iteratively reweighted penalized least squares
//! (Zhang, Chen & Liang, 2010).

use crate::error::ProcessResult;
use crate::numeric::banded::whittaker_solve;

/// Stop once the negative-residual mass drops below this share of Σ|y|.
const CONVERGENCE_RATIO: f64 = 0.001;
const DIFFERENCE_ORDER: usize = 2;

pub fn baseline(
    y: &[f64],
    lambda: f64,
    max_iter: usize,
    water: Option<&[bool]>,
) -> ProcessResult<Vec<f64>> {
    let n = y.len();
    let masked = |i: usize| water.map_or(false, |m| m[i]);
    let mut w: Vec<f64> = (0..n).map(|i| if masked(i) { 0.0 } else { 1.0 }).collect();
    if n > 1 {
        w[0] = 1.0;
        w[n - 1] = 1.0;
    }
    let abs_sum: f64 = (0..n).filter(|&i| !masked(i)).map(|i| y[i].abs()).sum();

    let mut z = y.to_vec();
    for t in 1..=max_iter {
        z = whittaker_solve(y, &w, lambda, DIFFERENCE_ORDER)?;
        let d: Vec<f64> = y.iter().zip(&z).map(|(a, b)| a - b).collect();
        let negatives: Vec<f64> = (0..n)
            .filter(|&i| !masked(i) && d[i] < 0.0)
            .map(|i| d[i])
            .collect();
        let dssn: f64 = negatives.iter().map(|v| v.abs()).sum();

        if dssn == 0.0 || dssn < CONVERGENCE_RATIO * abs_sum {
            log::debug!("airPLS converged after {} iterations", t);
            return Ok(z);
        }
        if t == max_iter {
            break;
        }

        let tf = t as f64;
        for i in 0..n {
            w[i] = if masked(i) || d[i] >= 0.0 {
                0.0
            } else {
                (tf * d[i].abs() / dssn).exp()
            };
        }
        let closest = negatives.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let edge = (tf * closest / dssn).exp();
        w[0] = edge;
        w[n - 1] = edge;
    }
    log::warn!(
        "airPLS reached {} iterations without converging; using last estimate",
        max_iter
    );
    Ok(z)
}
