//! I-ModPoly: improved modified polynomial fitting (Zhao et al., 2007).

use crate::error::{invalid, ProcessResult};
use crate::numeric::polyfit::Polynomial;
use crate::numeric::stats::std_dev;

pub const MAX_ITER: usize = 100;
/// Relative change in residual deviation that counts as converged.
pub const TOLERANCE: f64 = 0.05;

fn residual_dev(y: &[f64], fit: &[f64]) -> f64 {
    let r: Vec<f64> = y.iter().zip(fit).map(|(a, b)| a - b).collect();
    std_dev(&r)
}

/// Estimate the baseline of `y`. Points flagged in `water` are left out of
/// every fit; the final polynomial is evaluated over the full axis.
pub fn baseline(
    x: &[f64],
    y: &[f64],
    degree: usize,
    max_iter: usize,
    tol: f64,
    water: Option<&[bool]>,
) -> ProcessResult<Vec<f64>> {
    let (mut xs, mut ys): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y)
        .enumerate()
        .filter(|(i, _)| water.map_or(true, |m| !m[*i]))
        .map(|(_, (&a, &b))| (a, b))
        .unzip();
    if xs.len() < degree + 1 {
        return invalid(format!(
            "I-ModPoly degree {} needs {} fitting points, {} left after masking",
            degree,
            degree + 1,
            xs.len()
        ));
    }

    // First pass: peak rejection
    let first = Polynomial::fit(&xs, &ys, degree)?;
    let fit = first.eval_all(&xs);
    let mut dev = residual_dev(&ys, &fit);
    let keep: Vec<usize> = (0..ys.len()).filter(|&i| ys[i] <= fit[i] + dev).collect();
    if keep.len() > degree {
        xs = keep.iter().map(|&i| xs[i]).collect();
        ys = keep.iter().map(|&i| ys[i]).collect();
    }

    let mut poly = first;
    for _ in 0..max_iter {
        poly = Polynomial::fit(&xs, &ys, degree)?;
        let fit = poly.eval_all(&xs);
        let new_dev = residual_dev(&ys, &fit);
        let converged = new_dev == 0.0 || (new_dev - dev).abs() / new_dev < tol;

        // Reconstruction: clip the target to the fit plus deviation
        for (v, f) in ys.iter_mut().zip(&fit) {
            *v = v.min(f + new_dev);
        }
        dev = new_dev;
        if converged {
            return Ok(poly.eval_all(x));
        }
    }
    log::warn!(
        "I-ModPoly did not converge within {} iterations; using last estimate",
        max_iter
    );
    Ok(poly.eval_all(x))
}
