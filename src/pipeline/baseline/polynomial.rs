//! Single least-squares polynomial baseline.

use crate::error::{invalid, ProcessResult};
use crate::numeric::polyfit::Polynomial;

pub fn baseline(
    x: &[f64],
    y: &[f64],
    degree: usize,
    water: Option<&[bool]>,
) -> ProcessResult<Vec<f64>> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y)
        .enumerate()
        .filter(|(i, _)| water.map_or(true, |m| !m[*i]))
        .map(|(_, (&a, &b))| (a, b))
        .unzip();
    if xs.len() <= degree {
        return invalid(format!(
            "polynomial degree {} needs more than {} unmasked points",
            degree,
            xs.len()
        ));
    }
    Ok(Polynomial::fit(&xs, &ys, degree)?.eval_all(x))
}
