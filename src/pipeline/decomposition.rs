//! PCA and NMF of the flattened map.
//!
//! Both factor the `(pixels × bins)` matrix and store one [`Component`] per
//! factor: the pixel scores reshaped to the grid, and the spectral loading.
//! Each call replaces the previous component list.

use ndarray::{Array1, Array2, Axis};

use super::ops::ProcessingOp;
use super::progress::Progress;
use crate::data::{Component, SpectralMap};
use crate::error::{invalid, ProcessError, ProcessResult};
use crate::log::reproducibility::ReproLog;
use crate::numeric::eigen::top_k;

/// Seed of the subspace iteration; fixed so results are reproducible.
const EIGEN_SEED: u64 = 0;
/// Floor for NMF factor entries, keeps components from dying out.
const NMF_EPS: f64 = 1e-12;

pub const NMF_MAX_ITER: usize = 200;
pub const NMF_TOL: f64 = 1e-4;

fn check_components(map: &SpectralMap, k: usize) -> ProcessResult<()> {
    if map.is_empty() {
        return Err(ProcessError::EmptyMap);
    }
    let limit = map.pixel_count().min(map.bins());
    if k == 0 || k > limit {
        return invalid(format!(
            "component count {} must be between 1 and {} for a {}-pixel, {}-bin map",
            k,
            limit,
            map.pixel_count(),
            map.bins()
        ));
    }
    Ok(())
}

fn to_components(
    map: &SpectralMap,
    scores: &Array2<f64>,
    loadings: &Array2<f64>,
) -> ProcessResult<Vec<Component>> {
    let (rows, cols) = (map.rows(), map.cols());
    (0..scores.ncols())
        .map(|j| {
            let grid = scores
                .column(j)
                .to_owned()
                .into_shape((rows, cols))
                .map_err(|e| ProcessError::Numerical(format!("score reshape: {}", e)))?;
            Ok(Component {
                map: grid,
                plot: loadings.column(j).to_owned(),
            })
        })
        .collect()
}

/// Principal component analysis with `k` components.
pub fn pca(map: &mut SpectralMap, k: usize, log: &mut ReproLog) -> ProcessResult<()> {
    check_components(map, k)?;
    let x = map.flattened();
    let n = x.nrows();
    let mean = x
        .mean_axis(Axis(0))
        .ok_or_else(|| ProcessError::Numerical("mean of empty matrix".into()))?;
    let xc = &x - &mean;
    let denom = (n.max(2) - 1) as f64;

    let eig = top_k(xc.ncols(), k, EIGEN_SEED, |q| xc.t().dot(&xc.dot(q)) / denom);
    let mut loadings = eig.vectors;
    for mut v in loadings.columns_mut() {
        // Deterministic sign: largest-magnitude entry positive
        let pivot = v
            .iter()
            .copied()
            .max_by(|a, b| a.abs().total_cmp(&b.abs()))
            .unwrap_or(0.0);
        if pivot < 0.0 {
            v.mapv_inplace(|e| -e);
        }
    }
    let scores = xc.dot(&loadings);

    let total: f64 = xc.iter().map(|v| v * v).sum::<f64>() / denom;
    let explained: Vec<String> = eig
        .values
        .iter()
        .map(|l| {
            if total > 0.0 {
                format!("{:.1}%", 100.0 * l / total)
            } else {
                "n/a".to_string()
            }
        })
        .collect();

    let components = to_components(map, &scores, &loadings)?;
    map.set_components(components);
    log.add_entry(
        &ProcessingOp::Pca { components: k },
        &format!(
            "PCA on {} spectra, {} components, explained variance [{}]",
            n,
            k,
            explained.join(", ")
        ),
    );
    Ok(())
}

/// NNDSVD initialisation (Boutsidis & Gallopoulos, 2008).
fn nndsvd(x: &Array2<f64>, k: usize) -> (Array2<f64>, Array2<f64>) {
    let (n, p) = x.dim();
    let eig = top_k(p, k, EIGEN_SEED, |q| x.t().dot(&x.dot(q)));
    let mut w = Array2::<f64>::zeros((n, k));
    let mut h = Array2::<f64>::zeros((k, p));

    let norm = |a: &Array1<f64>| a.dot(a).sqrt();
    for j in 0..k {
        let sigma = eig.values[j].max(0.0).sqrt();
        if sigma <= 0.0 {
            continue;
        }
        let v = eig.vectors.column(j).to_owned();
        let u = x.dot(&v) / sigma;
        if j == 0 {
            w.column_mut(0).assign(&(u.mapv(f64::abs) * sigma.sqrt()));
            h.row_mut(0).assign(&(v.mapv(f64::abs) * sigma.sqrt()));
            continue;
        }
        let (up, un) = (u.mapv(|e| e.max(0.0)), u.mapv(|e| (-e).max(0.0)));
        let (vp, vn) = (v.mapv(|e| e.max(0.0)), v.mapv(|e| (-e).max(0.0)));
        let (nup, nun, nvp, nvn) = (norm(&up), norm(&un), norm(&vp), norm(&vn));
        let (mp, mn) = (nup * nvp, nun * nvn);
        let (uu, vv, scale) = if mp > mn {
            (up / nup.max(f64::MIN_POSITIVE), vp / nvp.max(f64::MIN_POSITIVE), mp)
        } else {
            (un / nun.max(f64::MIN_POSITIVE), vn / nvn.max(f64::MIN_POSITIVE), mn)
        };
        let lift = (sigma * scale).sqrt();
        w.column_mut(j).assign(&(uu * lift));
        h.row_mut(j).assign(&(vv * lift));
    }
    w.mapv_inplace(|e| e.max(NMF_EPS));
    h.mapv_inplace(|e| e.max(NMF_EPS));
    (w, h)
}

/// Frobenius error `‖X − WH‖` from precomputed products.
fn nmf_error(norm_x2: f64, wtx: &Array2<f64>, wtw: &Array2<f64>, h: &Array2<f64>) -> f64 {
    let cross: f64 = (wtx * h).sum();
    let hht = h.dot(&h.t());
    let quad: f64 = (wtw * &hht).sum();
    (norm_x2 - 2.0 * cross + quad).max(0.0).sqrt()
}

/// Non-negative matrix factorisation of `|data|` with `k` components, solved
/// by hierarchical alternating least squares. `progress` ticks once per
/// iteration.
pub fn nmf(
    map: &mut SpectralMap,
    k: usize,
    max_iter: usize,
    tol: f64,
    progress: &mut Progress<'_>,
    log: &mut ReproLog,
) -> ProcessResult<()> {
    check_components(map, k)?;
    if max_iter == 0 {
        return invalid("NMF needs at least one iteration");
    }
    let x = map.flattened().mapv(f64::abs);
    let norm_x2: f64 = x.iter().map(|v| v * v).sum();
    let (mut w, mut h) = nndsvd(&x, k);

    let mut prev_err: Option<f64> = None;
    let mut err = f64::NAN;
    let mut iterations = 0;
    for _ in 0..max_iter {
        iterations += 1;

        // W columns
        let xht = x.dot(&h.t());
        let hht = h.dot(&h.t());
        for j in 0..k {
            let d = hht[[j, j]];
            if d <= 0.0 {
                continue;
            }
            let whj = w.dot(&hht.column(j));
            for i in 0..w.nrows() {
                w[[i, j]] = (w[[i, j]] + (xht[[i, j]] - whj[i]) / d).max(NMF_EPS);
            }
        }

        // H rows
        let wtx = w.t().dot(&x);
        let wtw = w.t().dot(&w);
        for j in 0..k {
            let d = wtw[[j, j]];
            if d <= 0.0 {
                continue;
            }
            let wh = wtw.row(j).dot(&h);
            for c in 0..h.ncols() {
                h[[j, c]] = (h[[j, c]] + (wtx[[j, c]] - wh[c]) / d).max(NMF_EPS);
            }
        }

        err = nmf_error(norm_x2, &wtx, &wtw, &h);
        progress.tick();
        if let Some(prev) = prev_err {
            if prev > 0.0 && (prev - err).abs() / prev < tol {
                break;
            }
        }
        prev_err = Some(err);
    }
    if iterations == max_iter {
        log::debug!("NMF stopped at the iteration cap ({})", max_iter);
    }

    let scores = w;
    let loadings = h.t().to_owned();
    let components = to_components(map, &scores, &loadings)?;
    map.set_components(components);
    log.add_entry(
        &ProcessingOp::Nmf {
            components: k,
            max_iter,
            tol,
        },
        &format!(
            "NMF of |data| ({} spectra), {} components, {} iterations, residual {:.4e}",
            x.nrows(),
            k,
            iterations,
            err
        ),
    );
    Ok(())
}
