//! Whittaker and Savitzky–Golay smoothing.

use ndarray::{s, Array1, Array2, Array3};
use serde::{Deserialize, Serialize};

use super::ops::ProcessingOp;
use super::progress::Progress;
use crate::data::SpectralMap;
use crate::error::{invalid, ProcessError, ProcessResult};
use crate::log::reproducibility::ReproLog;
use crate::numeric::banded::{BandedCholesky, SymBand};
use crate::numeric::dense;
use crate::numeric::polyfit::Polynomial;

/// Smoothing filter and its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Smoother {
    /// Penalized least squares with a `order`-th difference penalty
    Whittaker { lambda: f64, order: usize },
    /// Local polynomial regression over an odd window
    SavitzkyGolay { window: usize, order: usize },
}

impl std::fmt::Display for Smoother {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Smoother::Whittaker { lambda, order } => {
                write!(f, "Whittaker (λ={}, d={})", lambda, order)
            }
            Smoother::SavitzkyGolay { window, order } => {
                write!(f, "Savitzky-Golay (window {}, order {})", window, order)
            }
        }
    }
}

/// A smoother prepared for a fixed spectrum length.
enum Kernel {
    Whittaker(BandedCholesky),
    SavitzkyGolay { coeffs: Vec<f64>, order: usize },
}

impl Smoother {
    fn prepare(&self, len: usize) -> ProcessResult<Kernel> {
        match *self {
            Smoother::Whittaker { lambda, order } => {
                if !(lambda > 0.0) || order == 0 {
                    return invalid("Whittaker needs lambda > 0 and order >= 1");
                }
                let mut system = SymBand::difference_penalty(len, order, lambda);
                system.add_diagonal(&vec![1.0; len]);
                Ok(Kernel::Whittaker(BandedCholesky::factor(&system)?))
            }
            Smoother::SavitzkyGolay { window, order } => {
                check_savgol(len, window, order)?;
                Ok(Kernel::SavitzkyGolay {
                    coeffs: savgol_coefficients(window, order)?,
                    order,
                })
            }
        }
    }
}

impl Kernel {
    fn apply(&self, y: &[f64]) -> ProcessResult<Vec<f64>> {
        match self {
            Kernel::Whittaker(chol) => Ok(chol.solve(y)),
            Kernel::SavitzkyGolay { coeffs, order } => savgol_apply(y, coeffs, *order),
        }
    }
}

fn check_savgol(len: usize, window: usize, order: usize) -> ProcessResult<()> {
    if window % 2 == 0 {
        return invalid(format!("Savitzky-Golay window must be odd, got {}", window));
    }
    if order >= window {
        return invalid(format!(
            "Savitzky-Golay order {} must be less than window {}",
            order, window
        ));
    }
    if window > len {
        return invalid(format!(
            "Savitzky-Golay window {} longer than spectrum ({} bins)",
            window, len
        ));
    }
    Ok(())
}

/// Central smoothing weights of a Savitzky–Golay filter.
pub fn savgol_coefficients(window: usize, order: usize) -> ProcessResult<Vec<f64>> {
    let half = (window / 2) as i64;
    let m = order + 1;
    let mut ata = Array2::<f64>::zeros((m, m));
    for j in -half..=half {
        let t = j as f64;
        for r in 0..m {
            for c in 0..m {
                ata[[r, c]] += t.powi((r + c) as i32);
            }
        }
    }
    let mut e0 = Array1::<f64>::zeros(m);
    e0[0] = 1.0;
    let c = dense::solve(ata, e0)?;
    Ok((-half..=half)
        .map(|j| {
            let t = j as f64;
            c.iter().enumerate().map(|(k, ck)| ck * t.powi(k as i32)).sum()
        })
        .collect())
}

fn savgol_apply(y: &[f64], coeffs: &[f64], order: usize) -> ProcessResult<Vec<f64>> {
    let n = y.len();
    let window = coeffs.len();
    let half = window / 2;
    let mut out = vec![0.0f64; n];
    for i in half..n - half {
        out[i] = coeffs
            .iter()
            .zip(&y[i - half..=i + half])
            .map(|(c, v)| c * v)
            .sum();
    }
    // Edges: evaluate a polynomial fitted to the first/last full window
    let idx: Vec<f64> = (0..window).map(|i| i as f64).collect();
    let head = Polynomial::fit(&idx, &y[..window], order)?;
    let tail = Polynomial::fit(&idx, &y[n - window..], order)?;
    for i in 0..half {
        out[i] = head.eval(i as f64);
        out[n - half + i] = tail.eval((window - half + i) as f64);
    }
    Ok(out)
}

/// Savitzky–Golay filter of one signal.
pub fn savgol_filter(y: &[f64], window: usize, order: usize) -> ProcessResult<Vec<f64>> {
    check_savgol(y.len(), window, order)?;
    let coeffs = savgol_coefficients(window, order)?;
    savgol_apply(y, &coeffs, order)
}

/// Whittaker smoother of one signal with unit weights.
pub fn whittaker_smooth(y: &[f64], lambda: f64, order: usize) -> ProcessResult<Vec<f64>> {
    Smoother::Whittaker { lambda, order }.prepare(y.len())?.apply(y)
}

/// Smoothed spectrum of one pixel, leaving the map untouched.
pub fn preview_smoothing(
    map: &SpectralMap,
    row: usize,
    col: usize,
    smoother: &Smoother,
) -> ProcessResult<Array1<f64>> {
    if row >= map.rows() || col >= map.cols() {
        return invalid(format!("pixel ({}, {}) outside map", row, col));
    }
    let y = map.spectrum(row, col).to_vec();
    let kernel = smoother.prepare(y.len())?;
    kernel.apply(&y).map(Array1::from)
}

/// Smooth every spectrum of the map in place.
pub fn smooth(
    map: &mut SpectralMap,
    smoother: &Smoother,
    progress: &mut Progress<'_>,
    log: &mut ReproLog,
) -> ProcessResult<()> {
    if map.is_empty() {
        return Err(ProcessError::EmptyMap);
    }
    let (rows, cols, bins) = map.shape();
    let kernel = smoother.prepare(bins)?;
    let mut out = Array3::<f64>::zeros((rows, cols, bins));
    for row in 0..rows {
        for col in 0..cols {
            let y = map.spectrum(row, col).to_vec();
            let z = kernel.apply(&y).map_err(|e| e.at_pixel(row, col))?;
            out.slice_mut(s![row, col, ..]).assign(&Array1::from(z));
            progress.tick();
        }
    }
    map.modify(|mut data| data.assign(&out));

    log.add_entry(
        &ProcessingOp::Smooth(smoother.clone()),
        &format!("Smoothed {} spectra with {}", rows * cols, smoother),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::synthetic_map;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_savgol_known_coefficients() {
        // Classic 5-point quadratic: (-3, 12, 17, 12, -3) / 35
        let c = savgol_coefficients(5, 2).unwrap();
        let expected = [-3.0, 12.0, 17.0, 12.0, -3.0];
        for (a, b) in c.iter().zip(expected) {
            assert_abs_diff_eq!(*a, b / 35.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_savgol_preserves_polynomial() {
        let y: Vec<f64> = (0..40)
            .map(|i| {
                let t = i as f64;
                1.0 + 0.5 * t - 0.02 * t * t + 0.001 * t * t * t
            })
            .collect();
        let z = savgol_filter(&y, 9, 3).unwrap();
        for (a, b) in z.iter().zip(&y) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_savgol_parameter_errors() {
        let y = vec![0.0; 20];
        assert!(savgol_filter(&y, 6, 2).is_err());
        assert!(savgol_filter(&y, 5, 5).is_err());
        assert!(savgol_filter(&y, 21, 2).is_err());
    }

    #[test]
    fn test_whittaker_reduces_noise() {
        let clean: Vec<f64> = (0..200).map(|i| (i as f64 / 20.0).sin()).collect();
        let noisy: Vec<f64> = clean
            .iter()
            .enumerate()
            .map(|(i, v)| v + if i % 2 == 0 { 0.2 } else { -0.2 })
            .collect();
        let z = whittaker_smooth(&noisy, 10.0, 2).unwrap();
        let err = |s: &[f64]| s.iter().zip(&clean).map(|(a, b)| (a - b).powi(2)).sum::<f64>();
        assert!(err(&z) < 0.1 * err(&noisy));
    }

    #[test]
    fn test_map_smoothing_matches_preview() {
        for smoother in [
            Smoother::Whittaker { lambda: 100.0, order: 2 },
            Smoother::SavitzkyGolay { window: 7, order: 2 },
        ] {
            let mut map = synthetic_map(2, 2, 9);
            let preview = preview_smoothing(&map, 1, 0, &smoother).unwrap();
            let mut log = ReproLog::new();
            smooth(&mut map, &smoother, &mut Progress::none(), &mut log).unwrap();
            assert_eq!(map.spectrum(1, 0), preview.view());
            assert_eq!(log.len(), 1);
        }
    }

    #[test]
    fn test_invalid_window_leaves_map() {
        let mut map = synthetic_map(1, 2, 0);
        let before = map.data().clone();
        let mut log = ReproLog::new();
        let bad = Smoother::SavitzkyGolay { window: 4, order: 2 };
        assert!(smooth(&mut map, &bad, &mut Progress::none(), &mut log).is_err());
        assert_eq!(map.data(), &before);
    }
}
