//! Synthetic maps shared by the unit tests.

use ndarray::{Array1, Array3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::data::{AxisUnit, ReferenceSpectrum, SpectralMap};
use crate::numeric::spline::CubicSpline;

/// 400–3800 rel. 1/cm in steps of 5 (681 bins).
pub fn axis() -> Array1<f64> {
    Array1::from_iter((0..=680).map(|i| 400.0 + 5.0 * i as f64))
}

fn gaussian(x: f64, center: f64, sigma: f64) -> f64 {
    (-0.5 * ((x - center) / sigma).powi(2)).exp()
}

/// Sloped, gently curved baseline.
pub fn baseline(x: f64) -> f64 {
    let t = (x - 400.0) / 3400.0;
    40.0 + 60.0 * t + 30.0 * t * t
}

/// Peaks shared by every pixel, amplitudes vary smoothly over the grid.
pub fn peaks(x: f64, scale: f64) -> f64 {
    scale
        * (80.0 * gaussian(x, 1000.0, 12.0)
            + 60.0 * gaussian(x, 1450.0, 15.0)
            + 50.0 * gaussian(x, 1600.0, 12.0)
            + 70.0 * gaussian(x, 2900.0, 20.0))
}

/// `rows × cols` map of peaks on a baseline with small seeded noise.
pub fn synthetic_map(rows: usize, cols: usize, seed: u64) -> SpectralMap {
    let x = axis();
    let mut rng = StdRng::seed_from_u64(seed);
    let data = Array3::from_shape_fn((rows, cols, x.len()), |(r, c, b)| {
        let scale = 1.0 + 0.05 * (r + c) as f64;
        let xb = x[b];
        baseline(xb) * (1.0 + 0.02 * r as f64) + peaks(xb, scale) + rng.gen_range(-0.2..0.2)
    });
    SpectralMap::new(data, x, AxisUnit::RamanShift).expect("synthetic map is consistent")
}

/// Approximate Raman spectrum of liquid water: H-O-H bend near 1640 1/cm
/// and the two-component O-H stretch envelope near 3230/3420 1/cm.
pub fn synthetic_water() -> ReferenceSpectrum {
    let bands = [(1640.0, 45.0, 0.08), (3230.0, 110.0, 0.75), (3420.0, 120.0, 1.0)];
    let x: Vec<f64> = (0..=1900).map(|i| 200.0 + 2.0 * i as f64).collect();
    let y = x
        .iter()
        .map(|&xi| {
            bands
                .iter()
                .map(|&(c, w, a)| a * (-0.5 * ((xi - c) / w).powi(2)).exp())
                .sum()
        })
        .collect();
    ReferenceSpectrum::new("synthetic-water", x, y).expect("water reference is valid")
}

/// Like [`synthetic_map`], but column 0 holds water-like spectra (scaled
/// [`synthetic_water`] on a constant offset).
pub fn water_map(rows: usize, cols: usize, seed: u64) -> SpectralMap {
    let x = axis();
    let water = synthetic_water();
    let spline = CubicSpline::new(&water.x, &water.y).expect("water reference is valid");
    let mut rng = StdRng::seed_from_u64(seed);
    let data = Array3::from_shape_fn((rows, cols, x.len()), |(r, c, b)| {
        let xb = x[b];
        let noise = rng.gen_range(-0.05..0.05);
        if c == 0 {
            20.0 + (300.0 + 10.0 * r as f64) * spline.eval(xb) + noise
        } else {
            baseline(xb) + peaks(xb, 1.0) + noise
        }
    });
    SpectralMap::new(data, x, AxisUnit::RamanShift).expect("synthetic map is consistent")
}
