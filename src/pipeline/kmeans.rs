//! Lloyd's k-means with k-means++ seeding, deterministic for a fixed seed.

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn sq_dist(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn init_plus_plus(points: ArrayView2<f64>, k: usize, rng: &mut StdRng) -> Array2<f64> {
    let n = points.nrows();
    let mut centers = Array2::zeros((k, points.ncols()));
    let first = rng.gen_range(0..n);
    centers.row_mut(0).assign(&points.row(first));

    let mut nearest: Vec<f64> = points
        .outer_iter()
        .map(|p| sq_dist(p, centers.row(0)))
        .collect();
    for c in 1..k {
        let total: f64 = nearest.iter().sum();
        let pick = if total > 0.0 {
            let mut target = rng.gen_range(0.0..total);
            let mut chosen = n - 1;
            for (i, &d) in nearest.iter().enumerate() {
                if target < d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            chosen
        } else {
            // All points coincide with existing centres
            rng.gen_range(0..n)
        };
        centers.row_mut(c).assign(&points.row(pick));
        for (i, p) in points.outer_iter().enumerate() {
            nearest[i] = nearest[i].min(sq_dist(p, centers.row(c)));
        }
    }
    centers
}

/// Cluster the rows of `points` into at most `k` groups; returns one label per
/// row. `k` is clamped to the number of rows.
pub fn kmeans(points: ArrayView2<f64>, k: usize, max_iter: usize, seed: u64) -> Vec<usize> {
    let n = points.nrows();
    if n == 0 || k == 0 {
        return vec![0; n];
    }
    let k = k.min(n);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut centers = init_plus_plus(points, k, &mut rng);
    let mut labels = vec![usize::MAX; n];

    for iter in 0..max_iter {
        let mut changed = false;
        for (i, p) in points.outer_iter().enumerate() {
            let best = centers
                .outer_iter()
                .enumerate()
                .map(|(c, center)| (c, sq_dist(p, center)))
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(c, _)| c)
                .unwrap_or(0);
            if labels[i] != best {
                labels[i] = best;
                changed = true;
            }
        }
        if !changed {
            log::debug!("k-means converged after {} iterations", iter);
            break;
        }

        let mut sums = Array2::<f64>::zeros(centers.dim());
        let mut counts = vec![0usize; k];
        for (i, p) in points.outer_iter().enumerate() {
            let mut row = sums.row_mut(labels[i]);
            row += &p;
            counts[labels[i]] += 1;
        }
        for (c, mut center) in centers.axis_iter_mut(Axis(0)).enumerate() {
            // Empty clusters keep their previous centre
            if counts[c] > 0 {
                center.assign(&(&sums.row(c) / counts[c] as f64));
            }
        }
    }
    labels
}
