//! Cosmic-ray spike detection and repair.
//!
//! Detection runs in four stages: spectra are clustered (outside the silent
//! region) so that statistics are pooled over similar pixels; first
//! differences are scored with a modified Z-score; each hit is aligned to the
//! local maximum; and candidates that correlate with their spatial neighbours
//! are discarded as real spectral features. Accepted spikes are repaired by
//! linear interpolation across a fixed window.

use std::collections::BTreeSet;

use ndarray::{s, Array1, Array2, ArrayView1, ArrayViewMut1, Axis};
use serde::{Deserialize, Serialize};

use super::kmeans::kmeans;
use super::ops::ProcessingOp;
use crate::data::regions::{Region, SILENT_REGION};
use crate::data::SpectralMap;
use crate::error::{invalid, ProcessError, ProcessResult};
use crate::log::reproducibility::ReproLog;
use crate::numeric::stats;

/// Tunable constants of the detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpikeParams {
    /// Bins in this range are left out of clustering
    pub silent_region: Region,
    pub clusters: usize,
    pub max_iter: usize,
    pub seed: u64,
    /// Scale of the modified Z-score
    pub z_constant: f64,
    /// Percentile of |diff| used as location estimate
    pub percentile: f64,
    pub threshold: f64,
    /// Half-width of the alignment, correlation and repair window
    pub window: usize,
    pub correlation_threshold: f64,
}

impl Default for SpikeParams {
    fn default() -> Self {
        Self {
            silent_region: SILENT_REGION,
            clusters: 8,
            max_iter: 100,
            seed: 0,
            z_constant: 0.6745,
            percentile: 90.0,
            threshold: 6.5,
            window: 5,
            correlation_threshold: 0.9,
        }
    }
}

impl SpikeParams {
    fn validate(&self) -> ProcessResult<()> {
        if self.clusters == 0 {
            return invalid("spike detection needs at least one cluster");
        }
        if self.window == 0 {
            return invalid("spike window must be at least 1");
        }
        if !(0.0..=100.0).contains(&self.percentile) {
            return invalid(format!("percentile {} outside 0..=100", self.percentile));
        }
        Ok(())
    }
}

/// One accepted spike: pixel and the spectral index of its top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Spike {
    pub row: usize,
    pub col: usize,
    pub top: usize,
}

/// Memoized detection result, valid until the map data changes.
#[derive(Debug, Clone)]
pub struct SpikeInfo {
    pub params: SpikeParams,
    pub spikes: Vec<Spike>,
}

/// Detect spikes, reusing the memoized result when the parameters match.
pub fn detect_spikes(map: &mut SpectralMap, params: &SpikeParams) -> ProcessResult<Vec<Spike>> {
    params.validate()?;
    if map.is_empty() {
        return Err(ProcessError::EmptyMap);
    }
    if let Some(info) = &map.spike_info {
        if info.params == *params {
            return Ok(info.spikes.clone());
        }
    }
    let spikes = find_spikes(map, params);
    log::debug!("Spike detection found {} spikes", spikes.len());
    map.spike_info = Some(SpikeInfo {
        params: params.clone(),
        spikes: spikes.clone(),
    });
    Ok(spikes)
}

/// Number of detected spikes per pixel.
pub fn spike_map(map: &mut SpectralMap, params: &SpikeParams) -> ProcessResult<Array2<usize>> {
    let spikes = detect_spikes(map, params)?;
    let mut counts = Array2::zeros((map.rows(), map.cols()));
    for s in spikes {
        counts[[s.row, s.col]] += 1;
    }
    Ok(counts)
}

/// Detect and repair spikes in place. Returns the number repaired.
pub fn remove_spikes(
    map: &mut SpectralMap,
    params: &SpikeParams,
    log: &mut ReproLog,
) -> ProcessResult<usize> {
    let spikes = detect_spikes(map, params)?;
    if !spikes.is_empty() {
        let w = params.window;
        map.modify(|mut data| {
            for sp in &spikes {
                repair(data.slice_mut(s![sp.row, sp.col, ..]), sp.top, w);
            }
        });
    }
    let pixels: BTreeSet<(usize, usize)> = spikes.iter().map(|s| (s.row, s.col)).collect();
    log.add_entry(
        &ProcessingOp::RemoveSpikes(params.clone()),
        &format!(
            "Repaired {} spikes in {} pixels (threshold {}, correlation < {})",
            spikes.len(),
            pixels.len(),
            params.threshold,
            params.correlation_threshold
        ),
    );
    Ok(spikes.len())
}

fn find_spikes(map: &SpectralMap, params: &SpikeParams) -> Vec<Spike> {
    let (_, cols, bins) = map.shape();
    if bins < 2 {
        return Vec::new();
    }
    let flat = map.flattened();
    let keep: Vec<usize> = map
        .x_axis()
        .iter()
        .enumerate()
        .filter(|&(_, &x)| !params.silent_region.contains(x))
        .map(|(i, _)| i)
        .collect();
    let labels = kmeans(
        flat.select(Axis(1), &keep).view(),
        params.clusters,
        params.max_iter,
        params.seed,
    );
    let n_clusters = labels.iter().max().map_or(0, |m| m + 1);

    // (pixel, top) pairs, deduplicated
    let mut candidates: BTreeSet<(usize, usize)> = BTreeSet::new();
    for cluster in 0..n_clusters {
        let members: Vec<usize> = (0..labels.len()).filter(|&p| labels[p] == cluster).collect();
        if members.is_empty() {
            continue;
        }
        let diffs: Vec<Vec<f64>> = members
            .iter()
            .map(|&p| stats::diff(&flat.row(p).to_vec()))
            .collect();
        let abs_all: Vec<f64> = diffs.iter().flatten().map(|d| d.abs()).collect();
        let location = stats::percentile(&abs_all, params.percentile);
        let deviations: Vec<f64> = abs_all.iter().map(|a| (a - location).abs()).collect();
        let mad = stats::median(&deviations);
        if !(mad > 0.0 && mad.is_finite()) {
            log::debug!("Cluster {} has zero deviation; no spikes scored", cluster);
            continue;
        }

        for (&p, d) in members.iter().zip(&diffs) {
            for (j, v) in d.iter().enumerate() {
                let score = params.z_constant * (v.abs() - location) / mad;
                if score.abs() > params.threshold {
                    candidates.insert((p, align(flat.row(p), j, params.window)));
                }
            }
        }
    }

    candidates
        .into_iter()
        .filter_map(|(p, top)| {
            let (row, col) = (p / cols, p % cols);
            let reference = neighbour_reference(map, row, col)?;
            let (lo, hi) = window_bounds(top, params.window, bins);
            let own = map.spectrum(row, col).slice(s![lo..=hi]).to_vec();
            let reference = reference.slice(s![lo..=hi]).to_vec();
            let corr = stats::pearson(&own, &reference).unwrap_or(0.0);
            (corr < params.correlation_threshold).then_some(Spike { row, col, top })
        })
        .collect()
}

fn window_bounds(center: usize, half: usize, len: usize) -> (usize, usize) {
    (center.saturating_sub(half), (center + half).min(len - 1))
}

/// Index of the largest sample within `half` of difference index `j`.
fn align(spectrum: ArrayView1<f64>, j: usize, half: usize) -> usize {
    let (lo, hi) = window_bounds(j, half, spectrum.len());
    (lo..=hi)
        .max_by(|&a, &b| spectrum[a].total_cmp(&spectrum[b]))
        .unwrap_or(j)
}

/// Mean of the vertical neighbours; horizontal neighbours when the map has a
/// single row. `None` for an isolated pixel.
fn neighbour_reference(map: &SpectralMap, row: usize, col: usize) -> Option<Array1<f64>> {
    let (rows, cols, bins) = map.shape();
    let vertical: Vec<(usize, usize)> = [row.checked_sub(1), (row + 1 < rows).then_some(row + 1)]
        .into_iter()
        .flatten()
        .map(|r| (r, col))
        .collect();
    let picks = if vertical.is_empty() {
        [col.checked_sub(1), (col + 1 < cols).then_some(col + 1)]
            .into_iter()
            .flatten()
            .map(|c| (row, c))
            .collect()
    } else {
        vertical
    };
    if picks.is_empty() {
        return None;
    }
    let mut acc = Array1::<f64>::zeros(bins);
    for &(r, c) in &picks {
        acc += &map.spectrum(r, c);
    }
    Some(acc / picks.len() as f64)
}

/// Replace `top ± half` by a straight line between the window endpoints. A
/// window clipped by the spectrum boundary uses the surviving endpoint on
/// both sides.
fn repair(mut spectrum: ArrayViewMut1<f64>, top: usize, half: usize) {
    let n = spectrum.len();
    let lo = top.checked_sub(half);
    let hi = (top + half < n).then_some(top + half);
    let (a, b) = match (lo, hi) {
        (Some(l), Some(h)) => (spectrum[l], spectrum[h]),
        (None, Some(h)) => (spectrum[h], spectrum[h]),
        (Some(l), None) => (spectrum[l], spectrum[l]),
        (None, None) => return,
    };
    let start = lo.unwrap_or(0);
    let end = hi.unwrap_or(n - 1);
    let span = (end - start) as f64;
    for i in start..=end {
        let t = if span > 0.0 { (i - start) as f64 / span } else { 0.0 };
        spectrum[i] = a + (b - a) * t;
    }
}
