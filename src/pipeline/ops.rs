//! Serialisable descriptors for every map-level operation.
//!
//! Each processing function records its descriptor in the reproducibility log;
//! [`apply`] turns a descriptor back into the call, so a logged session or a
//! pipeline file can be replayed on other maps.

use serde::{Deserialize, Serialize};

use super::baseline::{remove_background, BaselineParams};
use super::crop::{crop_map, crop_spectra_absolute, crop_spectra_relative};
use super::decomposition::{nmf, pca};
use super::linearize::linearize;
use super::progress::Progress;
use super::smoothing::{smooth, Smoother};
use super::spikes::{remove_spikes, SpikeParams};
use super::water::{normalize_water, WaterParams};
use crate::data::units::convert_to_shift;
use crate::data::{ReferenceSpectrum, SpectralMap};
use crate::error::{invalid, ProcessResult};
use crate::log::reproducibility::ReproLog;

const MISSING_REFERENCE: &str =
    "water normalization needs a reference spectrum; set `reference` in the pipeline config";

/// Processing operation descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProcessingOp {
    CropSpectraAbsolute { start: f64, end: f64 },
    CropSpectraRelative { from_start: usize, from_end: usize },
    CropMap {
        left: usize,
        top: usize,
        right: usize,
        bottom: usize,
    },
    ConvertToShift { excitation_nm: f64 },
    RemoveSpikes(SpikeParams),
    RemoveBackground(BaselineParams),
    Smooth(Smoother),
    Linearize { step: f64 },
    NormalizeWater(WaterParams),
    Pca { components: usize },
    Nmf {
        components: usize,
        max_iter: usize,
        tol: f64,
    },
}

impl ProcessingOp {
    /// Whether applying this operation needs a reference spectrum.
    pub fn needs_reference(&self) -> bool {
        matches!(self, ProcessingOp::NormalizeWater(_))
    }
}

impl std::fmt::Display for ProcessingOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingOp::CropSpectraAbsolute { start, end } => {
                write!(f, "Crop Spectra ({:.1}–{:.1})", start, end)
            }
            ProcessingOp::CropSpectraRelative {
                from_start,
                from_end,
            } => write!(f, "Crop Spectra (−{} / −{} bins)", from_start, from_end),
            ProcessingOp::CropMap {
                left,
                top,
                right,
                bottom,
            } => write!(f, "Crop Map (rows {}..{}, cols {}..{})", top, bottom, left, right),
            ProcessingOp::ConvertToShift { excitation_nm } => {
                write!(f, "Convert to Raman Shift ({} nm)", excitation_nm)
            }
            ProcessingOp::RemoveSpikes(p) => write!(f, "Spike Removal (Z > {})", p.threshold),
            ProcessingOp::RemoveBackground(p) => {
                if p.ignore_water {
                    write!(f, "Background Removal: {} (water ignored)", p.method)
                } else {
                    write!(f, "Background Removal: {}", p.method)
                }
            }
            ProcessingOp::Smooth(s) => write!(f, "Smoothing: {}", s),
            ProcessingOp::Linearize { step } => write!(f, "Linearize (step {})", step),
            ProcessingOp::NormalizeWater(p) => {
                write!(f, "Water Normalization (target {})", p.target)
            }
            ProcessingOp::Pca { components } => write!(f, "PCA ({} components)", components),
            ProcessingOp::Nmf { components, .. } => write!(f, "NMF ({} components)", components),
        }
    }
}

/// Run one descriptor against a map. `reference` is only used by water
/// normalization, which fails without one.
pub fn apply(
    map: &mut SpectralMap,
    op: &ProcessingOp,
    reference: Option<&ReferenceSpectrum>,
    progress: &mut Progress<'_>,
    log: &mut ReproLog,
) -> ProcessResult<()> {
    match op {
        ProcessingOp::CropSpectraAbsolute { start, end } => {
            crop_spectra_absolute(map, *start, *end, log)
        }
        ProcessingOp::CropSpectraRelative {
            from_start,
            from_end,
        } => crop_spectra_relative(map, *from_start, *from_end, log),
        ProcessingOp::CropMap {
            left,
            top,
            right,
            bottom,
        } => crop_map(map, *left, *top, *right, *bottom, log),
        ProcessingOp::ConvertToShift { excitation_nm } => {
            convert_to_shift(map, *excitation_nm, log)
        }
        ProcessingOp::RemoveSpikes(params) => remove_spikes(map, params, log).map(|_| ()),
        ProcessingOp::RemoveBackground(params) => remove_background(map, params, progress, log),
        ProcessingOp::Smooth(smoother) => smooth(map, smoother, progress, log),
        ProcessingOp::Linearize { step } => linearize(map, *step, progress, log),
        ProcessingOp::NormalizeWater(params) => match reference {
            Some(reference) => normalize_water(map, reference, params, log).map(|_| ()),
            None => invalid(MISSING_REFERENCE),
        },
        ProcessingOp::Pca { components } => pca(map, *components, log),
        ProcessingOp::Nmf {
            components,
            max_iter,
            tol,
        } => nmf(map, *components, *max_iter, *tol, progress, log),
    }
}

/// Replay a list of operations in order, stopping at the first failure.
pub fn apply_all(
    map: &mut SpectralMap,
    ops: &[ProcessingOp],
    reference: Option<&ReferenceSpectrum>,
    progress: &mut Progress<'_>,
    log: &mut ReproLog,
) -> ProcessResult<()> {
    for op in ops {
        log::info!("Applying {}", op);
        apply(map, op, reference, progress, log)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::baseline::BaselineMethod;
    use crate::error::ProcessError;
    use crate::test_support::{synthetic_map, synthetic_water, water_map};

    #[test]
    fn test_replay_reproduces_result() {
        let ops = vec![
            ProcessingOp::CropSpectraAbsolute {
                start: 500.0,
                end: 3500.0,
            },
            ProcessingOp::RemoveSpikes(SpikeParams::default()),
            ProcessingOp::RemoveBackground(BaselineParams::new(BaselineMethod::Polynomial {
                degree: 3,
            })),
            ProcessingOp::Smooth(Smoother::SavitzkyGolay {
                window: 7,
                order: 2,
            }),
            ProcessingOp::Linearize { step: 2.0 },
            ProcessingOp::Pca { components: 2 },
        ];
        let mut first = synthetic_map(3, 3, 8);
        let mut log = ReproLog::new();
        apply_all(&mut first, &ops, None, &mut Progress::none(), &mut log).unwrap();
        assert_eq!(log.recipe(), ops);

        let mut second = synthetic_map(3, 3, 8);
        let mut replay_log = ReproLog::new();
        apply_all(&mut second, &log.recipe(), None, &mut Progress::none(), &mut replay_log)
            .unwrap();
        assert_eq!(first.data(), second.data());
        assert_eq!(first.x_axis(), second.x_axis());
        assert_eq!(first.components(), second.components());
    }

    #[test]
    fn test_shape_invariant_after_every_op() {
        let ops = vec![
            ProcessingOp::CropMap {
                left: 0,
                top: 1,
                right: 3,
                bottom: 3,
            },
            ProcessingOp::CropSpectraRelative {
                from_start: 10,
                from_end: 5,
            },
            ProcessingOp::Smooth(Smoother::Whittaker {
                lambda: 50.0,
                order: 2,
            }),
            ProcessingOp::Linearize { step: 3.0 },
            ProcessingOp::Nmf {
                components: 2,
                max_iter: 20,
                tol: 1e-4,
            },
        ];
        let mut map = synthetic_map(4, 3, 1);
        let mut log = ReproLog::new();
        for op in &ops {
            apply(&mut map, op, None, &mut Progress::none(), &mut log).unwrap();
            assert_eq!(map.bins(), map.x_axis().len(), "after {}", op);
            assert_eq!((map.rows(), map.cols()), (2, 3), "after {}", op);
        }
    }

    #[test]
    fn test_water_normalization_requires_reference() {
        let op = ProcessingOp::NormalizeWater(WaterParams::default());
        assert!(op.needs_reference());
        assert!(!ProcessingOp::Linearize { step: 1.0 }.needs_reference());

        let mut map = water_map(3, 3, 4);
        let before = map.data().clone();
        let mut log = ReproLog::new();
        let err = apply(&mut map, &op, None, &mut Progress::none(), &mut log).unwrap_err();
        assert!(matches!(&err, ProcessError::InvalidParameter(msg) if msg.contains("`reference`")));
        assert_eq!(map.data(), &before);
        assert!(log.is_empty());

        let water = synthetic_water();
        apply(&mut map, &op, Some(&water), &mut Progress::none(), &mut log).unwrap();
        assert_eq!(log.recipe(), vec![op]);
    }

    #[test]
    fn test_descriptor_json() {
        let op = ProcessingOp::RemoveBackground(BaselineParams::new(BaselineMethod::Bubblefill {
            min_width: 40,
            water_min_width: 150,
            fit_order: 1,
        }));
        let json = serde_json::to_string(&op).unwrap();
        let back: ProcessingOp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, op);
        assert!(op.to_string().contains("Bubblefill"));
    }
}
