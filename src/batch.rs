//! Batch processing of many container files and result export.
//!
//! Each input is processed independently: a failure is logged and recorded
//! in the [`BatchReport`], and the batch moves on to the next file.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::PipelineConfig;
use crate::data::container::{load_map, save_map};
use crate::data::{ReferenceSpectrum, SpectralMap};
use crate::error::{ProcessError, ProcessResult};
use crate::log::reproducibility::ReproLog;
use crate::pipeline::ops::apply_all;
use crate::pipeline::progress::Progress;

/// File extension of the map container.
pub const MAP_EXTENSION: &str = "rmap";

/// `dir/base[_tag].ext`, or the first of `base[_tag]_1.ext`, `_2`, … that does
/// not exist yet.
pub fn unique_output_path(dir: &Path, base: &str, tag: Option<&str>, ext: &str) -> PathBuf {
    let stem = match tag {
        Some(t) if !t.is_empty() => format!("{}_{}", base, t),
        _ => base.to_string(),
    };
    let candidate = dir.join(format!("{}.{}", stem, ext));
    if !candidate.exists() {
        return candidate;
    }
    (1..)
        .map(|i| dir.join(format!("{}_{}.{}", stem, i, ext)))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

/// Write each component as a text table: the spectral loading followed by
/// the spatial scores. Fails with [`ProcessError::NoComponents`] when no
/// decomposition has been run.
pub fn export_components_text(
    map: &SpectralMap,
    dir: &Path,
    base: &str,
    tag: Option<&str>,
) -> ProcessResult<Vec<PathBuf>> {
    if map.components().is_empty() {
        return Err(ProcessError::NoComponents);
    }
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    for (i, comp) in map.components().iter().enumerate() {
        let mut out = String::new();
        // Writing to a String cannot fail
        let _ = writeln!(out, "# component {} of {}", i + 1, map.components().len());
        let _ = writeln!(out, "# x\tloading");
        for (x, v) in map.x_axis().iter().zip(comp.plot.iter()) {
            let _ = writeln!(out, "{}\t{}", x, v);
        }
        let _ = writeln!(out, "# row\tcol\tscore");
        for ((r, c), v) in comp.map.indexed_iter() {
            let _ = writeln!(out, "{}\t{}\t{}", r, c, v);
        }
        let path = unique_output_path(dir, &format!("{}_component{}", base, i + 1), tag, "txt");
        fs::write(&path, out)?;
        written.push(path);
    }
    log::info!("Exported {} components to {}", written.len(), dir.display());
    Ok(written)
}

/// Outcome of one batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// `(input, saved map)`
    pub succeeded: Vec<(PathBuf, PathBuf)>,
    /// `(input, error message)`
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchReport {
    pub fn summary(&self) -> String {
        format!(
            "{} processed, {} failed",
            self.succeeded.len(),
            self.failed.len()
        )
    }
}

/// Load, process and save one file. Returns the path of the saved map.
pub fn process_file(
    input: &Path,
    config: &PipelineConfig,
    reference: Option<&ReferenceSpectrum>,
) -> ProcessResult<PathBuf> {
    let mut log = ReproLog::new();
    let mut map = load_map(input, &mut log)?;
    let mut ticks = 0usize;
    let mut count = || ticks += 1;
    apply_all(
        &mut map,
        &config.ops,
        reference,
        &mut Progress::new(&mut count),
        &mut log,
    )?;
    log::debug!("{}: {} work units", input.display(), ticks);

    fs::create_dir_all(&config.output_dir)?;
    let base = if map.sample_name.is_empty() {
        "map".to_string()
    } else {
        map.sample_name.clone()
    };
    let tag = config.tag.as_deref();
    let out = unique_output_path(&config.output_dir, &base, tag, MAP_EXTENSION);
    save_map(&map, &out, &mut log)?;

    if config.export_components && !map.components().is_empty() {
        export_components_text(&map, &config.output_dir, &base, tag)?;
    }
    if config.save_log {
        log.save_text(&unique_output_path(&config.output_dir, &base, tag, "log.txt"))?;
        log.save_json(&unique_output_path(&config.output_dir, &base, tag, "log.json"))?;
        log.save_recipe(&unique_output_path(&config.output_dir, &base, tag, "recipe.json"))?;
    }
    Ok(out)
}

/// Process every input with the same configuration. Only an invalid
/// configuration or a bad reference spectrum aborts the batch; per-file
/// errors are collected in the report.
pub fn run_batch(inputs: &[PathBuf], config: &PipelineConfig) -> ProcessResult<BatchReport> {
    config.validate()?;
    let reference = config.reference_spectrum()?;
    let mut report = BatchReport::default();
    for (i, input) in inputs.iter().enumerate() {
        log::info!("[{}/{}] Processing {}", i + 1, inputs.len(), input.display());
        match process_file(input, config, reference.as_ref()) {
            Ok(out) => {
                log::info!("Saved {}", out.display());
                report.succeeded.push((input.clone(), out));
            }
            Err(e) => {
                log::error!("Failed on {}: {}", input.display(), e);
                report.failed.push((input.clone(), e.to_string()));
            }
        }
    }
    log::info!("Batch finished: {}", report.summary());
    Ok(report)
}
