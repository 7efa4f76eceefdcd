//! Reference spectra used for matching (e.g. pure water).

use std::fs;
use std::path::Path;

use crate::error::{invalid, ProcessResult};

/// A reference spectrum on its own, ascending x-axis.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceSpectrum {
    pub name: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl ReferenceSpectrum {
    pub fn new(name: &str, x: Vec<f64>, y: Vec<f64>) -> ProcessResult<Self> {
        if x.len() != y.len() {
            return invalid(format!(
                "reference '{}' has {} x values but {} y values",
                name,
                x.len(),
                y.len()
            ));
        }
        if x.len() < 3 {
            return invalid(format!("reference '{}' needs at least 3 points", name));
        }
        let mut pairs: Vec<(f64, f64)> = x.into_iter().zip(y).collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        if pairs.windows(2).any(|w| w[0].0 == w[1].0) {
            return invalid(format!("reference '{}' has duplicate x values", name));
        }
        let (x, y) = pairs.into_iter().unzip();
        Ok(Self {
            name: name.to_string(),
            x,
            y,
        })
    }

    /// Parse a two-column text file (whitespace, comma or semicolon separated).
    /// Lines starting with `#` and lines that do not parse as two numbers are skipped.
    pub fn load(path: &Path) -> ProcessResult<Self> {
        let text = fs::read_to_string(path)?;
        let mut x = Vec::new();
        let mut y = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line
                .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
                .filter(|f| !f.is_empty())
                .map(str::parse::<f64>);
            if let (Some(Ok(a)), Some(Ok(b))) = (fields.next(), fields.next()) {
                x.push(a);
                y.push(b);
            }
        }
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "reference".to_string());
        log::info!("Loaded reference '{}' ({} points)", name, x.len());
        Self::new(&name, x, y)
    }

    /// Cheap fingerprint used to tell whether a memoized match was computed
    /// against this reference.
    pub fn fingerprint(&self) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut h = std::collections::hash_map::DefaultHasher::new();
        self.name.hash(&mut h);
        for v in self.x.iter().chain(self.y.iter()) {
            v.to_bits().hash(&mut h);
        }
        h.finish()
    }
}
