/// Reproducibility logging system
///
/// Every operation performed on a spectral map is recorded with:
/// - Timestamp
/// - Operation name and description
/// - The exact operation descriptor (all parameter values)
/// - Sequential order
///
/// The log can be exported as:
/// - Human-readable text
/// - JSON
/// - A replayable recipe (the ordered operation list)

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

use crate::pipeline::ops::ProcessingOp;

/// A single log entry representing one operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Sequential operation number (1-based)
    pub sequence: usize,
    /// Timestamp when the operation was performed
    pub timestamp: DateTime<Local>,
    /// Human-readable operation name
    pub operation: String,
    /// Detailed description of what was done
    pub description: String,
    /// Descriptor that reproduces this step; `None` for load/save notes
    pub op: Option<ProcessingOp>,
}

impl LogEntry {
    /// Format as human-readable text line
    pub fn to_text(&self) -> String {
        let params = match &self.op {
            Some(op) => serde_json::to_string(op).unwrap_or_else(|e| format!("<{}>", e)),
            None => "(n/a)".to_string(),
        };
        format!(
            "[{:03}] {} | {} | {}\n      Parameters: {}",
            self.sequence,
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.operation,
            self.description,
            params
        )
    }
}

/// The reproducibility log — records all operations in order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReproLog {
    /// Session metadata
    pub session_id: String,
    pub session_start: DateTime<Local>,
    pub source_file: String,
    pub software_version: String,
    /// Ordered list of operations
    pub entries: Vec<LogEntry>,
}

impl ReproLog {
    /// Create a new empty log
    pub fn new() -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            session_start: Local::now(),
            source_file: String::new(),
            software_version: env!("CARGO_PKG_VERSION").to_string(),
            entries: Vec::new(),
        }
    }

    /// Set the source file for this session
    pub fn set_source(&mut self, source: &str) {
        self.source_file = source.to_string();
    }

    /// Record a map operation
    pub fn add_entry(&mut self, op: &ProcessingOp, description: &str) {
        self.push(op.to_string(), description, Some(op.clone()));
    }

    /// Record a step that is not itself replayable (load, save, export)
    pub fn add_note(&mut self, operation: &str, description: &str) {
        self.push(operation.to_string(), description, None);
    }

    fn push(&mut self, operation: String, description: &str, op: Option<ProcessingOp>) {
        let seq = self.entries.len() + 1;
        log::info!("[LOG {:03}] {} — {}", seq, operation, description);
        self.entries.push(LogEntry {
            sequence: seq,
            timestamp: Local::now(),
            operation,
            description: description.to_string(),
            op,
        });
    }

    /// Get the number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The replayable operations, in order
    pub fn recipe(&self) -> Vec<ProcessingOp> {
        self.entries.iter().filter_map(|e| e.op.clone()).collect()
    }

    /// Export as human-readable text
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str("═══════════════════════════════════════════════════════════════\n");
        out.push_str("  Spectral Map Processing Log\n");
        out.push_str("═══════════════════════════════════════════════════════════════\n");
        out.push_str(&format!("  Session ID:  {}\n", self.session_id));
        out.push_str(&format!(
            "  Started:     {}\n",
            self.session_start.format("%Y-%m-%d %H:%M:%S")
        ));
        out.push_str(&format!("  Source:      {}\n", self.source_file));
        out.push_str(&format!("  Software:    raman-map v{}\n", self.software_version));
        out.push_str(&format!("  Operations:  {}\n", self.entries.len()));
        out.push_str("───────────────────────────────────────────────────────────────\n\n");

        for entry in &self.entries {
            out.push_str(&entry.to_text());
            out.push_str("\n\n");
        }

        out.push_str("═══════════════════════════════════════════════════════════════\n");
        out
    }

    /// Export as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("JSON error: {}", e))
    }

    /// Export the recipe as JSON
    pub fn to_recipe_json(&self) -> String {
        serde_json::to_string_pretty(&self.recipe())
            .unwrap_or_else(|e| format!("JSON error: {}", e))
    }

    /// Save log as text file
    pub fn save_text(&self, path: &Path) -> io::Result<()> {
        std::fs::write(path, self.to_text())
    }

    /// Save log as JSON file
    pub fn save_json(&self, path: &Path) -> io::Result<()> {
        std::fs::write(path, self.to_json())
    }

    /// Save the replayable operations as a JSON list
    pub fn save_recipe(&self, path: &Path) -> io::Result<()> {
        std::fs::write(path, self.to_recipe_json())
    }
}

impl Default for ReproLog {
    fn default() -> Self {
        Self::new()
    }
}
