use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::equation::parser::MAX_DEPTH_LIMIT;

/// Tunables for one conversion run.
///
/// Every field has a default, so a config file only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Crops sent to the recognizer per call. Larger batches are faster but hold
    /// more images in the recognizer's memory at once.
    pub batch_size: usize,
    /// Minimum IoU for a layout formula region and a recognized formula to match.
    pub iou_match_threshold: f32,
    /// Recognitions scoring below this are kept but flagged `low_confidence`.
    pub confidence_threshold: f32,
    /// Nesting limit of the LaTeX parser.
    pub max_parse_depth: usize,
    /// Pages processed concurrently.
    pub page_concurrency: usize,
    /// Recognizer calls in flight across all pages.
    pub recognition_concurrency: usize,
    /// Vertical distance (normalized) within which blocks share a reading row.
    pub row_tolerance: f32,
    /// Minimum IoU for two identical text regions to be treated as one detection.
    pub dedup_iou_threshold: f32,
    /// Seconds one recognizer call may run before it is killed and retried.
    pub recognizer_timeout_secs: u64,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            batch_size: 4,
            iou_match_threshold: 0.5,
            confidence_threshold: 0.5,
            max_parse_depth: 32,
            page_concurrency: 2,
            recognition_concurrency: 2,
            row_tolerance: 0.01,
            dedup_iou_threshold: 0.8,
            recognizer_timeout_secs: 120,
        }
    }
}

impl ConversionConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: ConversionConfig = serde_json::from_str(&data)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            anyhow::bail!("batch_size must be at least 1");
        }
        if !(1..=MAX_DEPTH_LIMIT).contains(&self.max_parse_depth) {
            anyhow::bail!(
                "max_parse_depth must be within 1..={MAX_DEPTH_LIMIT}, got {}",
                self.max_parse_depth
            );
        }
        if self.recognizer_timeout_secs == 0 {
            anyhow::bail!("recognizer_timeout_secs must be at least 1");
        }
        if self.page_concurrency == 0 || self.recognition_concurrency == 0 {
            anyhow::bail!("concurrency limits must be at least 1");
        }
        for (name, value) in [
            ("iou_match_threshold", self.iou_match_threshold),
            ("confidence_threshold", self.confidence_threshold),
            ("dedup_iou_threshold", self.dedup_iou_threshold),
            ("row_tolerance", self.row_tolerance),
        ] {
            if !(0.0..=1.0).contains(&value) {
                anyhow::bail!("{name} must be within 0..=1, got {value}");
            }
        }
        Ok(())
    }
}
