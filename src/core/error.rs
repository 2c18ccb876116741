use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by the external formula recognizer for one batch.
#[derive(Debug, Error)]
pub enum RecognitionError {
    /// Timeouts, resource exhaustion, crashed worker process. Worth one retry.
    #[error("transient recognition failure: {0}")]
    Transient(String),

    /// The recognizer rejected the input or is misconfigured; retrying will not help.
    #[error("recognition failed: {0}")]
    Fatal(String),
}

impl RecognitionError {
    pub fn is_transient(&self) -> bool {
        matches!(self, RecognitionError::Transient(_))
    }
}

/// The region set of one page could not be interpreted.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("malformed layout on page {page_index}: {reason}")]
pub struct MalformedLayoutError {
    pub page_index: usize,
    pub region_id: Option<u32>,
    pub reason: String,
}

impl MalformedLayoutError {
    pub fn new(page_index: usize, reason: impl Into<String>) -> Self {
        Self {
            page_index,
            region_id: None,
            reason: reason.into(),
        }
    }

    pub fn for_region(page_index: usize, region_id: u32, reason: impl Into<String>) -> Self {
        Self {
            page_index,
            region_id: Some(region_id),
            reason: reason.into(),
        }
    }
}

/// Writing the final outputs failed. Aborts the whole run.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("cannot create output directory {path}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot serialize {what}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Why a page is missing from the document model.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageError {
    #[error("{reason}")]
    MalformedLayout {
        region_id: Option<u32>,
        reason: String,
    },

    #[error("conversion cancelled before the page completed")]
    Cancelled,
}

impl From<MalformedLayoutError> for PageError {
    fn from(err: MalformedLayoutError) -> Self {
        PageError::MalformedLayout {
            region_id: err.region_id,
            reason: err.reason,
        }
    }
}
