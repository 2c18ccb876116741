use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::model::{DocumentModel, PageFailure, PageReport};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageTiming {
    pub stage: String,
    pub millis: u128,
}

impl StageTiming {
    pub fn new(stage: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            stage: stage.into(),
            millis: elapsed.as_millis(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSummary {
    pub page_index: usize,
    #[serde(flatten)]
    pub report: PageReport,
}

/// What went into `report.json`: per-page counts, failed pages, stage timings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub pages: Vec<PageSummary>,
    pub totals: PageReport,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<PageFailure>,
    #[serde(default)]
    pub stages: Vec<StageTiming>,
}

impl RunReport {
    pub fn from_model(model: &DocumentModel, stages: Vec<StageTiming>) -> Self {
        Self {
            pages: model
                .pages
                .iter()
                .map(|page| PageSummary {
                    page_index: page.page_index,
                    report: page.report.clone(),
                })
                .collect(),
            totals: model.total_report(),
            failures: model.failures.clone(),
            stages,
        }
    }

    pub fn needs_review(&self) -> bool {
        self.totals.degraded() > 0 || self.totals.unsupported_fragments > 0 || !self.failures.is_empty()
    }
}
