use serde::{Deserialize, Serialize};

use crate::core::error::PageError;
use crate::core::geometry::BBox;
use crate::equation::EquationNode;

pub type RegionId = u32;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    Text,
    Image,
    Formula,
}

/// A region found by the layout stage. Never modified after loading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Region {
    pub page_index: usize,
    pub region_id: RegionId,
    pub bbox: BBox,
    pub kind: RegionKind,
    pub order_hint: usize,
    /// Verbatim text for text regions, an image reference for image and formula regions.
    pub raw_content: String,
    /// Display (block) formula as opposed to an inline one.
    #[serde(default)]
    pub display: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionStatus {
    Ok,
    LowConfidence,
    Failed,
}

/// Output of the recognizer for one formula region.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormulaCandidate {
    pub source_region_id: RegionId,
    pub bbox: BBox,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recognized_latex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    pub recognition_status: RecognitionStatus,
    /// Where the crop sent to the recognizer was saved, if it was saved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl FormulaCandidate {
    pub fn recognized(
        region: &Region,
        latex: String,
        confidence: Option<f32>,
        confidence_threshold: f32,
    ) -> Self {
        let status = if latex.trim().is_empty() {
            RecognitionStatus::Failed
        } else if confidence.is_some_and(|c| c < confidence_threshold) {
            RecognitionStatus::LowConfidence
        } else {
            RecognitionStatus::Ok
        };
        let failure = (status == RecognitionStatus::Failed)
            .then(|| "recognizer returned an empty result".to_string());
        Self {
            source_region_id: region.region_id,
            bbox: region.bbox,
            recognized_latex: (status != RecognitionStatus::Failed).then_some(latex),
            confidence,
            recognition_status: status,
            crop_ref: None,
            failure,
        }
    }

    pub fn failed(region: &Region, reason: impl Into<String>) -> Self {
        Self {
            source_region_id: region.region_id,
            bbox: region.bbox,
            recognized_latex: None,
            confidence: None,
            recognition_status: RecognitionStatus::Failed,
            crop_ref: None,
            failure: Some(reason.into()),
        }
    }

    pub fn with_crop_ref(mut self, crop_ref: Option<String>) -> Self {
        self.crop_ref = crop_ref;
        self
    }

    pub fn is_failed(&self) -> bool {
        self.recognition_status == RecognitionStatus::Failed
    }

    /// Confidence used for ranking; a recognizer that reports none ranks lowest.
    pub fn rank_confidence(&self) -> f32 {
        self.confidence.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// No recognized formula overlapped the layout region enough.
    Unmatched,
    /// The recognizer was asked but produced nothing usable.
    RecognitionFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MergedBlock {
    Text {
        /// More than one id when duplicate detections were collapsed.
        region_ids: Vec<RegionId>,
        bbox: BBox,
        content: String,
    },
    Image {
        region_id: RegionId,
        bbox: BBox,
        image_ref: String,
    },
    Formula {
        region_id: RegionId,
        bbox: BBox,
        display: bool,
        candidate: FormulaCandidate,
        #[serde(skip_serializing_if = "Option::is_none")]
        equation: Option<EquationNode>,
    },
    /// A formula that could not be recognized, kept as an inspectable placeholder.
    FormulaFallback {
        region_id: RegionId,
        bbox: BBox,
        reason: FallbackReason,
        placeholder: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        image_ref: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        candidate: Option<FormulaCandidate>,
    },
}

impl MergedBlock {
    pub fn bbox(&self) -> BBox {
        match self {
            MergedBlock::Text { bbox, .. }
            | MergedBlock::Image { bbox, .. }
            | MergedBlock::Formula { bbox, .. }
            | MergedBlock::FormulaFallback { bbox, .. } => *bbox,
        }
    }

    pub fn region_ids(&self) -> Vec<RegionId> {
        match self {
            MergedBlock::Text { region_ids, .. } => region_ids.clone(),
            MergedBlock::Image { region_id, .. }
            | MergedBlock::Formula { region_id, .. }
            | MergedBlock::FormulaFallback { region_id, .. } => vec![*region_id],
        }
    }

    /// Smallest covered region id; the last tie-breaker of reading order.
    pub fn primary_region_id(&self) -> RegionId {
        self.region_ids().into_iter().min().unwrap_or(RegionId::MAX)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MergedBlock::Text { .. } => "text",
            MergedBlock::Image { .. } => "image",
            MergedBlock::Formula { .. } => "formula",
            MergedBlock::FormulaFallback { .. } => "formula_fallback",
        }
    }

    pub fn text_content(&self) -> Option<&str> {
        match self {
            MergedBlock::Text { content, .. } => Some(content),
            MergedBlock::FormulaFallback { placeholder, .. } => Some(placeholder),
            _ => None,
        }
    }

    pub fn candidate(&self) -> Option<&FormulaCandidate> {
        match self {
            MergedBlock::Formula { candidate, .. } => Some(candidate),
            MergedBlock::FormulaFallback { candidate, .. } => candidate.as_ref(),
            _ => None,
        }
    }

    pub fn equation(&self) -> Option<&EquationNode> {
        match self {
            MergedBlock::Formula { equation, .. } => equation.as_ref(),
            _ => None,
        }
    }
}

/// What a reviewer needs to know about one page: how much came through cleanly
/// and what needs manual correction.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageReport {
    pub regions: usize,
    pub blocks: usize,
    pub recovered: usize,
    pub low_confidence: usize,
    pub fallback_formulas: usize,
    pub unsupported_fragments: usize,
    pub duplicates_collapsed: usize,
    pub orphan_candidates: usize,
}

impl PageReport {
    pub fn degraded(&self) -> usize {
        self.low_confidence + self.fallback_formulas
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageModel {
    pub page_index: usize,
    pub blocks: Vec<MergedBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_image_ref: Option<String>,
    pub report: PageReport,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageFailure {
    pub page_index: usize,
    pub error: PageError,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentModel {
    pub pages: Vec<PageModel>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<PageFailure>,
}

impl DocumentModel {
    pub fn total_report(&self) -> PageReport {
        self.pages
            .iter()
            .fold(PageReport::default(), |mut acc, page| {
                let r = &page.report;
                acc.regions += r.regions;
                acc.blocks += r.blocks;
                acc.recovered += r.recovered;
                acc.low_confidence += r.low_confidence;
                acc.fallback_formulas += r.fallback_formulas;
                acc.unsupported_fragments += r.unsupported_fragments;
                acc.duplicates_collapsed += r.duplicates_collapsed;
                acc.orphan_candidates += r.orphan_candidates;
                acc
            })
    }
}
