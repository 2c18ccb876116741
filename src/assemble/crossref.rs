//! Cross-reference artifact consumed by the verification viewer: every block of
//! every page with what the recognizer said next to what the translator made of it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::geometry::BBox;
use crate::core::model::{DocumentModel, MergedBlock, PageModel, RecognitionStatus, RegionId};
use crate::equation::{EquationNode, Translation};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrossReference {
    /// Keyed by page index.
    pub pages: BTreeMap<usize, Vec<CrossRefEntry>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrossRefEntry {
    pub block_index: usize,
    pub kind: String,
    pub region_ids: Vec<RegionId>,
    pub bbox: BBox,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recognized_latex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recognition_status: Option<RecognitionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equation: Option<EquationNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_latex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub omml: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
}

impl CrossReference {
    pub fn from_model(model: &DocumentModel) -> Self {
        let pages = model
            .pages
            .iter()
            .map(|page| (page.page_index, page_entries(page)))
            .collect();
        Self { pages }
    }
}

fn page_entries(page: &PageModel) -> Vec<CrossRefEntry> {
    page.blocks
        .iter()
        .enumerate()
        .map(|(idx, block)| entry(idx, block))
        .collect()
}

fn entry(block_index: usize, block: &MergedBlock) -> CrossRefEntry {
    let candidate = block.candidate();
    let translation = match block {
        MergedBlock::Formula {
            equation: Some(tree),
            display,
            ..
        } => Some(Translation::from_tree(tree.clone(), *display)),
        _ => None,
    };
    let image_ref = match block {
        MergedBlock::Image { image_ref, .. } => Some(image_ref.clone()),
        MergedBlock::FormulaFallback { image_ref, .. } => image_ref.clone(),
        MergedBlock::Formula { candidate, .. } => candidate.crop_ref.clone(),
        MergedBlock::Text { .. } => None,
    };

    CrossRefEntry {
        block_index,
        kind: block.kind().to_string(),
        region_ids: block.region_ids(),
        bbox: block.bbox(),
        recognized_latex: candidate.and_then(|c| c.recognized_latex.clone()),
        recognition_status: candidate.map(|c| c.recognition_status),
        confidence: candidate.and_then(|c| c.confidence),
        canonical_latex: translation.as_ref().map(|t| t.canonical_latex.clone()),
        omml: translation.as_ref().map(|t| t.omml.clone()),
        equation: translation.map(|t| t.tree),
        image_ref,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{FallbackReason, FormulaCandidate, PageReport, Region, RegionKind};
    use crate::equation::Translator;
    use pretty_assertions::assert_eq;

    #[test]
    fn lists_formula_and_fallback_details() {
        let bbox = BBox::new(0.2, 0.2, 0.5, 0.3);
        let region = Region {
            page_index: 1,
            region_id: 3,
            bbox,
            kind: RegionKind::Formula,
            order_hint: 0,
            raw_content: String::new(),
            display: true,
        };
        let candidate = FormulaCandidate::recognized(&region, "x^2".into(), Some(0.4), 0.5);
        let model = DocumentModel {
            pages: vec![PageModel {
                page_index: 1,
                blocks: vec![
                    MergedBlock::Formula {
                        region_id: 3,
                        bbox,
                        display: true,
                        candidate,
                        equation: Some(Translator::default().parse("x^2")),
                    },
                    MergedBlock::FormulaFallback {
                        region_id: 4,
                        bbox,
                        reason: FallbackReason::Unmatched,
                        placeholder: "[formula not recognized: page 2, region 4, image none]".into(),
                        image_ref: None,
                        candidate: None,
                    },
                ],
                source_image_ref: None,
                report: PageReport::default(),
            }],
            failures: vec![],
        };

        let xref = CrossReference::from_model(&model);
        let entries = &xref.pages[&1];

        assert_eq!(entries[0].recognized_latex.as_deref(), Some("x^2"));
        assert_eq!(entries[0].canonical_latex.as_deref(), Some("x^{2}"));
        assert_eq!(entries[0].recognition_status, Some(RecognitionStatus::LowConfidence));
        assert!(entries[0].omml.as_deref().is_some_and(|o| o.contains("<m:sSup>")));
        assert_eq!(entries[1].kind, "formula_fallback");
        assert_eq!(entries[1].equation, None);
        assert_eq!(entries[1].region_ids, vec![4]);

        let json = serde_json::to_value(&xref).unwrap();
        assert!(json["pages"]["1"].is_array());
    }
}
