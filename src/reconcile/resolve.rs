use crate::core::model::{
    FallbackReason, FormulaCandidate, MergedBlock, PageReport, RecognitionStatus, Region,
};
use crate::reconcile::align::FormulaAlignment;
use crate::reconcile::dedup::TextGroup;

pub fn text_block(group: &TextGroup<'_>) -> MergedBlock {
    MergedBlock::Text {
        region_ids: group.region_ids(),
        bbox: group.bbox(),
        content: group.keeper().raw_content.clone(),
    }
}

pub fn image_block(region: &Region) -> MergedBlock {
    MergedBlock::Image {
        region_id: region.region_id,
        bbox: region.bbox,
        image_ref: region.raw_content.clone(),
    }
}

/// Formula block when a usable candidate matched, fallback otherwise.
pub fn formula_block(
    region: &Region,
    alignment: &FormulaAlignment,
    candidates: &[FormulaCandidate],
) -> MergedBlock {
    let candidate = alignment
        .candidate_for(region.region_id)
        .map(|idx| &candidates[idx]);

    match candidate {
        Some(candidate) if !candidate.is_failed() => MergedBlock::Formula {
            region_id: region.region_id,
            bbox: region.bbox,
            display: region.display,
            candidate: candidate.clone(),
            equation: None,
        },
        Some(candidate) => fallback_block(region, FallbackReason::RecognitionFailed, Some(candidate)),
        None => fallback_block(region, FallbackReason::Unmatched, None),
    }
}

fn fallback_block(
    region: &Region,
    reason: FallbackReason,
    candidate: Option<&FormulaCandidate>,
) -> MergedBlock {
    let image_ref = candidate
        .and_then(|c| c.crop_ref.clone())
        .or_else(|| (!region.raw_content.is_empty()).then(|| region.raw_content.clone()));
    MergedBlock::FormulaFallback {
        region_id: region.region_id,
        bbox: region.bbox,
        reason,
        placeholder: placeholder_text(region, image_ref.as_deref()),
        image_ref,
        candidate: candidate.cloned(),
    }
}

/// Marker text a reviewer can search for in the output document.
pub fn placeholder_text(region: &Region, image_ref: Option<&str>) -> String {
    format!(
        "[formula not recognized: page {}, region {}, image {}]",
        region.page_index + 1,
        region.region_id,
        image_ref.unwrap_or("none")
    )
}

/// Counts for one page, before translation adds unsupported fragments.
pub fn page_report(
    regions: usize,
    blocks: &[MergedBlock],
    duplicates_collapsed: usize,
    orphan_candidates: usize,
) -> PageReport {
    let mut report = PageReport {
        regions,
        blocks: blocks.len(),
        duplicates_collapsed,
        orphan_candidates,
        ..PageReport::default()
    };
    for block in blocks {
        match block {
            MergedBlock::Formula { candidate, .. }
                if candidate.recognition_status == RecognitionStatus::LowConfidence =>
            {
                report.low_confidence += 1;
            }
            MergedBlock::FormulaFallback { .. } => report.fallback_formulas += 1,
            _ => report.recovered += 1,
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::BBox;
    use crate::core::model::RegionKind;
    use crate::reconcile::align::FormulaMatch;
    use pretty_assertions::assert_eq;

    fn formula_region() -> Region {
        Region {
            page_index: 0,
            region_id: 4,
            bbox: BBox::new(0.2, 0.2, 0.6, 0.3),
            kind: RegionKind::Formula,
            order_hint: 4,
            raw_content: "images/eq_4.jpg".into(),
            display: true,
        }
    }

    #[test]
    fn failed_candidate_becomes_fallback_with_crop() {
        let region = formula_region();
        let failed = FormulaCandidate::failed(&region, "timeout")
            .with_crop_ref(Some("formula_images/page_001_formula_004.png".into()));
        let alignment = FormulaAlignment {
            matched: vec![FormulaMatch {
                region_id: 4,
                candidate: 0,
                iou: 1.0,
            }],
            ..FormulaAlignment::default()
        };

        let block = formula_block(&region, &alignment, &[failed]);

        match block {
            MergedBlock::FormulaFallback {
                reason,
                placeholder,
                image_ref,
                ..
            } => {
                assert_eq!(reason, FallbackReason::RecognitionFailed);
                assert_eq!(
                    placeholder,
                    "[formula not recognized: page 1, region 4, image formula_images/page_001_formula_004.png]"
                );
                assert_eq!(image_ref.as_deref(), Some("formula_images/page_001_formula_004.png"));
            }
            other => panic!("expected fallback, got {other:?}"),
        }
    }

    #[test]
    fn unmatched_region_points_at_layout_image() {
        let region = formula_region();
        let block = formula_block(&region, &FormulaAlignment::default(), &[]);
        assert_eq!(
            block.text_content(),
            Some("[formula not recognized: page 1, region 4, image images/eq_4.jpg]")
        );
    }
}
