pub mod align;
pub mod dedup;
pub mod order;
pub mod resolve;

use log::{debug, warn};

use crate::core::config::ConversionConfig;
use crate::core::model::{FormulaCandidate, PageModel, Region, RegionKind};

pub trait Reconciler {
    fn reconcile(
        &self,
        page_index: usize,
        regions: &[Region],
        candidates: &[FormulaCandidate],
    ) -> PageModel;
}

#[derive(Debug, Clone)]
pub struct SimpleReconciler {
    iou_match_threshold: f32,
    dedup_iou_threshold: f32,
    row_tolerance: f32,
}

impl SimpleReconciler {
    pub fn new(config: &ConversionConfig) -> Self {
        Self {
            iou_match_threshold: config.iou_match_threshold,
            dedup_iou_threshold: config.dedup_iou_threshold,
            row_tolerance: config.row_tolerance,
        }
    }
}

impl Default for SimpleReconciler {
    fn default() -> Self {
        Self::new(&ConversionConfig::default())
    }
}

impl Reconciler for SimpleReconciler {
    fn reconcile(
        &self,
        page_index: usize,
        regions: &[Region],
        candidates: &[FormulaCandidate],
    ) -> PageModel {
        let texts = of_kind(regions, RegionKind::Text);
        let images = of_kind(regions, RegionKind::Image);
        let formulas = of_kind(regions, RegionKind::Formula);

        let groups = dedup::collapse_duplicates(&texts, self.dedup_iou_threshold);
        let duplicates_collapsed = texts.len() - groups.len();
        let alignment = align::align_formulas(&formulas, candidates, self.iou_match_threshold);

        for &idx in &alignment.orphan_candidates {
            let orphan = &candidates[idx];
            warn!(
                "page {page_index}: recognized formula from region {} matches no layout region",
                orphan.source_region_id
            );
        }

        let mut blocks = Vec::with_capacity(regions.len());
        blocks.extend(groups.iter().map(resolve::text_block));
        blocks.extend(images.iter().map(|r| resolve::image_block(r)));
        blocks.extend(
            formulas
                .iter()
                .map(|r| resolve::formula_block(r, &alignment, candidates)),
        );
        let blocks = order::reading_order(blocks, self.row_tolerance);

        let report = resolve::page_report(
            regions.len(),
            &blocks,
            duplicates_collapsed,
            alignment.orphan_candidates.len(),
        );
        debug!(
            "page {page_index}: {} regions -> {} blocks ({} fallback, {} duplicates collapsed)",
            report.regions, report.blocks, report.fallback_formulas, report.duplicates_collapsed
        );

        PageModel {
            page_index,
            blocks,
            source_image_ref: None,
            report,
        }
    }
}

fn of_kind(regions: &[Region], kind: RegionKind) -> Vec<&Region> {
    regions.iter().filter(|r| r.kind == kind).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::BBox;
    use crate::core::model::{MergedBlock, RecognitionStatus, RegionId};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn region(id: RegionId, kind: RegionKind, bbox: BBox, content: &str) -> Region {
        Region {
            page_index: 0,
            region_id: id,
            bbox,
            kind,
            order_hint: id as usize,
            raw_content: content.to_string(),
            display: true,
        }
    }

    fn recognized(region: &Region, latex: &str) -> FormulaCandidate {
        FormulaCandidate::recognized(region, latex.to_string(), Some(0.95), 0.5)
    }

    #[test]
    fn text_then_formula() {
        let regions = vec![
            region(0, RegionKind::Text, BBox::new(0.1, 0.05, 0.9, 0.08), "Section 1"),
            region(1, RegionKind::Formula, BBox::new(0.3, 0.1, 0.7, 0.15), ""),
        ];
        let candidates = vec![recognized(&regions[1], r"\frac{1}{2}")];

        let page = SimpleReconciler::default().reconcile(0, &regions, &candidates);

        assert_eq!(page.blocks.len(), 2);
        assert_eq!(page.blocks[0].text_content(), Some("Section 1"));
        assert_eq!(page.blocks[1].kind(), "formula");
        assert_eq!(page.report.recovered, 2);
    }

    #[test]
    fn overlapping_duplicates_collapse() {
        let regions = vec![
            region(0, RegionKind::Text, BBox::new(0.10, 0.10, 0.90, 0.20), "중복 문단"),
            region(1, RegionKind::Text, BBox::new(0.12, 0.10, 0.90, 0.20), "중복 문단"),
        ];
        let page = SimpleReconciler::default().reconcile(0, &regions, &[]);
        assert_eq!(page.blocks.len(), 1);
        assert_eq!(page.blocks[0].region_ids(), vec![0, 1]);
        assert_eq!(page.report.duplicates_collapsed, 1);
    }

    #[test]
    fn orphan_candidates_are_counted_not_emitted() {
        let formula = region(0, RegionKind::Formula, BBox::new(0.1, 0.1, 0.3, 0.2), "");
        let elsewhere = region(9, RegionKind::Formula, BBox::new(0.6, 0.6, 0.8, 0.7), "");
        let candidates = vec![recognized(&formula, "x"), recognized(&elsewhere, "y")];

        let page = SimpleReconciler::default().reconcile(0, &[formula], &candidates);

        assert_eq!(page.blocks.len(), 1);
        assert_eq!(page.report.orphan_candidates, 1);
    }

    #[test]
    fn empty_page_is_valid() {
        let page = SimpleReconciler::default().reconcile(3, &[], &[]);
        assert!(page.blocks.is_empty());
        assert_eq!(page.page_index, 3);
    }

    fn arb_region() -> impl Strategy<Value = (f32, f32, f32, f32, u8, bool)> {
        (0.0f32..0.8, 0.0f32..0.8, 0.01f32..0.2, 0.01f32..0.2, 0u8..3, any::<bool>())
    }

    fn build_regions(shapes: &[(f32, f32, f32, f32, u8, bool)]) -> Vec<Region> {
        shapes
            .iter()
            .enumerate()
            .map(|(idx, &(x, y, w, h, kind, _))| {
                let kind = match kind {
                    0 => RegionKind::Text,
                    1 => RegionKind::Image,
                    _ => RegionKind::Formula,
                };
                // Distinct content keeps dedup out of the coverage count.
                region(idx as RegionId, kind, BBox::new(x, y, x + w, y + h), &format!("t{idx}"))
            })
            .collect()
    }

    fn build_candidates(regions: &[Region], shapes: &[(f32, f32, f32, f32, u8, bool)]) -> Vec<FormulaCandidate> {
        regions
            .iter()
            .zip(shapes)
            .filter(|(r, _)| r.kind == RegionKind::Formula)
            .map(|(r, &(.., ok))| {
                if ok {
                    recognized(r, "x")
                } else {
                    FormulaCandidate::failed(r, "scripted")
                }
            })
            .collect()
    }

    proptest! {
        #[test]
        fn every_region_is_covered_once(shapes in prop::collection::vec(arb_region(), 0..24)) {
            let regions = build_regions(&shapes);
            let candidates = build_candidates(&regions, &shapes);
            let page = SimpleReconciler::default().reconcile(0, &regions, &candidates);

            let mut covered: Vec<RegionId> =
                page.blocks.iter().flat_map(MergedBlock::region_ids).collect();
            covered.sort_unstable();
            let expected: Vec<RegionId> = (0..regions.len() as RegionId).collect();
            prop_assert_eq!(covered, expected);

            let failed = candidates
                .iter()
                .filter(|c| c.recognition_status == RecognitionStatus::Failed)
                .count();
            prop_assert!(page.report.fallback_formulas >= failed);
        }

        #[test]
        fn order_ignores_input_order(shapes in prop::collection::vec(arb_region(), 0..16), seed in any::<u64>()) {
            let regions = build_regions(&shapes);
            let candidates = build_candidates(&regions, &shapes);
            let mut shuffled = regions.clone();
            let len = shuffled.len();
            if len > 1 {
                shuffled.rotate_left((seed as usize) % len);
                shuffled.reverse();
            }
            let reconciler = SimpleReconciler::default();
            let a = reconciler.reconcile(0, &regions, &candidates);
            let b = reconciler.reconcile(0, &shuffled, &candidates);
            prop_assert_eq!(a.blocks, b.blocks);
        }

        #[test]
        fn rows_read_top_to_bottom(shapes in prop::collection::vec(arb_region(), 0..16)) {
            let regions = build_regions(&shapes);
            let page = SimpleReconciler::default().reconcile(0, &regions, &[]);
            let ids: BTreeSet<RegionId> = page.blocks.iter().flat_map(MergedBlock::region_ids).collect();
            prop_assert_eq!(ids.len(), regions.len());
            for pair in page.blocks.windows(2) {
                let (a, b) = (pair[0].bbox(), pair[1].bbox());
                // Either a new row, which starts no higher, or two blocks of one row.
                let same_row = (a.center().1 - b.center().1).abs() <= 0.02 + 1e-6;
                prop_assert!(b.y0 >= a.y0 || same_row);
            }
        }
    }
}
