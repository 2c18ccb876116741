use std::cmp::Ordering;

use crate::core::model::{FormulaCandidate, Region, RegionId};

#[derive(Debug, Clone, PartialEq)]
pub struct FormulaMatch {
    pub region_id: RegionId,
    pub candidate: usize,
    pub iou: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormulaAlignment {
    pub matched: Vec<FormulaMatch>,
    /// Formula regions no candidate overlapped enough.
    pub unmatched_regions: Vec<RegionId>,
    /// Candidate indices that matched no region.
    pub orphan_candidates: Vec<usize>,
}

impl FormulaAlignment {
    pub fn candidate_for(&self, region_id: RegionId) -> Option<usize> {
        self.matched
            .iter()
            .find(|m| m.region_id == region_id)
            .map(|m| m.candidate)
    }
}

/// One-to-one greedy assignment of candidates to formula regions.
///
/// Every pair at or above `threshold` is ranked by IoU, then candidate confidence,
/// then candidate source id, then region id; pairs are taken best first while
/// both sides are still free.
pub fn align_formulas(
    regions: &[&Region],
    candidates: &[FormulaCandidate],
    threshold: f32,
) -> FormulaAlignment {
    let mut pairs = Vec::new();
    for region in regions {
        for (idx, candidate) in candidates.iter().enumerate() {
            let iou = region.bbox.iou(&candidate.bbox);
            if iou >= threshold && iou > 0.0 {
                pairs.push(FormulaMatch {
                    region_id: region.region_id,
                    candidate: idx,
                    iou,
                });
            }
        }
    }

    pairs.sort_by(|a, b| rank_pairs(a, b, candidates));

    let mut region_taken: Vec<RegionId> = Vec::new();
    let mut candidate_taken = vec![false; candidates.len()];
    let mut matched = Vec::new();

    for pair in pairs {
        if candidate_taken[pair.candidate] || region_taken.contains(&pair.region_id) {
            continue;
        }
        candidate_taken[pair.candidate] = true;
        region_taken.push(pair.region_id);
        matched.push(pair);
    }

    let unmatched_regions = regions
        .iter()
        .map(|region| region.region_id)
        .filter(|id| !region_taken.contains(id))
        .collect();
    let orphan_candidates = candidate_taken
        .iter()
        .enumerate()
        .filter(|(_, taken)| !**taken)
        .map(|(idx, _)| idx)
        .collect();

    FormulaAlignment {
        matched,
        unmatched_regions,
        orphan_candidates,
    }
}

fn rank_pairs(a: &FormulaMatch, b: &FormulaMatch, candidates: &[FormulaCandidate]) -> Ordering {
    let ca = &candidates[a.candidate];
    let cb = &candidates[b.candidate];
    b.iou
        .total_cmp(&a.iou)
        .then_with(|| cb.rank_confidence().total_cmp(&ca.rank_confidence()))
        .then_with(|| ca.source_region_id.cmp(&cb.source_region_id))
        .then_with(|| a.region_id.cmp(&b.region_id))
        .then_with(|| a.candidate.cmp(&b.candidate))
}
