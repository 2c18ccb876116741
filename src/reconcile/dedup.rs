use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use unicode_normalization::UnicodeNormalization;

use crate::core::geometry::BBox;
use crate::core::model::Region;

/// Hash of NFC-normalized, trimmed text. Composed and decomposed Hangul hash alike.
pub fn content_hash(text: &str) -> u64 {
    let normalized: String = text.trim().nfc().collect();
    let mut hasher = DefaultHasher::new();
    normalized.hash(&mut hasher);
    hasher.finish()
}

/// Text regions that turned out to be one detection.
#[derive(Debug, Clone)]
pub struct TextGroup<'r> {
    /// First member is the region whose text is kept.
    pub members: Vec<&'r Region>,
    hash: u64,
}

impl TextGroup<'_> {
    pub fn keeper(&self) -> &Region {
        self.members[0]
    }

    pub fn bbox(&self) -> BBox {
        self.members
            .iter()
            .skip(1)
            .fold(self.keeper().bbox, |acc, region| acc.union(&region.bbox))
    }

    pub fn region_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.members.iter().map(|r| r.region_id).collect();
        ids.sort_unstable();
        ids
    }
}

/// Collapses text regions that overlap heavily and say the same thing.
///
/// Regions are visited in detector order; each one joins the first earlier group
/// whose keeper it overlaps by at least `threshold` with an equal content hash.
pub fn collapse_duplicates<'r>(texts: &[&'r Region], threshold: f32) -> Vec<TextGroup<'r>> {
    let mut ordered: Vec<&Region> = texts.to_vec();
    ordered.sort_by_key(|r| (r.order_hint, r.region_id));

    let mut groups: Vec<TextGroup<'r>> = Vec::new();
    for region in ordered {
        let hash = content_hash(&region.raw_content);
        let existing = groups.iter_mut().find(|group| {
            group.hash == hash && group.keeper().bbox.iou(&region.bbox) >= threshold
        });
        match existing {
            Some(group) => group.members.push(region),
            None => groups.push(TextGroup {
                members: vec![region],
                hash,
            }),
        }
    }
    groups
}
