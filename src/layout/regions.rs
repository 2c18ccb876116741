use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;

use crate::core::error::MalformedLayoutError;
use crate::core::geometry::BBox;
use crate::core::model::{Region, RegionId, RegionKind};
use crate::layout::labels::classify;
use crate::layout::{LayoutPage, LayoutRegion};

/// Validates one page of detector output and turns it into normalized regions.
///
/// Any bad region rejects the whole page: a page with one impossible box cannot
/// be ordered or matched reliably.
pub fn page_regions(page: &LayoutPage) -> Result<Vec<Region>, MalformedLayoutError> {
    let page_index = page.page_index;
    let scale = page_scale(page)?;
    let raw_regions = decode_regions(page)?;
    let mut seen: HashSet<RegionId> = HashSet::with_capacity(raw_regions.len());
    let mut regions = Vec::with_capacity(raw_regions.len());

    for (position, raw) in raw_regions.iter().enumerate() {
        let region_id = raw.id.unwrap_or(position as RegionId);

        if let Some(other) = raw.page_index.filter(|&p| p != page_index) {
            return Err(MalformedLayoutError::for_region(
                page_index,
                region_id,
                format!("region {region_id} belongs to page {other}"),
            ));
        }
        if !seen.insert(region_id) {
            return Err(MalformedLayoutError::for_region(
                page_index,
                region_id,
                format!("duplicate region id {region_id}"),
            ));
        }

        let bbox = region_bbox(raw, scale)
            .map_err(|reason| MalformedLayoutError::for_region(page_index, region_id, reason))?;
        if let Some(problem) = bbox.geometry_problem() {
            return Err(MalformedLayoutError::for_region(
                page_index,
                region_id,
                format!("region {region_id}: {problem}"),
            ));
        }

        let (kind, display) = classify(raw.label.as_deref(), raw.text.is_some());
        regions.push(Region {
            page_index,
            region_id,
            bbox,
            kind,
            order_hint: position,
            raw_content: raw_content(raw, kind),
            display,
        });
    }

    Ok(regions)
}

/// Decodes the page's region list, blaming the first region that does not fit
/// the expected shape.
pub fn decode_regions(page: &LayoutPage) -> Result<Vec<LayoutRegion>, MalformedLayoutError> {
    let items = match &page.regions {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        _ => {
            return Err(MalformedLayoutError::new(
                page.page_index,
                "regions must be an array",
            ))
        }
    };
    items
        .iter()
        .enumerate()
        .map(|(position, item)| {
            LayoutRegion::deserialize(item).map_err(|err| {
                let region_id = item
                    .get("id")
                    .and_then(Value::as_u64)
                    .and_then(|id| RegionId::try_from(id).ok())
                    .unwrap_or(position as RegionId);
                MalformedLayoutError::for_region(
                    page.page_index,
                    region_id,
                    format!("region {region_id}: {err}"),
                )
            })
        })
        .collect()
}

fn page_scale(page: &LayoutPage) -> Result<Option<(f32, f32)>, MalformedLayoutError> {
    match (page.width, page.height) {
        (Some(w), Some(h)) if w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0 => {
            Ok(Some((w, h)))
        }
        (None, None) => Ok(None),
        (w, h) => Err(MalformedLayoutError::new(
            page.page_index,
            format!("unusable page size {w:?} x {h:?}"),
        )),
    }
}

fn region_bbox(raw: &LayoutRegion, scale: Option<(f32, f32)>) -> Result<BBox, String> {
    let coords: [f32; 4] = raw
        .bbox
        .as_slice()
        .try_into()
        .map_err(|_| format!("bbox has {} coordinates, expected 4", raw.bbox.len()))?;
    let bbox = BBox::from_array(coords);
    Ok(match scale {
        Some((w, h)) => bbox.normalized(w, h),
        None => bbox,
    })
}

fn raw_content(raw: &LayoutRegion, kind: RegionKind) -> String {
    match kind {
        RegionKind::Text => raw.text.clone().unwrap_or_default(),
        RegionKind::Image | RegionKind::Formula => raw.img_path.clone().unwrap_or_default(),
    }
}
