use crate::core::model::MergedBlock;

/// Sorts blocks into reading order: rows top to bottom, then left to right.
///
/// Rows come from a sweep over block tops; a block joins the open row while its
/// vertical center stays within `row_tolerance` of the center of the block that
/// opened the row. The final key `(row, x0, region id)` does not depend on the
/// order blocks arrive in.
pub fn reading_order(mut blocks: Vec<MergedBlock>, row_tolerance: f32) -> Vec<MergedBlock> {
    blocks.sort_by(|a, b| {
        let (ba, bb) = (a.bbox(), b.bbox());
        ba.y0
            .total_cmp(&bb.y0)
            .then_with(|| ba.x0.total_cmp(&bb.x0))
            .then_with(|| a.primary_region_id().cmp(&b.primary_region_id()))
    });

    let mut rows = Vec::with_capacity(blocks.len());
    let mut row = 0usize;
    let mut anchor: Option<f32> = None;
    for block in &blocks {
        let (_, center_y) = block.bbox().center();
        match anchor {
            Some(a) if (center_y - a).abs() <= row_tolerance => {}
            Some(_) => {
                row += 1;
                anchor = Some(center_y);
            }
            None => anchor = Some(center_y),
        }
        rows.push(row);
    }

    let mut keyed: Vec<(usize, MergedBlock)> = rows.into_iter().zip(blocks).collect();
    keyed.sort_by(|(ra, a), (rb, b)| {
        ra.cmp(rb)
            .then_with(|| a.bbox().x0.total_cmp(&b.bbox().x0))
            .then_with(|| a.primary_region_id().cmp(&b.primary_region_id()))
    });
    keyed.into_iter().map(|(_, block)| block).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::BBox;
    use pretty_assertions::assert_eq;

    fn block(id: u32, x0: f32, y0: f32, y1: f32) -> MergedBlock {
        MergedBlock::Text {
            region_ids: vec![id],
            bbox: BBox::new(x0, y0, x0 + 0.1, y1),
            content: id.to_string(),
        }
    }

    fn ids(blocks: &[MergedBlock]) -> Vec<u32> {
        blocks.iter().map(MergedBlock::primary_region_id).collect()
    }

    #[test]
    fn same_line_reads_left_to_right() {
        // The inline formula sits slightly higher than the text around it.
        let blocks = vec![
            block(1, 0.5, 0.100, 0.120),
            block(2, 0.1, 0.102, 0.120),
            block(3, 0.1, 0.200, 0.220),
        ];
        assert_eq!(ids(&reading_order(blocks, 0.01)), vec![2, 1, 3]);
    }

    #[test]
    fn rows_split_beyond_tolerance() {
        let blocks = vec![block(1, 0.5, 0.10, 0.12), block(2, 0.1, 0.14, 0.16)];
        assert_eq!(ids(&reading_order(blocks, 0.01)), vec![1, 2]);
    }

    #[test]
    fn identical_boxes_fall_back_to_region_id() {
        let blocks = vec![block(7, 0.1, 0.1, 0.2), block(3, 0.1, 0.1, 0.2)];
        assert_eq!(ids(&reading_order(blocks, 0.01)), vec![3, 7]);
    }
}
