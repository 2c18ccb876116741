use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use image::{imageops, RgbImage};

use crate::core::geometry::BBox;

/// Pixels of context kept around a formula; recognizers do worse on tight crops.
const CROP_PADDING_PX: f32 = 2.0;

/// Cuts a normalized region out of the page raster. `None` when nothing of the
/// region lies on the image.
pub fn crop_region(page: &RgbImage, bbox: &BBox) -> Option<RgbImage> {
    let (img_width, img_height) = page.dimensions();
    if img_width == 0 || img_height == 0 || bbox.area() <= 0.0 {
        return None;
    }
    let px = bbox.to_pixels(img_width, img_height);

    let x0 = (px.x0 - CROP_PADDING_PX).max(0.0).floor() as u32;
    let y0 = (px.y0 - CROP_PADDING_PX).max(0.0).floor() as u32;
    let x1 = ((px.x1 + CROP_PADDING_PX).ceil().max(0.0) as u32).min(img_width);
    let y1 = ((px.y1 + CROP_PADDING_PX).ceil().max(0.0) as u32).min(img_height);

    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    Some(imageops::crop_imm(page, x0, y0, x1 - x0, y1 - y0).to_image())
}

/// Directory, under the output root, that formula crops are written to.
pub const CROP_DIR: &str = "formula_images";

/// Saves formula crops so reviewers can look at what the recognizer saw.
#[derive(Debug, Clone)]
pub struct CropStore {
    root: PathBuf,
}

impl CropStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn dir(&self) -> PathBuf {
        self.root.join(CROP_DIR)
    }

    /// Returns the saved crop's path relative to the output root.
    pub fn save(&self, crop: &RgbImage, page_index: usize, region_id: u32) -> Result<String> {
        let dir = self.dir();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create crop dir {}", dir.display()))?;
        let filename = format!("page_{:03}_formula_{:03}.png", page_index + 1, region_id);
        let path = dir.join(&filename);
        crop.save(&path)
            .with_context(|| format!("failed to save crop {}", path.display()))?;
        Ok(format!("{CROP_DIR}/{filename}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn crops_scaled_region_with_padding() {
        let page = RgbImage::from_pixel(200, 100, Rgb([255, 255, 255]));
        let crop = crop_region(&page, &BBox::new(0.25, 0.5, 0.5, 0.75)).unwrap();
        assert_eq!(crop.dimensions(), (54, 29));
    }

    #[test]
    fn clamps_to_image_bounds() {
        let page = RgbImage::new(100, 100);
        let crop = crop_region(&page, &BBox::new(0.9, 0.9, 1.0, 1.0)).unwrap();
        assert_eq!(crop.dimensions(), (12, 12));
    }

    #[test]
    fn region_off_the_page_has_no_crop() {
        let page = RgbImage::new(100, 100);
        assert!(crop_region(&page, &BBox::new(1.2, 1.2, 1.5, 1.5)).is_none());
        assert!(crop_region(&page, &BBox::new(0.5, 0.5, 0.5, 0.7)).is_none());
    }

    #[test]
    fn saves_crops_by_page_and_region() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = CropStore::new(dir.path().to_path_buf());
        let crop_ref = store.save(&RgbImage::new(4, 4), 0, 7)?;
        assert_eq!(crop_ref, "formula_images/page_001_formula_007.png");
        assert!(dir.path().join(&crop_ref).exists());
        Ok(())
    }
}
