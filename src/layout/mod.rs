pub mod labels;
pub mod regions;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Output of the upstream layout detector for a whole document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayoutDocument {
    pub pages: Vec<LayoutPage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutPage {
    pub page_index: usize,
    /// Pixel size of the page the boxes were detected on. When absent the boxes
    /// are already page-normalized.
    #[serde(default)]
    pub width: Option<f32>,
    #[serde(default)]
    pub height: Option<f32>,
    /// Page raster, relative to the images directory.
    #[serde(default)]
    pub image: Option<String>,
    /// Kept undecoded so that one bad region only fails its own page; see
    /// [`regions::decode_regions`].
    #[serde(default)]
    pub regions: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutRegion {
    #[serde(default)]
    pub id: Option<u32>,
    pub bbox: Vec<f32>,
    #[serde(default, rename = "type", alias = "label")]
    pub label: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub img_path: Option<String>,
    #[serde(default)]
    pub score: Option<f32>,
    #[serde(default, alias = "page_idx")]
    pub page_index: Option<usize>,
}

impl LayoutDocument {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read layout file {}", path.display()))?;
        let mut document: LayoutDocument = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse layout JSON {}", path.display()))?;

        let mut seen = BTreeSet::new();
        for page in &document.pages {
            if !seen.insert(page.page_index) {
                anyhow::bail!(
                    "layout file {} lists page {} twice",
                    path.display(),
                    page.page_index
                );
            }
        }
        document.pages.sort_by_key(|page| page.page_index);
        Ok(document)
    }

    pub fn region_count(&self) -> usize {
        self.pages
            .iter()
            .map(|page| page.regions.as_array().map_or(0, Vec::len))
            .sum()
    }
}

impl LayoutPage {
    /// Where the raster for this page lives: the `image` entry, or `page_NNN.png`
    /// numbered from one.
    pub fn image_path(&self, images_dir: &Path) -> PathBuf {
        match &self.image {
            Some(image) => images_dir.join(image),
            None => images_dir.join(format!("page_{:03}.png", self.page_index + 1)),
        }
    }
}
