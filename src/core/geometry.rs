use serde::{Deserialize, Serialize};

/// Slack allowed outside the unit square before a normalized box is rejected.
pub const NORMALIZED_EPSILON: f32 = 0.01;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn from_array(coords: [f32; 4]) -> Self {
        Self::new(coords[0], coords[1], coords[2], coords[3])
    }

    pub fn width(&self) -> f32 {
        (self.x1 - self.x0).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y1 - self.y0).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.x0 + self.x1) * 0.5, (self.y0 + self.y1) * 0.5)
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    pub fn iou(&self, other: &Self) -> f32 {
        let x0 = self.x0.max(other.x0);
        let y0 = self.y0.max(other.y0);
        let x1 = self.x1.min(other.x1);
        let y1 = self.y1.min(other.y1);

        let inter = BBox::new(x0, y0, x1, y1);
        let inter_area = inter.area();
        let union = self.area() + other.area() - inter_area;
        if union <= 0.0 {
            0.0
        } else {
            inter_area / union
        }
    }

    /// Scales a pixel-space box into page-normalized coordinates.
    pub fn normalized(&self, page_width: f32, page_height: f32) -> Self {
        Self {
            x0: self.x0 / page_width,
            y0: self.y0 / page_height,
            x1: self.x1 / page_width,
            y1: self.y1 / page_height,
        }
    }

    /// Scales a normalized box into the pixel space of an image.
    pub fn to_pixels(&self, width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        Self {
            x0: self.x0 * w,
            y0: self.y0 * h,
            x1: self.x1 * w,
            y1: self.y1 * h,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x0.is_finite() && self.y0.is_finite() && self.x1.is_finite() && self.y1.is_finite()
    }

    /// Returns a description of what is wrong with a normalized box, if anything.
    pub fn geometry_problem(&self) -> Option<String> {
        if !self.is_finite() {
            return Some("non-finite coordinate".to_string());
        }
        if self.x1 < self.x0 || self.y1 < self.y0 {
            return Some(format!(
                "inverted box ({:.3}, {:.3}, {:.3}, {:.3})",
                self.x0, self.y0, self.x1, self.y1
            ));
        }
        let lo = -NORMALIZED_EPSILON;
        let hi = 1.0 + NORMALIZED_EPSILON;
        let inside = |v: f32| (lo..=hi).contains(&v);
        if !(inside(self.x0) && inside(self.y0) && inside(self.x1) && inside(self.y1)) {
            return Some(format!(
                "box outside the page ({:.3}, {:.3}, {:.3}, {:.3})",
                self.x0, self.y0, self.x1, self.y1
            ));
        }
        None
    }
}
