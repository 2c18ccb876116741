pub mod bridge;
pub mod coordinator;
pub mod crop;
pub mod gate;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::core::error::RecognitionError;

pub use bridge::CommandRecognizer;
pub use coordinator::RecognitionCoordinator;
pub use gate::RecognitionGate;

/// One recognizer answer, in the same position as the crop it answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recognition {
    #[serde(default)]
    pub latex: String,
    #[serde(default)]
    pub confidence: Option<f32>,
}

impl Recognition {
    pub fn new(latex: impl Into<String>, confidence: Option<f32>) -> Self {
        Self {
            latex: latex.into(),
            confidence,
        }
    }
}

/// Image-to-LaTeX service. Implementations are shared across page workers.
pub trait FormulaRecognizer: Send + Sync {
    fn recognize(&self, crops: &[RgbImage]) -> Result<Vec<Recognition>, RecognitionError>;
}
