use serde::{Deserialize, Serialize};

use crate::core::geometry::BBox;
use crate::core::model::{
    DocumentModel, MergedBlock, PageFailure, PageModel, PageReport, RecognitionStatus,
};
use crate::equation::{EquationNode, Translation};

/// The final document: one section per page, paragraphs of runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssembledDocument {
    pub sections: Vec<Section>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<PageFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub page_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_image_ref: Option<String>,
    pub paragraphs: Vec<Paragraph>,
    pub report: PageReport,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Paragraph {
    pub runs: Vec<Run>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Run {
    Text {
        block: usize,
        text: String,
    },
    Equation {
        block: usize,
        display: bool,
        status: RecognitionStatus,
        recognized_latex: String,
        canonical_latex: String,
        omml: String,
        tree: EquationNode,
    },
    Image {
        block: usize,
        image_ref: String,
    },
    /// Marked stand-in for a formula that could not be recovered.
    Placeholder {
        block: usize,
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        image_ref: Option<String>,
    },
}

impl Run {
    pub fn block(&self) -> usize {
        match self {
            Run::Text { block, .. }
            | Run::Equation { block, .. }
            | Run::Image { block, .. }
            | Run::Placeholder { block, .. } => *block,
        }
    }

    /// Runs that stay inside a line of prose.
    fn is_inline(&self) -> bool {
        match self {
            Run::Text { .. } => true,
            Run::Equation { display, .. } => !display,
            Run::Image { .. } | Run::Placeholder { .. } => false,
        }
    }

    fn is_inline_equation(&self) -> bool {
        matches!(self, Run::Equation { display: false, .. })
    }
}

impl AssembledDocument {
    pub fn from_model(model: &DocumentModel) -> Self {
        Self {
            sections: model.pages.iter().map(assemble_page).collect(),
            failures: model.failures.clone(),
        }
    }

    pub fn equation_count(&self) -> usize {
        self.runs()
            .filter(|run| matches!(run, Run::Equation { .. }))
            .count()
    }

    pub fn runs(&self) -> impl Iterator<Item = &Run> {
        self.sections
            .iter()
            .flat_map(|s| s.paragraphs.iter())
            .flat_map(|p| p.runs.iter())
    }
}

/// One run per block; an inline equation shares a paragraph with the text on
/// its line.
pub fn assemble_page(page: &PageModel) -> Section {
    let mut paragraphs: Vec<Paragraph> = Vec::new();
    let mut last_bbox: Option<BBox> = None;

    for (idx, block) in page.blocks.iter().enumerate() {
        let run = block_run(idx, block);
        let bbox = block.bbox();

        let joins = match (paragraphs.last().and_then(|p| p.runs.last()), last_bbox) {
            (Some(prev), Some(prev_bbox)) => {
                prev.is_inline()
                    && run.is_inline()
                    && (prev.is_inline_equation() || run.is_inline_equation())
                    && same_line(&prev_bbox, &bbox)
            }
            _ => false,
        };

        match paragraphs.last_mut() {
            Some(paragraph) if joins => paragraph.runs.push(run),
            _ => paragraphs.push(Paragraph { runs: vec![run] }),
        }
        last_bbox = Some(bbox);
    }

    Section {
        page_index: page.page_index,
        source_image_ref: page.source_image_ref.clone(),
        paragraphs,
        report: page.report.clone(),
    }
}

fn block_run(idx: usize, block: &MergedBlock) -> Run {
    match block {
        MergedBlock::Text { content, .. } => Run::Text {
            block: idx,
            text: content.clone(),
        },
        MergedBlock::Image { image_ref, .. } => Run::Image {
            block: idx,
            image_ref: image_ref.clone(),
        },
        MergedBlock::Formula {
            display,
            candidate,
            equation,
            ..
        } => {
            let recognized_latex = candidate.recognized_latex.clone().unwrap_or_default();
            let tree = equation
                .clone()
                .unwrap_or_else(|| EquationNode::unsupported(recognized_latex.clone()));
            let translation = Translation::from_tree(tree, *display);
            Run::Equation {
                block: idx,
                display: *display,
                status: candidate.recognition_status,
                recognized_latex,
                canonical_latex: translation.canonical_latex,
                omml: translation.omml,
                tree: translation.tree,
            }
        }
        MergedBlock::FormulaFallback {
            placeholder,
            image_ref,
            ..
        } => Run::Placeholder {
            block: idx,
            text: placeholder.clone(),
            image_ref: image_ref.clone(),
        },
    }
}

/// Vertical overlap of at least half the shorter box.
fn same_line(a: &BBox, b: &BBox) -> bool {
    let overlap = a.y1.min(b.y1) - a.y0.max(b.y0);
    let shorter = a.height().min(b.height());
    shorter > 0.0 && overlap >= shorter * 0.5
}
