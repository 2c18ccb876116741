pub mod crossref;
pub mod document;
pub mod report;

pub use crossref::{CrossRefEntry, CrossReference};
pub use document::{AssembledDocument, Paragraph, Run, Section};
pub use report::{RunReport, StageTiming};

use crate::core::model::DocumentModel;

/// Everything the exporters write, derived once from the document model.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub document: AssembledDocument,
    pub crossref: CrossReference,
    pub report: RunReport,
}

impl ConversionOutput {
    pub fn assemble(model: &DocumentModel, stages: Vec<StageTiming>) -> Self {
        Self {
            document: AssembledDocument::from_model(model),
            crossref: CrossReference::from_model(model),
            report: RunReport::from_model(model, stages),
        }
    }
}
