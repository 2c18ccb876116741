use std::path::PathBuf;

use crate::assemble::ConversionOutput;
use crate::core::error::AssemblyError;
use crate::export::{ensure_dir, write_json, Exporter};

/// `document.json` with the assembled document and `report.json` with the run report.
#[derive(Debug, Clone)]
pub struct JsonExporter {
    out_dir: PathBuf,
}

impl JsonExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }
}

impl Exporter for JsonExporter {
    fn export(&self, output: &ConversionOutput) -> Result<(), AssemblyError> {
        ensure_dir(&self.out_dir)?;
        write_json(&self.out_dir.join("document.json"), &output.document, "document")?;
        write_json(&self.out_dir.join("report.json"), &output.report, "report")?;
        Ok(())
    }
}
