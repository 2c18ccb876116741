use std::path::PathBuf;

use crate::assemble::ConversionOutput;
use crate::core::error::AssemblyError;
use crate::export::{ensure_dir, write_json, Exporter};

#[derive(Debug, Clone)]
pub struct CrossRefExporter {
    out_dir: PathBuf,
}

impl CrossRefExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }
}

impl Exporter for CrossRefExporter {
    fn export(&self, output: &ConversionOutput) -> Result<(), AssemblyError> {
        ensure_dir(&self.out_dir)?;
        write_json(&self.out_dir.join("crossref.json"), &output.crossref, "cross-reference")
    }
}
