//! WordprocessingML body (`document.xml`) with native OMML equations.

use std::path::PathBuf;

use quick_xml::escape::escape;

use crate::assemble::{AssembledDocument, ConversionOutput, Paragraph, Run};
use crate::core::error::AssemblyError;
use crate::export::{ensure_dir, write_atomic, Exporter};

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const M_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/math";

/// Placeholders are set in red so they stand out during review.
const PLACEHOLDER_COLOR: &str = "C00000";

#[derive(Debug, Clone)]
pub struct WordExporter {
    out_dir: PathBuf,
}

impl WordExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }
}

impl Exporter for WordExporter {
    fn export(&self, output: &ConversionOutput) -> Result<(), AssemblyError> {
        ensure_dir(&self.out_dir)?;
        let xml = render_document(&output.document);
        write_atomic(&self.out_dir.join("document.xml"), xml.as_bytes())
    }
}

pub fn render_document(document: &AssembledDocument) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
    out.push_str(&format!(
        "<w:document xmlns:w=\"{W_NS}\" xmlns:m=\"{M_NS}\"><w:body>\n"
    ));

    for (idx, section) in document.sections.iter().enumerate() {
        if idx > 0 {
            out.push_str("<w:p><w:r><w:br w:type=\"page\"/></w:r></w:p>\n");
        }
        for paragraph in &section.paragraphs {
            render_paragraph(paragraph, &mut out);
        }
    }

    out.push_str("</w:body></w:document>\n");
    out
}

fn render_paragraph(paragraph: &Paragraph, out: &mut String) {
    out.push_str("<w:p>");
    for run in &paragraph.runs {
        match run {
            Run::Text { text, .. } => text_run(text, None, out),
            Run::Equation { omml, .. } => out.push_str(omml),
            Run::Image { image_ref, .. } => text_run(&format!("[image: {image_ref}]"), None, out),
            Run::Placeholder { text, .. } => text_run(text, Some(PLACEHOLDER_COLOR), out),
        }
    }
    out.push_str("</w:p>\n");
}

/// Line breaks inside a text region become `<w:br/>` so the text stays verbatim.
fn text_run(text: &str, color: Option<&str>, out: &mut String) {
    out.push_str("<w:r>");
    if let Some(color) = color {
        out.push_str(&format!("<w:rPr><w:color w:val=\"{color}\"/></w:rPr>"));
    }
    for (idx, line) in text.split('\n').enumerate() {
        if idx > 0 {
            out.push_str("<w:br/>");
        }
        out.push_str("<w:t xml:space=\"preserve\">");
        out.push_str(&escape(line));
        out.push_str("</w:t>");
    }
    out.push_str("</w:r>");
}
