use std::path::PathBuf;

use crate::assemble::{ConversionOutput, Paragraph, Run, Section};
use crate::core::error::AssemblyError;
use crate::equation::latex::to_marked_latex;
use crate::export::{ensure_dir, write_atomic, Exporter};

/// `document.md` for the whole run plus one `page_NNN.md` per page.
#[derive(Debug, Clone)]
pub struct MarkdownExporter {
    out_dir: PathBuf,
}

impl MarkdownExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }

    fn format_paragraph(paragraph: &Paragraph) -> String {
        let inline = paragraph.runs.len() > 1;
        paragraph
            .runs
            .iter()
            .map(|run| Self::format_run(run, inline))
            .collect::<Vec<_>>()
            .join(if inline { " " } else { "" })
    }

    fn format_run(run: &Run, inline: bool) -> String {
        match run {
            Run::Text { text, .. } => text.clone(),
            Run::Equation { tree, display, .. } => {
                let latex = to_marked_latex(tree);
                if *display && !inline {
                    format!("$$\n{latex}\n$$")
                } else {
                    format!("${latex}$")
                }
            }
            Run::Image { image_ref, .. } => format!("![image]({image_ref})"),
            Run::Placeholder {
                text, image_ref, ..
            } => match image_ref {
                Some(image_ref) => format!("> **{text}**\n>\n> ![formula]({image_ref})"),
                None => format!("> **{text}**"),
            },
        }
    }

    fn format_section(section: &Section, heading: &str) -> String {
        let mut markdown = format!("{heading} Page {}\n\n", section.page_index + 1);
        for paragraph in &section.paragraphs {
            let text = Self::format_paragraph(paragraph);
            if !text.is_empty() {
                markdown.push_str(&text);
                markdown.push_str("\n\n");
            }
        }
        markdown
    }
}

impl Exporter for MarkdownExporter {
    fn export(&self, output: &ConversionOutput) -> Result<(), AssemblyError> {
        ensure_dir(&self.out_dir)?;
        let document = &output.document;

        let mut markdown = String::from("# Document\n\n");
        for section in &document.sections {
            markdown.push_str("---\n\n");
            markdown.push_str(&Self::format_section(section, "##"));
        }
        if !document.failures.is_empty() {
            markdown.push_str("---\n\n## Pages not converted\n\n");
            for failure in &document.failures {
                markdown.push_str(&format!(
                    "- page {}: {}\n",
                    failure.page_index + 1,
                    failure.error
                ));
            }
        }
        write_atomic(&self.out_dir.join("document.md"), markdown.as_bytes())?;

        for section in &document.sections {
            let page_markdown = Self::format_section(section, "#");
            let path = self
                .out_dir
                .join(format!("page_{:03}.md", section.page_index + 1));
            write_atomic(&path, page_markdown.as_bytes())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{PageReport, RecognitionStatus};
    use crate::equation::{EquationNode, Translator};
    use pretty_assertions::assert_eq;

    fn equation(display: bool) -> Run {
        Run::Equation {
            block: 1,
            display,
            status: RecognitionStatus::Ok,
            recognized_latex: "x^2".into(),
            canonical_latex: "x^{2}".into(),
            omml: String::new(),
            tree: EquationNode::super_sub(
                EquationNode::literal("x"),
                Some(EquationNode::literal("2")),
                None,
            ),
        }
    }

    #[test]
    fn display_equations_get_their_own_block() {
        let paragraph = Paragraph {
            runs: vec![equation(true)],
        };
        assert_eq!(MarkdownExporter::format_paragraph(&paragraph), "$$\nx^{2}\n$$");
    }

    #[test]
    fn unsupported_fragments_are_marked() {
        let tree = Translator::default().parse(r"a + \sqrt{b}");
        let paragraph = Paragraph {
            runs: vec![Run::Equation {
                block: 3,
                display: true,
                status: RecognitionStatus::Ok,
                recognized_latex: r"a + \sqrt{b}".into(),
                canonical_latex: r"a + \sqrt{b}".into(),
                omml: String::new(),
                tree,
            }],
        };
        assert_eq!(
            MarkdownExporter::format_paragraph(&paragraph),
            "$$\na + ⟦LaTeX: \\sqrt{b}⟧\n$$"
        );
    }

    #[test]
    fn inline_equations_stay_in_the_sentence() {
        let paragraph = Paragraph {
            runs: vec![
                Run::Text {
                    block: 0,
                    text: "여기서".into(),
                },
                equation(false),
                Run::Text {
                    block: 2,
                    text: "이다.".into(),
                },
            ],
        };
        assert_eq!(MarkdownExporter::format_paragraph(&paragraph), "여기서 $x^{2}$ 이다.");
    }

    #[test]
    fn writes_document_and_pages() {
        let dir = tempfile::tempdir().unwrap();
        let output = ConversionOutput {
            document: crate::assemble::AssembledDocument {
                sections: vec![Section {
                    page_index: 0,
                    source_image_ref: None,
                    paragraphs: vec![Paragraph {
                        runs: vec![Run::Placeholder {
                            block: 0,
                            text: "[formula not recognized: page 1, region 2, image crop.png]".into(),
                            image_ref: Some("crop.png".into()),
                        }],
                    }],
                    report: PageReport::default(),
                }],
                failures: vec![],
            },
            crossref: Default::default(),
            report: crate::assemble::RunReport::from_model(&Default::default(), vec![]),
        };

        MarkdownExporter::new(dir.path().to_path_buf())
            .export(&output)
            .unwrap();

        let page = std::fs::read_to_string(dir.path().join("page_001.md")).unwrap();
        assert!(page.starts_with("# Page 1"));
        assert!(page.contains("![formula](crop.png)"));
        assert!(dir.path().join("document.md").exists());
    }
}
