//! DOCX writer: serialise an [`OutputDocument`] with `docx-rs`.
//!
//! Layout in the package:
//!
//! - one `w:p` per paragraph, one run carrying the text at the configured
//!   font size; single newlines inside a paragraph become line breaks
//! - a page break is its own paragraph holding a run with a single
//!   `w:br w:type="page"`
//!
//! [`write_document`] writes to a temp file in the destination directory and
//! renames it into place, so a failed write never leaves a truncated
//! `.docx` behind. [`read_blocks`] walks a package back into [`Block`]s.

use crate::error::ConvertError;
use crate::output::{Block, OutputDocument};
use docx_rs::{
    BreakType, DocumentChild, Docx, Paragraph, ParagraphChild, Run, RunChild,
};
use std::path::Path;
use tracing::debug;

/// Build the in-memory `docx-rs` document.
pub fn build_docx(doc: &OutputDocument, font_size_pt: u32) -> Docx {
    // docx sizes are in half-points.
    let half_points = (font_size_pt * 2) as usize;

    doc.blocks()
        .into_iter()
        .fold(Docx::new(), |docx, block| match block {
            Block::PageBreak => docx
                .add_paragraph(Paragraph::new().add_run(Run::new().add_break(BreakType::Page))),
            Block::Paragraph(text) if text.is_empty() => docx.add_paragraph(Paragraph::new()),
            Block::Paragraph(text) => {
                docx.add_paragraph(Paragraph::new().add_run(text_run(&text, half_points)))
            }
        })
}

fn text_run(text: &str, half_points: usize) -> Run {
    text.split('\n')
        .enumerate()
        .fold(Run::new().size(half_points), |run, (i, line)| {
            let run = if i > 0 {
                run.add_break(BreakType::TextWrapping)
            } else {
                run
            };
            run.add_text(line)
        })
}

/// Write `doc` to `path`, replacing any existing file.
pub fn write_document(
    doc: &OutputDocument,
    path: &Path,
    font_size_pt: u32,
) -> Result<(), ConvertError> {
    let fail = |detail: String| ConvertError::OutputWriteFailed {
        path: path.to_path_buf(),
        detail,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::Builder::new()
        .prefix(".pdf2docx-")
        .suffix(".docx.tmp")
        .tempfile_in(dir)
        .map_err(|e| fail(e.to_string()))?;

    build_docx(doc, font_size_pt)
        .build()
        .pack(tmp.as_file_mut())
        .map_err(|e| fail(e.to_string()))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| fail(e.to_string()))?;
    tmp.persist(path).map_err(|e| fail(e.error.to_string()))?;

    debug!(
        "Wrote {} paragraphs, {} page breaks to {}",
        doc.paragraph_count(),
        doc.page_break_count(),
        path.display()
    );
    Ok(())
}

/// Read a `.docx` back into paragraphs and page breaks.
///
/// Line breaks inside a paragraph come back as `\n`. A paragraph that holds
/// breaks but no text is a page break.
pub fn read_blocks(path: &Path) -> Result<Vec<Block>, ConvertError> {
    let fail = |detail: String| ConvertError::OutputUnreadable {
        path: path.to_path_buf(),
        detail,
    };
    let bytes = std::fs::read(path).map_err(|e| fail(e.to_string()))?;
    let docx = docx_rs::read_docx(&bytes).map_err(|e| fail(e.to_string()))?;

    let mut blocks = Vec::new();
    for child in &docx.document.children {
        let DocumentChild::Paragraph(paragraph) = child else {
            continue;
        };

        let mut text = String::new();
        let mut has_text = false;
        let mut has_break = false;
        for run in paragraph.children.iter().filter_map(|c| match c {
            ParagraphChild::Run(run) => Some(run),
            _ => None,
        }) {
            for rc in &run.children {
                match rc {
                    RunChild::Text(t) => {
                        has_text = true;
                        text.push_str(&t.text);
                    }
                    RunChild::Break(_) => {
                        has_break = true;
                        if has_text {
                            text.push('\n');
                        }
                    }
                    _ => {}
                }
            }
        }

        if has_break && !has_text {
            blocks.push(Block::PageBreak);
        } else {
            blocks.push(Block::Paragraph(text));
        }
    }
    Ok(blocks)
}
