//! Structured conversion: rebuild paragraphs from the page layout in one pass
//! over the whole document, without OCR.
//!
//! ## Algorithm
//!
//! 1. Collect the positioned text segments of every page.
//! 2. Group segments into lines by vertical overlap; order each line left to
//!    right.
//! 3. Start a new paragraph when the gap above a line is larger than the
//!    typical line height, or when the line is indented relative to the one
//!    above it (a first-line indent).
//! 4. Join the lines of a paragraph with spaces, re-joining words hyphenated
//!    across a line end.
//!
//! The converter refuses documents it cannot reproduce faithfully: a page
//! that draws an image but has no text layer is a scan and would silently
//! become an empty page, so it is an error and the caller falls back to
//! per-page extraction. A page with neither is blank and stays blank; a
//! document with no text on any page is refused. After writing, the
//! `.docx` is read back and compared with what was produced; on mismatch the
//! file is removed and the conversion fails.

use super::docx::{read_blocks, write_document};
use super::pdf::{with_document, DocumentBackend, PageSource, TextSegment};
use super::postprocess::{clean_text, single_line};
use crate::error::ConvertError;
use crate::output::{OutputDocument, PageOrigin};
use crate::progress::ConversionProgressCallback;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Segments whose vertical overlap covers at least this share of the smaller
/// height sit on the same line.
const SAME_LINE_OVERLAP: f32 = 0.5;

/// A line starting this many line-heights right of the previous one opens a
/// new paragraph.
const INDENT_FACTOR: f32 = 1.0;

/// A horizontal gap wider than this share of the line height between two
/// segments is a word space.
const WORD_GAP_FACTOR: f32 = 0.15;

/// What a successful structured conversion produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredReport {
    pub pages: usize,
    pub paragraphs: usize,
    pub page_breaks: usize,
}

/// Converts a whole PDF to a `.docx` in one step.
pub trait StructuredConverter: Send + Sync {
    /// Write `output` from `input`. On error nothing is left at `output`.
    fn convert_whole_document(
        &self,
        input: &Path,
        output: &Path,
        progress: &dyn ConversionProgressCallback,
    ) -> Result<StructuredReport, ConvertError>;
}

/// [`StructuredConverter`] built on positioned text from a
/// [`DocumentBackend`].
pub struct LayoutConverter {
    backend: Arc<dyn DocumentBackend>,
    password: Option<String>,
    font_size_pt: u32,
}

impl LayoutConverter {
    pub fn new(backend: Arc<dyn DocumentBackend>, password: Option<String>, font_size_pt: u32) -> Self {
        Self {
            backend,
            password,
            font_size_pt,
        }
    }
}

impl StructuredConverter for LayoutConverter {
    fn convert_whole_document(
        &self,
        input: &Path,
        output: &Path,
        progress: &dyn ConversionProgressCallback,
    ) -> Result<StructuredReport, ConvertError> {
        let doc = with_document(
            self.backend.as_ref(),
            input,
            self.password.as_deref(),
            |src| layout_document(src, progress),
        )?;

        write_document(&doc, output, self.font_size_pt)?;
        let guard = RemoveOnDrop::new(output);

        let written = read_blocks(output)?;
        let expected = doc.blocks();
        if written != expected {
            warn!(
                "Structured output failed validation: wrote {} blocks, read back {}",
                expected.len(),
                written.len()
            );
            return Err(ConvertError::StructuredUnavailable {
                reason: "written document does not match the reconstructed paragraphs".into(),
            });
        }
        guard.keep();

        let report = StructuredReport {
            pages: doc.page_count(),
            paragraphs: doc.paragraph_count(),
            page_breaks: doc.page_break_count(),
        };
        info!(
            "Structured conversion: {} pages, {} paragraphs",
            report.pages, report.paragraphs
        );
        Ok(report)
    }
}

/// Deletes a file when dropped unless [`RemoveOnDrop::keep`] was called.
struct RemoveOnDrop {
    path: Option<PathBuf>,
}

impl RemoveOnDrop {
    fn new(path: &Path) -> Self {
        Self {
            path: Some(path.to_path_buf()),
        }
    }

    fn keep(mut self) {
        self.path = None;
    }
}

impl Drop for RemoveOnDrop {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!("Could not remove rejected output {}: {}", path.display(), e);
            }
        }
    }
}

/// Rebuild every page of `src` as paragraphs.
pub fn layout_document(
    src: &dyn PageSource,
    progress: &dyn ConversionProgressCallback,
) -> Result<OutputDocument, ConvertError> {
    let total = src.page_count();
    if total == 0 {
        return Err(ConvertError::StructuredUnavailable {
            reason: "document has no pages".into(),
        });
    }
    progress.on_conversion_start(total);

    let mut doc = OutputDocument::new();
    let mut text_pages = 0;
    for index in 0..total {
        let page_num = index + 1;
        let segments = src
            .text_segments(index)
            .map_err(|e| ConvertError::StructuredUnavailable {
                reason: e.to_string(),
            })?;
        let paragraphs = layout_paragraphs(&segments);
        if paragraphs.is_empty() {
            // No text: a blank separator page keeps its slot, a scanned page
            // needs OCR.
            let scanned = src
                .has_images(index)
                .map_err(|e| ConvertError::StructuredUnavailable {
                    reason: e.to_string(),
                })?;
            if scanned {
                return Err(ConvertError::StructuredUnavailable {
                    reason: format!("page {page_num} has no text layer"),
                });
            }
            debug!("Page {}: blank", page_num);
        } else {
            debug!("Page {}: {} paragraphs from layout", page_num, paragraphs.len());
            text_pages += 1;
        }
        doc.push_page(paragraphs);
        progress.on_page_complete(page_num, total, PageOrigin::TextLayer);
    }
    if text_pages == 0 {
        return Err(ConvertError::StructuredUnavailable {
            reason: "no page has a text layer".into(),
        });
    }
    Ok(doc)
}

#[derive(Debug)]
struct Line {
    top: f32,
    bottom: f32,
    left: f32,
    segments: Vec<TextSegment>,
}

impl Line {
    fn start(seg: TextSegment) -> Self {
        Self {
            top: seg.top,
            bottom: seg.bottom,
            left: seg.left,
            segments: vec![seg],
        }
    }

    fn height(&self) -> f32 {
        (self.bottom - self.top).max(0.0)
    }

    fn overlaps(&self, seg: &TextSegment) -> bool {
        let overlap = self.bottom.min(seg.bottom) - self.top.max(seg.top);
        let smaller = self.height().min(seg.height());
        if smaller <= f32::EPSILON {
            return (seg.top - self.top).abs() <= f32::EPSILON;
        }
        overlap >= smaller * SAME_LINE_OVERLAP
    }

    fn push(&mut self, seg: TextSegment) {
        self.top = self.top.min(seg.top);
        self.bottom = self.bottom.max(seg.bottom);
        self.left = self.left.min(seg.left);
        self.segments.push(seg);
    }

    fn text(&self) -> String {
        let mut segs: Vec<&TextSegment> = self.segments.iter().collect();
        segs.sort_by(|a, b| a.left.total_cmp(&b.left));

        let word_gap = self.height() * WORD_GAP_FACTOR;
        let mut out = String::new();
        let mut prev_right: Option<f32> = None;
        for seg in segs {
            if let Some(right) = prev_right {
                let touching = seg.left - right <= word_gap;
                if !touching && !out.ends_with(' ') && !seg.text.starts_with(' ') {
                    out.push(' ');
                }
            }
            out.push_str(&seg.text);
            prev_right = Some(seg.right);
        }
        single_line(&out)
    }
}

/// Group segments into lines, top to bottom.
fn group_lines(segments: &[TextSegment]) -> Vec<Line> {
    let mut sorted: Vec<TextSegment> = segments
        .iter()
        .filter(|s| !s.text.trim().is_empty())
        .cloned()
        .collect();
    sorted.sort_by(|a, b| a.top.total_cmp(&b.top).then(a.left.total_cmp(&b.left)));

    let mut lines: Vec<Line> = Vec::new();
    for seg in sorted {
        match lines.iter_mut().rev().find(|l| l.overlaps(&seg)) {
            Some(line) => line.push(seg),
            None => lines.push(Line::start(seg)),
        }
    }
    lines.sort_by(|a, b| a.top.total_cmp(&b.top));
    lines
}

fn median(mut values: Vec<f32>) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f32::total_cmp);
    values[values.len() / 2]
}

/// Rebuild paragraphs from one page's segments, in reading order.
pub fn layout_paragraphs(segments: &[TextSegment]) -> Vec<String> {
    let lines = group_lines(segments);
    if lines.is_empty() {
        return Vec::new();
    }
    let line_height = median(lines.iter().map(Line::height).collect());

    let mut paragraphs: Vec<Vec<String>> = Vec::new();
    let mut prev: Option<&Line> = None;
    for line in &lines {
        let text = line.text();
        if text.is_empty() {
            continue;
        }
        let breaks = match prev {
            None => true,
            Some(p) => {
                let gap = line.top - p.bottom;
                let indent = line.left - p.left;
                gap > line_height || indent > line_height * INDENT_FACTOR
            }
        };
        if breaks {
            paragraphs.push(vec![text]);
        } else if let Some(current) = paragraphs.last_mut() {
            current.push(text);
        }
        prev = Some(line);
    }

    paragraphs
        .iter()
        .map(|lines| clean_text(&join_lines(lines)))
        .filter(|p| !p.is_empty())
        .collect()
}

/// Join the lines of a paragraph, re-joining `exam-\nple` into `example`.
fn join_lines(lines: &[String]) -> String {
    let mut out = String::new();
    for line in lines {
        if out.is_empty() {
            out.push_str(line);
            continue;
        }
        let continues_word = line.chars().next().is_some_and(char::is_lowercase);
        let hyphenated = out
            .strip_suffix('-')
            .or_else(|| out.strip_suffix('\u{00AD}'))
            .filter(|head| head.chars().last().is_some_and(char::is_alphabetic))
            .map(str::len);
        match hyphenated {
            Some(len) if continues_word => {
                out.truncate(len);
                out.push_str(line);
            }
            _ => {
                out.push(' ');
                out.push_str(line);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str, left: f32, top: f32, width: f32) -> TextSegment {
        TextSegment {
            text: text.to_string(),
            left,
            top,
            right: left + width,
            bottom: top + 12.0,
        }
    }

    #[test]
    fn lines_split_on_blank_gap() {
        let segs = vec![
            seg("First paragraph line one", 72.0, 100.0, 200.0),
            seg("line two of the first.", 72.0, 114.0, 180.0),
            seg("Second paragraph.", 72.0, 150.0, 150.0),
        ];
        assert_eq!(
            layout_paragraphs(&segs),
            vec![
                "First paragraph line one line two of the first.",
                "Second paragraph."
            ]
        );
    }

    #[test]
    fn first_line_indent_starts_paragraph() {
        let segs = vec![
            seg("Opening line of text", 72.0, 100.0, 200.0),
            seg("continues here.", 72.0, 114.0, 120.0),
            seg("Indented new paragraph", 100.0, 128.0, 200.0),
            seg("wraps to the margin.", 72.0, 142.0, 150.0),
        ];
        assert_eq!(
            layout_paragraphs(&segs),
            vec![
                "Opening line of text continues here.",
                "Indented new paragraph wraps to the margin."
            ]
        );
    }

    #[test]
    fn segments_on_one_line_are_ordered_left_to_right() {
        let segs = vec![
            seg("world", 130.0, 100.5, 40.0),
            seg("Hello", 72.0, 100.0, 40.0),
        ];
        assert_eq!(layout_paragraphs(&segs), vec!["Hello world"]);
    }

    #[test]
    fn touching_segments_join_without_space() {
        // "bold" run in the middle of a word.
        let segs = vec![
            seg("im", 72.0, 100.0, 12.0),
            seg("port", 84.0, 100.0, 20.0),
            seg("ant", 104.5, 100.0, 15.0),
        ];
        assert_eq!(layout_paragraphs(&segs), vec!["important"]);
    }

    #[test]
    fn hyphenated_line_end_is_rejoined() {
        let segs = vec![
            seg("a well-known exam-", 72.0, 100.0, 200.0),
            seg("ple of Hyphen-", 72.0, 114.0, 150.0),
            seg("Ated text", 72.0, 128.0, 80.0),
        ];
        assert_eq!(
            layout_paragraphs(&segs),
            vec!["a well-known example of Hyphen- Ated text"]
        );
    }

    #[test]
    fn whitespace_segments_are_ignored() {
        let segs = vec![seg("   ", 72.0, 100.0, 20.0), seg("\t", 72.0, 200.0, 5.0)];
        assert!(layout_paragraphs(&segs).is_empty());
    }

    #[test]
    fn unsorted_input_is_read_top_to_bottom() {
        let segs = vec![
            seg("Second.", 72.0, 200.0, 60.0),
            seg("First.", 72.0, 100.0, 60.0),
        ];
        assert_eq!(layout_paragraphs(&segs), vec!["First.", "Second."]);
    }

    #[test]
    fn join_lines_keeps_numeric_dashes() {
        assert_eq!(
            join_lines(&["pages 10-".into(), "12 inclusive".into()]),
            "pages 10- 12 inclusive"
        );
    }
}
