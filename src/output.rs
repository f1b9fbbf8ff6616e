//! Output types: the in-memory document, per-page records and job results.
//!
//! [`OutputDocument`] stores pages, not a flat list of paragraphs and breaks.
//! Page breaks are derived when the document is walked, so a document with
//! `n` pages always yields exactly `n − 1` breaks, whatever happened to the
//! individual pages.

use crate::config::Strategy;
use crate::error::PageError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One element of a document in reading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// A paragraph of plain text. Single newlines are line breaks.
    Paragraph(String),
    /// A hard page break.
    PageBreak,
}

/// The document being assembled: pages of paragraphs, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputDocument {
    pages: Vec<Vec<String>>,
}

impl OutputDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a page. A page always holds at least one paragraph: an empty
    /// list is stored as a single empty paragraph so the page keeps its slot.
    pub fn push_page(&mut self, paragraphs: Vec<String>) {
        if paragraphs.is_empty() {
            self.pages.push(vec![String::new()]);
        } else {
            self.pages.push(paragraphs);
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page_break_count(&self) -> usize {
        self.pages.len().saturating_sub(1)
    }

    pub fn paragraph_count(&self) -> usize {
        self.pages.iter().map(Vec::len).sum()
    }

    /// Paragraphs of one page (0-indexed).
    pub fn page(&self, index: usize) -> Option<&[String]> {
        self.pages.get(index).map(Vec::as_slice)
    }

    /// All paragraphs in reading order, without breaks.
    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.pages.iter().flatten().map(String::as_str)
    }

    /// Walk the document as paragraphs separated by page breaks.
    pub fn blocks(&self) -> Vec<Block> {
        let mut blocks = Vec::with_capacity(self.paragraph_count() + self.page_break_count());
        for (i, page) in self.pages.iter().enumerate() {
            if i > 0 {
                blocks.push(Block::PageBreak);
            }
            blocks.extend(page.iter().cloned().map(Block::Paragraph));
        }
        blocks
    }
}

/// Where a page's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageOrigin {
    /// The page's embedded text layer.
    TextLayer,
    /// Optical character recognition of the rasterised page.
    Ocr,
    /// Placeholder text: neither the text layer nor OCR produced anything.
    Placeholder,
}

/// Transient record of one page in the per-page loop.
#[derive(Debug, Clone)]
pub struct PageRecord {
    /// 0-indexed page number.
    pub index: usize,
    /// Text produced for the page, if any (before placeholder substitution).
    pub raw_text: Option<String>,
    /// Whether OCR was invoked for this page.
    pub used_ocr: bool,
    /// Page-local failure, if one was absorbed.
    pub error: Option<PageError>,
}

impl PageRecord {
    pub fn page_num(&self) -> usize {
        self.index + 1
    }

    pub fn origin(&self) -> PageOrigin {
        match (&self.raw_text, self.used_ocr) {
            (Some(_), false) => PageOrigin::TextLayer,
            (Some(_), true) => PageOrigin::Ocr,
            (None, _) => PageOrigin::Placeholder,
        }
    }
}

/// Aggregate statistics for one job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Pages in the source document.
    pub total_pages: usize,
    /// Pages whose text came from the text layer.
    pub text_layer_pages: usize,
    /// Pages recognised by OCR.
    pub ocr_pages: usize,
    /// Pages that received placeholder text.
    pub recovered_pages: usize,
    /// Paragraphs written to the output.
    pub paragraphs: usize,
    /// Page breaks written to the output.
    pub page_breaks: usize,
    /// Wall-clock duration of the job.
    pub duration_ms: u64,
}

/// Final outcome of a conversion job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionResult {
    pub success: bool,
    pub output_path: PathBuf,
    /// Error message when `success` is false.
    pub error: Option<String>,
    /// The strategy that produced the document, when successful.
    pub strategy: Option<Strategy>,
    pub stats: ConversionStats,
}

impl ConversionResult {
    pub fn succeeded(output_path: PathBuf, strategy: Strategy, stats: ConversionStats) -> Self {
        Self {
            success: true,
            output_path,
            error: None,
            strategy: Some(strategy),
            stats,
        }
    }

    pub fn failed(output_path: PathBuf, error: impl Into<String>, stats: ConversionStats) -> Self {
        Self {
            success: false,
            output_path,
            error: Some(error.into()),
            strategy: None,
            stats,
        }
    }
}

/// Document metadata, as reported by [`crate::inspect`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    /// Pages carrying a usable text layer.
    pub text_layer_pages: usize,
    pub pdf_version: String,
}
