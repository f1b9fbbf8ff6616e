//! # edgequake-pdf2docx
//!
//! Convert PDF documents to editable Word documents (`.docx`), including
//! scanned PDFs that carry no text at all.
//!
//! ## Why this crate?
//!
//! Digitally-authored PDFs carry a text layer that can be lifted directly.
//! Scanned PDFs carry only pictures of text. Most documents in the wild are
//! one or the other, and many are a mix: a typed report with a scanned
//! signature page appended. This crate decides per document, and then per
//! page, how to get the text out, and never lets one bad page cost the rest
//! of the document.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Structured  rebuild paragraphs from the page layout (auto / text-only)
//!  │                 └─ refused if a page is a scan without a text layer
//!  ├─ 2. Per-page    text layer, else OCR (tesseract), else a placeholder
//!  └─ 3. Output      one paragraph per block of text, a page break between pages
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2docx::{resolve_output_path, ConversionConfig, ConversionMode, Converter};
//!
//! let converter = Converter::new(ConversionConfig::default());
//! let output = resolve_output_path("scan.pdf");
//! let result = converter.convert("scan.pdf", &output, ConversionMode::Auto);
//! if result.success {
//!     println!("wrote {} ({} pages via OCR)", output.display(), result.stats.ocr_pages);
//! } else {
//!     eprintln!("{}", result.error.unwrap_or_default());
//! }
//! ```
//!
//! ## Background jobs
//!
//! UIs should not block on a conversion. [`Converter::start`] runs the job on
//! a worker thread and hands back a [`ConversionTask`] delivering
//! [`ConversionEvent`]s:
//!
//! ```rust,no_run
//! use edgequake_pdf2docx::{ConversionConfig, ConversionEvent, ConversionMode, Converter};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let converter = Converter::new(ConversionConfig::default());
//! let mut task = converter.start("scan.pdf", "scan.docx", ConversionMode::OcrOnly)?;
//! while let Some(event) = task.next_event().await {
//!     match event {
//!         ConversionEvent::Progress { current_page, total_pages, .. } => {
//!             eprintln!("page {current_page}/{total_pages}")
//!         }
//!         ConversionEvent::Succeeded { output_path, .. } => println!("{}", output_path.display()),
//!         ConversionEvent::Failed { message } => eprintln!("{message}"),
//!         ConversionEvent::Strategy(_) => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2docx` binary (clap + indicatif + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! edgequake-pdf2docx = { version = "0.1", default-features = false }
//! ```
//!
//! ## Runtime requirements
//!
//! | Component | Needed for | Located via |
//! |-----------|------------|-------------|
//! | libpdfium | everything | `pdfium_library_path`, `PDFIUM_LIB_PATH`, working dir, system |
//! | tesseract | OCR pages  | `tesseract_cmd`, `TESSERACT_CMD`, Windows install dirs, `PATH` |
//!
//! Without tesseract, documents with a text layer still convert; image-only
//! pages get a placeholder.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod task;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, ConversionMode, Strategy};
pub use convert::{convert, inspect, is_ocr_available, Converter, ConverterBuilder};
pub use error::{ConvertError, OcrEngineError, PageError};
pub use output::{
    Block, ConversionResult, ConversionStats, DocumentMetadata, OutputDocument, PageOrigin,
    PageRecord,
};
pub use pipeline::input::validate_input;
pub use pipeline::layout::{StructuredConverter, StructuredReport};
pub use pipeline::ocr::{OcrEngine, TesseractCli};
pub use pipeline::output_path::resolve_output_path;
pub use pipeline::pdf::{DocumentBackend, PageSource, PdfiumBackend, TextSegment};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use task::{ConversionEvent, ConversionTask, DocumentJob, JobStatus};
