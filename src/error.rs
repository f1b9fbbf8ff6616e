//! Error types for the edgequake-pdf2docx library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ConvertError`] — **Fatal**: the job cannot produce a document at all
//!   (bad input file, wrong password, unwritable output, structured
//!   conversion refused in text-only mode). Surfaced through
//!   [`crate::output::ConversionResult`] with `success = false`.
//!
//! * [`PageError`] — **Non-fatal**: a single page could not be read or
//!   recognised. The page gets placeholder text and the job continues, so one
//!   smudged scan never costs the caller the rest of the document.
//!
//! [`OcrEngineError`] is what an [`crate::pipeline::ocr::OcrEngine`] reports;
//! the OCR stage wraps it into a [`PageError`] carrying the page number.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2docx library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The path does not carry a `.pdf` extension.
    #[error("'{path}' is not a PDF file (expected a .pdf extension)")]
    NotPdfExtension { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The whole-document layout conversion could not produce a trustworthy
    /// document. Final in text-only mode; auto mode falls back to per-page.
    #[error("Structured conversion unavailable: {reason}")]
    StructuredUnavailable { reason: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output document.
    #[error("Failed to write output file '{path}': {detail}")]
    OutputWriteFailed { path: PathBuf, detail: String },

    /// A written document could not be read back.
    #[error("Could not read back '{path}': {detail}")]
    OutputUnreadable { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Job errors ────────────────────────────────────────────────────────
    /// A conversion is already running on this converter.
    #[error("A conversion is already running; wait for it to finish before starting another")]
    JobInProgress,

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install libpdfium for your platform, then either:\n\
  • place it next to the executable or in the working directory, or\n\
  • set PDFIUM_LIB_PATH=/path/to/libpdfium (file or directory).\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
///
/// Recorded in the page's [`crate::output::PageRecord`]; the page text is
/// replaced by a placeholder and the conversion carries on.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Reading the page's text layer failed.
    #[error("Page {page}: text extraction failed: {detail}")]
    ExtractionFailed { page: usize, detail: String },

    /// Page rasterisation failed.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The temporary raster image could not be written.
    #[error("Page {page}: could not write temporary image: {detail}")]
    TempImageFailed { page: usize, detail: String },

    /// The OCR engine failed on this page.
    #[error("Page {page}: OCR failed: {detail}")]
    OcrFailed { page: usize, detail: String },
}

impl PageError {
    /// 1-based page number the error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::ExtractionFailed { page, .. }
            | PageError::RenderFailed { page, .. }
            | PageError::TempImageFailed { page, .. }
            | PageError::OcrFailed { page, .. } => *page,
        }
    }

    /// The underlying reason, without the page prefix.
    pub fn detail(&self) -> &str {
        match self {
            PageError::ExtractionFailed { detail, .. }
            | PageError::RenderFailed { detail, .. }
            | PageError::TempImageFailed { detail, .. }
            | PageError::OcrFailed { detail, .. } => detail,
        }
    }
}

/// Errors reported by an OCR engine for a single image.
#[derive(Debug, Error)]
pub enum OcrEngineError {
    /// The engine binary could not be found.
    #[error("OCR engine '{command}' not found; install tesseract-ocr or set TESSERACT_CMD")]
    NotFound { command: String },

    /// The engine process could not be started.
    #[error("Failed to run OCR engine '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The engine ran but exited unsuccessfully.
    #[error("OCR engine exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_error_accessors() {
        let e = PageError::OcrFailed {
            page: 4,
            detail: "engine crashed".into(),
        };
        assert_eq!(e.page(), 4);
        assert_eq!(e.detail(), "engine crashed");
        assert!(e.to_string().contains("Page 4"));
    }

    #[test]
    fn structured_unavailable_display() {
        let e = ConvertError::StructuredUnavailable {
            reason: "page 2 has no text layer".into(),
        };
        assert!(e.to_string().contains("page 2 has no text layer"));
    }

    #[test]
    fn output_write_failed_display() {
        let e = ConvertError::OutputWriteFailed {
            path: PathBuf::from("/tmp/out.docx"),
            detail: "disk full".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("out.docx"), "got: {msg}");
        assert!(msg.contains("disk full"), "got: {msg}");
    }

    #[test]
    fn ocr_not_found_mentions_env_override() {
        let e = OcrEngineError::NotFound {
            command: "tesseract".into(),
        };
        assert!(e.to_string().contains("TESSERACT_CMD"));
    }
}
