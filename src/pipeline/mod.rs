//! Pipeline stages for PDF-to-DOCX conversion.
//!
//! Each submodule implements exactly one step. The orchestrator in
//! [`crate::convert`] decides which steps run for a given mode.
//!
//! ## Data Flow
//!
//! ```text
//!            ┌─▶ layout ───────────────────────────┐
//! input ─▶ pdf                                      ├─▶ docx
//!            └─▶ extract ─(empty)─▶ ocr ─▶ postprocess ┘
//! ```
//!
//! 1. [`input`]   — caller-side validation of the PDF path
//! 2. [`pdf`]     — open the document (pdfium) behind the `PageSource` trait
//! 3. [`layout`]  — whole-document paragraph reconstruction (structured path)
//! 4. [`extract`] — per-page text layer
//! 5. [`ocr`]     — rasterise + recognise pages without a text layer
//! 6. [`postprocess`] — deterministic text cleanup and paragraph splitting
//! 7. [`docx`]    — serialise the document, atomically
//! 8. [`output_path`] — pick a non-colliding `.docx` name

pub mod docx;
pub mod extract;
pub mod input;
pub mod layout;
pub mod ocr;
pub mod output_path;
pub mod pdf;
pub mod postprocess;
