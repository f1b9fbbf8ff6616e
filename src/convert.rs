//! Conversion orchestrator: pick strategies, run them, report the result.
//!
//! ## Strategies
//!
//! A [`ConversionMode`] expands to an ordered plan of [`Strategy`]s (see
//! [`ConversionMode::plan`]). Each strategy is tried in turn; the first that
//! succeeds produces the document. When the last one fails, so does the job.
//!
//! - **Structured**: the whole document through a [`StructuredConverter`]
//!   (layout reconstruction, no OCR).
//! - **Per-page**: for every page, the text layer; if that is empty, OCR; if
//!   OCR fails, a placeholder. One page never fails the job.
//!
//! [`Converter::convert`] runs on the calling thread and blocks until the job
//! is done. Use [`Converter::start`](crate::task) to run it on a background
//! worker and receive events instead.

use crate::config::{ConversionConfig, ConversionMode, Strategy};
use crate::error::{ConvertError, PageError};
use crate::output::{
    ConversionResult, ConversionStats, DocumentMetadata, OutputDocument, PageOrigin, PageRecord,
};
use crate::pipeline::docx::write_document;
use crate::pipeline::extract::{extract, has_text_layer};
use crate::pipeline::layout::{LayoutConverter, StructuredConverter, StructuredReport};
use crate::pipeline::ocr::{recognize_page, OcrEngine, OcrOutcome, OcrSettings, TesseractCli};
use crate::pipeline::pdf::{with_document, DocumentBackend, PageSource, PdfiumBackend};
use crate::pipeline::postprocess::split_paragraphs;
use crate::progress::{ConversionProgressCallback, FanOut, NoopProgressCallback};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Converts PDFs to `.docx`.
///
/// Cheap to clone: all collaborators are shared. Clones share the single-job
/// guard used by [`Converter::start`](crate::task).
#[derive(Clone)]
pub struct Converter {
    pub(crate) config: Arc<ConversionConfig>,
    backend: Arc<dyn DocumentBackend>,
    ocr: Arc<dyn OcrEngine>,
    structured: Arc<dyn StructuredConverter>,
    pub(crate) busy: Arc<AtomicBool>,
}

/// Builder for [`Converter`]. Every collaborator defaults to the real
/// implementation (pdfium, tesseract, layout reconstruction).
pub struct ConverterBuilder {
    config: ConversionConfig,
    backend: Option<Arc<dyn DocumentBackend>>,
    ocr: Option<Arc<dyn OcrEngine>>,
    structured: Option<Arc<dyn StructuredConverter>>,
}

impl ConverterBuilder {
    /// Use a different PDF backend.
    pub fn backend(mut self, backend: Arc<dyn DocumentBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Use a different OCR engine.
    pub fn ocr_engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.ocr = Some(engine);
        self
    }

    /// Use a different structured converter.
    pub fn structured(mut self, converter: Arc<dyn StructuredConverter>) -> Self {
        self.structured = Some(converter);
        self
    }

    pub fn build(self) -> Converter {
        let config = self.config;
        let backend = self.backend.unwrap_or_else(|| {
            Arc::new(PdfiumBackend::new(config.pdfium_library_path.clone()))
        });
        let ocr = self
            .ocr
            .unwrap_or_else(|| Arc::new(TesseractCli::locate(config.tesseract_cmd.as_deref())));
        let structured = self.structured.unwrap_or_else(|| {
            Arc::new(LayoutConverter::new(
                Arc::clone(&backend),
                config.password.clone(),
                config.font_size_pt,
            ))
        });

        Converter {
            config: Arc::new(config),
            backend,
            ocr,
            structured,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Converter {
    /// A converter with the default collaborators.
    pub fn new(config: ConversionConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn builder(config: ConversionConfig) -> ConverterBuilder {
        ConverterBuilder {
            config,
            backend: None,
            ocr: None,
            structured: None,
        }
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Whether the configured OCR engine can run on this host.
    pub fn is_ocr_available(&self) -> bool {
        self.ocr.is_available()
    }

    /// Convert `input` to `output` on the calling thread.
    ///
    /// Never returns an error: job-level failures are reported through
    /// [`ConversionResult::success`] and [`ConversionResult::error`].
    pub fn convert(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        mode: ConversionMode,
    ) -> ConversionResult {
        self.convert_with_progress(input, output, mode, &NoopProgressCallback)
    }

    /// Like [`Converter::convert`], reporting to `progress` in addition to the
    /// callback in the configuration.
    pub fn convert_with_progress(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        mode: ConversionMode,
        progress: &dyn ConversionProgressCallback,
    ) -> ConversionResult {
        let input = input.as_ref();
        let output = output.as_ref();
        let start = Instant::now();
        info!(
            "Converting {} → {} (mode: {})",
            input.display(),
            output.display(),
            mode
        );

        let mut observers: Vec<&dyn ConversionProgressCallback> = vec![progress];
        if let Some(cb) = &self.config.progress_callback {
            observers.push(cb.as_ref());
        }
        let progress = FanOut(observers);

        remove_existing_output(output);

        let plan = mode.plan();
        let mut last_error = None;
        for &strategy in plan {
            progress.on_strategy_start(strategy);
            debug!("Attempting {}", strategy);

            let attempt = match strategy {
                Strategy::Structured => self
                    .structured
                    .convert_whole_document(input, output, &progress)
                    .map(stats_from_report),
                Strategy::PerPage => self.convert_per_page(input, output, &progress),
            };

            match attempt {
                Ok(mut stats) => {
                    stats.duration_ms = start.elapsed().as_millis() as u64;
                    info!(
                        "Conversion complete via {}: {} pages, {} paragraphs, {}ms",
                        strategy, stats.total_pages, stats.paragraphs, stats.duration_ms
                    );
                    return ConversionResult::succeeded(output.to_path_buf(), strategy, stats);
                }
                Err(e) => {
                    warn!("{} failed: {}", strategy, e);
                    progress.on_strategy_failed(strategy, &e.to_string());
                    last_error = Some(e);
                }
            }
        }

        let message = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no conversion strategy available".to_string());
        let stats = ConversionStats {
            duration_ms: start.elapsed().as_millis() as u64,
            ..ConversionStats::default()
        };
        ConversionResult::failed(output.to_path_buf(), message, stats)
    }

    /// Read metadata and count text-layer pages without converting.
    pub fn inspect(&self, input: impl AsRef<Path>) -> Result<DocumentMetadata, ConvertError> {
        with_document(
            self.backend.as_ref(),
            input.as_ref(),
            self.config.password.as_deref(),
            |src| {
                let mut metadata = src.metadata();
                metadata.page_count = src.page_count();
                metadata.text_layer_pages = (0..metadata.page_count)
                    .filter(|&i| has_text_layer(src, i))
                    .count();
                Ok(metadata)
            },
        )
    }

    /// The per-page strategy: text layer, else OCR, else placeholder.
    fn convert_per_page(
        &self,
        input: &Path,
        output: &Path,
        progress: &dyn ConversionProgressCallback,
    ) -> Result<ConversionStats, ConvertError> {
        let settings = OcrSettings::from_config(&self.config);

        let (doc, mut stats) = with_document(
            self.backend.as_ref(),
            input,
            self.config.password.as_deref(),
            |src| Ok(self.assemble_pages(src, &settings, progress)),
        )?;

        // Written once, after the document is closed.
        write_document(&doc, output, self.config.font_size_pt)?;
        stats.paragraphs = doc.paragraph_count();
        stats.page_breaks = doc.page_break_count();
        Ok(stats)
    }

    fn assemble_pages(
        &self,
        src: &dyn PageSource,
        settings: &OcrSettings,
        progress: &dyn ConversionProgressCallback,
    ) -> (OutputDocument, ConversionStats) {
        let total = src.page_count();
        progress.on_conversion_start(total);
        info!("Processing {} pages", total);

        let mut doc = OutputDocument::new();
        let mut stats = ConversionStats {
            total_pages: total,
            ..ConversionStats::default()
        };

        for index in 0..total {
            let (record, text) = self.process_page(src, index, settings);
            let page_num = record.page_num();
            let origin = record.origin();

            let paragraphs = match origin {
                PageOrigin::Placeholder => vec![text],
                _ if self.config.split_paragraphs => split_paragraphs(&text),
                _ => vec![text],
            };
            doc.push_page(paragraphs);

            match origin {
                PageOrigin::TextLayer => stats.text_layer_pages += 1,
                PageOrigin::Ocr => stats.ocr_pages += 1,
                PageOrigin::Placeholder => {
                    stats.recovered_pages += 1;
                    let reason = record
                        .error
                        .as_ref()
                        .map(|e| e.detail().to_string())
                        .unwrap_or_default();
                    progress.on_page_recovered(page_num, total, &reason);
                }
            }
            progress.on_page_complete(page_num, total, origin);
        }

        progress.on_conversion_complete(total, stats.ocr_pages);
        (doc, stats)
    }

    /// One page through extraction and, if needed, OCR. Returns the record
    /// and the text the page contributes (recognised text or a placeholder).
    fn process_page(
        &self,
        src: &dyn PageSource,
        index: usize,
        settings: &OcrSettings,
    ) -> (PageRecord, String) {
        let mut record = PageRecord {
            index,
            raw_text: None,
            used_ocr: false,
            error: None,
        };

        match extract(src, index) {
            Ok(Some(text)) => {
                record.raw_text = Some(text.clone());
                return (record, text);
            }
            Ok(None) => {}
            Err(e) => {
                warn!("{}; falling back to OCR", e);
                record.error = Some(e);
            }
        }

        record.used_ocr = true;
        match recognize_page(src, index, settings, self.ocr.as_ref()) {
            OcrOutcome::Recognized(text) => {
                record.raw_text = Some(text.clone());
                (record, text)
            }
            OcrOutcome::Recovered {
                placeholder,
                reason,
            } => {
                record.error = Some(PageError::OcrFailed {
                    page: index + 1,
                    detail: reason,
                });
                (record, placeholder)
            }
        }
    }
}

fn stats_from_report(report: StructuredReport) -> ConversionStats {
    ConversionStats {
        total_pages: report.pages,
        text_layer_pages: report.pages,
        paragraphs: report.paragraphs,
        page_breaks: report.page_breaks,
        ..ConversionStats::default()
    }
}

/// The caller has confirmed overwriting; a file that cannot be removed is
/// still replaced by the atomic write.
fn remove_existing_output(output: &Path) {
    if !output.exists() {
        return;
    }
    match std::fs::remove_file(output) {
        Ok(()) => debug!("Removed existing output {}", output.display()),
        Err(e) => warn!(
            "Could not remove existing output {}: {}",
            output.display(),
            e
        ),
    }
}

/// Convert with the default collaborators.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf2docx::{convert, ConversionConfig, ConversionMode};
///
/// let result = convert("scan.pdf", "scan.docx", ConversionMode::Auto, &ConversionConfig::default());
/// if !result.success {
///     eprintln!("{}", result.error.unwrap_or_default());
/// }
/// ```
pub fn convert(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    mode: ConversionMode,
    config: &ConversionConfig,
) -> ConversionResult {
    Converter::new(config.clone()).convert(input, output, mode)
}

/// Extract PDF metadata without converting content.
pub fn inspect(
    input: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<DocumentMetadata, ConvertError> {
    Converter::new(config.clone()).inspect(input)
}

/// Whether the tesseract engine the configuration points at can run.
pub fn is_ocr_available(config: &ConversionConfig) -> bool {
    TesseractCli::locate(config.tesseract_cmd.as_deref()).is_available()
}
