//! OCR fallback: recover text from a page that has no text layer.
//!
//! ## Steps
//!
//! 1. Rasterise the page at the configured DPI.
//! 2. Convert to grayscale.
//! 3. Persist to a temp PNG named after the page (`page-<n>-XXXXXX.png`).
//! 4. Run the OCR engine on the file with the requested languages.
//! 5. Remove the temp file.
//!
//! Any step may fail. Failures never escape this module: they become an
//! [`OcrOutcome::Recovered`] carrying the placeholder text the page gets in
//! the output document. The temp file is a [`tempfile::NamedTempFile`], so it
//! is removed on every path, including early returns and panics.
//!
//! The default engine is the `tesseract` command-line program. Anything that
//! can turn an image file into text can implement [`OcrEngine`].

use super::pdf::PageSource;
use super::postprocess::{clean_text, single_line};
use crate::config::ConversionConfig;
use crate::error::{OcrEngineError, PageError};
use image::ImageFormat;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

/// Standard install locations of the Windows tesseract installer.
const WINDOWS_TESSERACT_PATHS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
];

/// Turns an image file into text.
pub trait OcrEngine: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Cheap probe: can this engine run at all on this host?
    fn is_available(&self) -> bool;

    /// Recognise the text in the image at `image_path`.
    ///
    /// `languages` uses the tesseract syntax: `eng`, `eng+ben`, …
    fn recognize_file(&self, image_path: &Path, languages: &str)
        -> Result<String, OcrEngineError>;
}

// ── tesseract ───────────────────────────────────────────────────────────────

/// [`OcrEngine`] driving the `tesseract` binary.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    command: PathBuf,
}

impl TesseractCli {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Find the tesseract binary: the configured command, `TESSERACT_CMD`,
    /// the standard Windows install locations, then `tesseract` on `PATH`.
    pub fn locate(configured: Option<&Path>) -> Self {
        if let Some(cmd) = configured {
            return Self::new(cmd);
        }
        if let Some(cmd) = std::env::var_os("TESSERACT_CMD").filter(|v| !v.is_empty()) {
            return Self::new(cmd);
        }
        if cfg!(windows) {
            if let Some(found) = WINDOWS_TESSERACT_PATHS
                .iter()
                .map(Path::new)
                .find(|p| p.is_file())
            {
                return Self::new(found);
            }
        }
        Self::new("tesseract")
    }

    pub fn command(&self) -> &Path {
        &self.command
    }

    fn command_display(&self) -> String {
        self.command.display().to_string()
    }
}

impl OcrEngine for TesseractCli {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn is_available(&self) -> bool {
        Command::new(&self.command)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn recognize_file(
        &self,
        image_path: &Path,
        languages: &str,
    ) -> Result<String, OcrEngineError> {
        let output = Command::new(&self.command)
            .arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(languages)
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => OcrEngineError::NotFound {
                    command: self.command_display(),
                },
                _ => OcrEngineError::Spawn {
                    command: self.command_display(),
                    source: e,
                },
            })?;

        if !output.status.success() {
            return Err(OcrEngineError::Failed {
                status: output.status.to_string(),
                stderr: single_line(&String::from_utf8_lossy(&output.stderr)),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

// ── per-page recognition ────────────────────────────────────────────────────

/// The knobs OCR needs, lifted out of [`ConversionConfig`].
#[derive(Debug, Clone)]
pub struct OcrSettings {
    pub dpi: u32,
    pub max_rendered_pixels: u32,
    pub languages: String,
    pub temp_dir: Option<PathBuf>,
}

impl OcrSettings {
    pub fn from_config(config: &ConversionConfig) -> Self {
        Self {
            dpi: config.dpi,
            max_rendered_pixels: config.max_rendered_pixels,
            languages: config.ocr_languages.clone(),
            temp_dir: config.temp_dir.clone(),
        }
    }
}

/// Result of OCR for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OcrOutcome {
    /// Cleaned, non-empty recognised text.
    Recognized(String),
    /// OCR produced nothing usable; the page gets `placeholder`.
    Recovered { placeholder: String, reason: String },
}

impl OcrOutcome {
    /// The text to put in the document for this page.
    pub fn text(&self) -> &str {
        match self {
            OcrOutcome::Recognized(text) => text,
            OcrOutcome::Recovered { placeholder, .. } => placeholder,
        }
    }

    pub fn is_recognized(&self) -> bool {
        matches!(self, OcrOutcome::Recognized(_))
    }
}

/// Placeholder for a page where some OCR step failed.
pub fn ocr_failure_placeholder(page_num: usize, reason: &str) -> String {
    format!("[OCR failed for page {page_num}: {}]", single_line(reason))
}

/// Placeholder for a page where OCR ran but recognised nothing.
pub fn empty_page_placeholder(page_num: usize) -> String {
    format!("[Page {page_num}: no text could be recognised]")
}

/// Run OCR on page `index` (0-based).
pub fn recognize_page(
    doc: &dyn PageSource,
    index: usize,
    settings: &OcrSettings,
    engine: &dyn OcrEngine,
) -> OcrOutcome {
    let page_num = index + 1;
    match try_recognize(doc, index, settings, engine) {
        Ok(text) => {
            let text = clean_text(&text);
            if text.is_empty() {
                debug!("Page {}: OCR recognised no text", page_num);
                OcrOutcome::Recovered {
                    placeholder: empty_page_placeholder(page_num),
                    reason: "no text recognised".to_string(),
                }
            } else {
                debug!("Page {}: {} chars from OCR", page_num, text.len());
                OcrOutcome::Recognized(text)
            }
        }
        Err(e) => {
            warn!("{}", e);
            OcrOutcome::Recovered {
                placeholder: ocr_failure_placeholder(page_num, e.detail()),
                reason: e.to_string(),
            }
        }
    }
}

fn try_recognize(
    doc: &dyn PageSource,
    index: usize,
    settings: &OcrSettings,
    engine: &dyn OcrEngine,
) -> Result<String, PageError> {
    let page = index + 1;
    let image = doc
        .rasterize(index, settings.dpi, settings.max_rendered_pixels)?
        .grayscale();

    let dir = settings
        .temp_dir
        .clone()
        .unwrap_or_else(std::env::temp_dir);
    let temp_failed = |detail: String| PageError::TempImageFailed { page, detail };

    let mut file = tempfile::Builder::new()
        .prefix(&format!("page-{page}-"))
        .suffix(".png")
        .tempfile_in(&dir)
        .map_err(|e| temp_failed(format!("{}: {}", dir.display(), e)))?;
    image
        .write_to(file.as_file_mut(), ImageFormat::Png)
        .map_err(|e| temp_failed(e.to_string()))?;

    debug!(
        "Page {}: running {} on {}",
        page,
        engine.name(),
        file.path().display()
    );
    let text = engine
        .recognize_file(file.path(), &settings.languages)
        .map_err(|e| PageError::OcrFailed {
            page,
            detail: e.to_string(),
        });

    if let Err(e) = file.close() {
        warn!("Page {}: could not remove temp image: {}", page, e);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::DocumentMetadata;
    use crate::pipeline::pdf::TextSegment;
    use image::DynamicImage;
    use std::sync::Mutex;

    struct BlankPage {
        render_fails: bool,
    }

    impl PageSource for BlankPage {
        fn page_count(&self) -> usize {
            1
        }

        fn page_text(&self, _index: usize) -> Result<String, PageError> {
            Ok(String::new())
        }

        fn text_segments(&self, _index: usize) -> Result<Vec<TextSegment>, PageError> {
            Ok(Vec::new())
        }

        fn has_images(&self, _index: usize) -> Result<bool, PageError> {
            Ok(true)
        }

        fn rasterize(&self, index: usize, _: u32, _: u32) -> Result<DynamicImage, PageError> {
            if self.render_fails {
                Err(PageError::RenderFailed {
                    page: index + 1,
                    detail: "bitmap allocation failed".into(),
                })
            } else {
                Ok(DynamicImage::new_rgb8(16, 16))
            }
        }

        fn metadata(&self) -> DocumentMetadata {
            DocumentMetadata::default()
        }
    }

    /// Records the image path it was given and whether the file existed.
    struct Recorder {
        reply: Result<&'static str, &'static str>,
        seen: Mutex<Vec<(PathBuf, bool, String)>>,
    }

    impl Recorder {
        fn new(reply: Result<&'static str, &'static str>) -> Self {
            Self {
                reply,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl OcrEngine for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn is_available(&self) -> bool {
            true
        }

        fn recognize_file(&self, path: &Path, languages: &str) -> Result<String, OcrEngineError> {
            self.seen
                .lock()
                .unwrap()
                .push((path.to_path_buf(), path.is_file(), languages.to_string()));
            match self.reply {
                Ok(text) => Ok(text.to_string()),
                Err(stderr) => Err(OcrEngineError::Failed {
                    status: "exit status: 1".into(),
                    stderr: stderr.into(),
                }),
            }
        }
    }

    fn settings(dir: &Path) -> OcrSettings {
        OcrSettings {
            dpi: 300,
            max_rendered_pixels: 6000,
            languages: "eng+ben".into(),
            temp_dir: Some(dir.to_path_buf()),
        }
    }

    #[test]
    fn recognised_text_is_cleaned() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Recorder::new(Ok("Scanned line  \n\x0c"));
        let out = recognize_page(&BlankPage { render_fails: false }, 0, &settings(dir.path()), &engine);
        assert_eq!(out, OcrOutcome::Recognized("Scanned line".into()));
        assert_eq!(engine.seen.lock().unwrap()[0].2, "eng+ben");
    }

    #[test]
    fn temp_image_exists_during_call_and_is_gone_after_success() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Recorder::new(Ok("text"));
        recognize_page(&BlankPage { render_fails: false }, 2, &settings(dir.path()), &engine);

        let seen = engine.seen.lock().unwrap();
        let (path, existed, _) = &seen[0];
        assert!(existed, "image must exist while the engine runs");
        assert!(!path.exists(), "image must be removed afterwards");
        let name = path.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("page-3-") && name.ends_with(".png"), "got {name}");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn temp_image_is_gone_after_engine_failure() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Recorder::new(Err("Failed loading language 'ben'"));
        let out = recognize_page(&BlankPage { render_fails: false }, 0, &settings(dir.path()), &engine);

        match &out {
            OcrOutcome::Recovered { placeholder, .. } => {
                assert!(placeholder.starts_with("[OCR failed for page 1: "), "got {placeholder}");
                assert!(placeholder.contains("Failed loading language"));
            }
            other => panic!("expected recovery, got {other:?}"),
        }
        let seen = engine.seen.lock().unwrap();
        assert!(!seen[0].0.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn render_failure_skips_engine() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Recorder::new(Ok("never"));
        let out = recognize_page(&BlankPage { render_fails: true }, 4, &settings(dir.path()), &engine);
        assert!(out.text().starts_with("[OCR failed for page 5: "));
        assert!(engine.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn missing_temp_dir_is_recovered() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Recorder::new(Ok("never"));
        let s = settings(&dir.path().join("does-not-exist"));
        let out = recognize_page(&BlankPage { render_fails: false }, 0, &s, &engine);
        assert!(!out.is_recognized());
        assert!(engine.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn whitespace_result_gets_empty_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Recorder::new(Ok("  \n\n \x0c"));
        let out = recognize_page(&BlankPage { render_fails: false }, 6, &settings(dir.path()), &engine);
        assert_eq!(out.text(), "[Page 7: no text could be recognised]");
    }

    #[test]
    fn placeholder_reason_is_single_line() {
        assert_eq!(
            ocr_failure_placeholder(2, "line one\n  line two\r\n"),
            "[OCR failed for page 2: line one line two]"
        );
    }

    #[test]
    fn locate_prefers_configured_command() {
        let t = TesseractCli::locate(Some(Path::new("/opt/ocr/bin/tesseract")));
        assert_eq!(t.command(), Path::new("/opt/ocr/bin/tesseract"));
    }

    #[test]
    fn missing_binary_is_unavailable_and_not_found() {
        let t = TesseractCli::new("/definitely/not/here/tesseract");
        assert!(!t.is_available());
        let err = t
            .recognize_file(Path::new("page.png"), "eng")
            .unwrap_err();
        assert!(matches!(err, OcrEngineError::NotFound { .. }));
    }
}
