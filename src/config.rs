//! Configuration types for PDF-to-DOCX conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The conversion *mode* is not part of
//! the config: it is chosen per job, because the same converter serves every
//! mode a front end offers.
//!
//! [`ConversionMode::plan`] is the single place that decides which strategies
//! run, and in which order, for each mode.

use crate::error::ConvertError;
use crate::progress::ProgressCallback;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Configuration for a PDF-to-DOCX conversion.
///
/// # Example
/// ```rust
/// use edgequake_pdf2docx::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .dpi(400)
///     .ocr_languages(["eng", "ben"])
///     .build()
///     .unwrap();
/// assert_eq!(config.ocr_languages, "eng+ben");
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Rasterisation DPI for pages that need OCR. Range: 72–600. Default: 300.
    ///
    /// Tesseract is tuned for ~300 DPI input; 400 helps with small print at
    /// the cost of slower recognition.
    pub dpi: u32,

    /// Cap on the longest edge of a rasterised page, in pixels. Default: 6000.
    ///
    /// Keeps memory bounded for oversized pages (posters, drawings) where the
    /// DPI alone would produce enormous bitmaps.
    pub max_rendered_pixels: u32,

    /// Tesseract language set, `+`-separated (e.g. `eng+ben`). Default: `eng`.
    pub ocr_languages: String,

    /// Explicit tesseract executable. If None, the engine is located from
    /// `TESSERACT_CMD`, the standard install locations and `PATH`.
    pub tesseract_cmd: Option<PathBuf>,

    /// Explicit pdfium library (file or directory). If None, `PDFIUM_LIB_PATH`,
    /// the working directory and the system library are tried.
    pub pdfium_library_path: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Split each page's text into paragraphs on blank lines. Default: true.
    pub split_paragraphs: bool,

    /// Body font size in points. Range: 6–72. Default: 12.
    pub font_size_pt: u32,

    /// Directory for temporary raster images. Default: the system temp dir.
    pub temp_dir: Option<PathBuf>,

    /// Optional progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            max_rendered_pixels: 6000,
            ocr_languages: "eng".to_string(),
            tesseract_cmd: None,
            pdfium_library_path: None,
            password: None,
            split_paragraphs: true,
            font_size_pt: 12,
            temp_dir: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("ocr_languages", &self.ocr_languages)
            .field("tesseract_cmd", &self.tesseract_cmd)
            .field("pdfium_library_path", &self.pdfium_library_path)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("split_paragraphs", &self.split_paragraphs)
            .field("font_size_pt", &self.font_size_pt)
            .field("temp_dir", &self.temp_dir)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

static RE_LANGUAGES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+(\+[A-Za-z0-9_]+)*$").expect("valid regex"));

impl ConversionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    /// Set the language set verbatim (`eng`, `eng+ben`, …).
    pub fn ocr_language(mut self, languages: impl Into<String>) -> Self {
        self.config.ocr_languages = languages.into();
        self
    }

    /// Set the language set from individual language codes.
    pub fn ocr_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.config.ocr_languages = languages
            .into_iter()
            .map(|l| l.as_ref().trim().to_string())
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("+");
        self
    }

    pub fn tesseract_cmd(mut self, cmd: impl Into<PathBuf>) -> Self {
        self.config.tesseract_cmd = Some(cmd.into());
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn split_paragraphs(mut self, v: bool) -> Self {
        self.config.split_paragraphs = v;
        self
    }

    pub fn font_size_pt(mut self, pt: u32) -> Self {
        self.config.font_size_pt = pt.clamp(6, 72);
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = Some(dir.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ConvertError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(ConvertError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if !RE_LANGUAGES.is_match(&c.ocr_languages) {
            return Err(ConvertError::InvalidConfig(format!(
                "OCR languages must look like 'eng' or 'eng+ben', got '{}'",
                c.ocr_languages
            )));
        }
        if let Some(dir) = &c.temp_dir {
            if !dir.is_dir() {
                return Err(ConvertError::InvalidConfig(format!(
                    "Temporary directory '{}' does not exist",
                    dir.display()
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Modes & strategies ───────────────────────────────────────────────────

/// How a document should be converted, as chosen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConversionMode {
    /// Layout reconstruction first, per-page extraction + OCR if that fails.
    #[default]
    Auto,
    /// Layout reconstruction only; failure is final.
    TextOnly,
    /// Per-page extraction with OCR fallback; never the layout path.
    OcrOnly,
}

/// One way of producing the output document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Whole-document layout reconstruction from positioned text.
    Structured,
    /// Page-by-page text layer extraction with OCR fallback.
    PerPage,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Structured => f.write_str("structured layout"),
            Strategy::PerPage => f.write_str("per-page extraction"),
        }
    }
}

impl ConversionMode {
    /// All modes, in the order a front end should list them.
    pub const ALL: [ConversionMode; 3] = [
        ConversionMode::Auto,
        ConversionMode::TextOnly,
        ConversionMode::OcrOnly,
    ];

    /// Strategies to attempt, in order. The first that succeeds wins; when
    /// the last one fails the job fails.
    ///
    /// | mode | plan |
    /// |------|------|
    /// | `auto` | structured → per-page |
    /// | `text-only` | structured |
    /// | `ocr-only` | per-page |
    pub fn plan(self) -> &'static [Strategy] {
        match self {
            ConversionMode::Auto => &[Strategy::Structured, Strategy::PerPage],
            ConversionMode::TextOnly => &[Strategy::Structured],
            ConversionMode::OcrOnly => &[Strategy::PerPage],
        }
    }

    /// Human label shown by front ends.
    pub fn label(self) -> &'static str {
        match self {
            ConversionMode::Auto => "Auto (Best Quality)",
            ConversionMode::TextOnly => "Text-based PDF only",
            ConversionMode::OcrOnly => "Scanned PDF with OCR",
        }
    }

    /// Map a human label back to its mode.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.label() == label.trim())
    }

    /// Internal name (`auto`, `text-only`, `ocr-only`).
    pub fn as_str(self) -> &'static str {
        match self {
            ConversionMode::Auto => "auto",
            ConversionMode::TextOnly => "text-only",
            ConversionMode::OcrOnly => "ocr-only",
        }
    }
}

impl fmt::Display for ConversionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversionMode {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(mode) = Self::from_label(s) {
            return Ok(mode);
        }
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(ConversionMode::Auto),
            "text" | "text-only" | "text_only" => Ok(ConversionMode::TextOnly),
            "ocr" | "ocr-only" | "ocr_only" => Ok(ConversionMode::OcrOnly),
            other => Err(ConvertError::InvalidConfig(format!(
                "Unknown conversion mode '{other}' (expected auto, text-only or ocr-only)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = ConversionConfig::default();
        assert_eq!(c.dpi, 300);
        assert_eq!(c.ocr_languages, "eng");
        assert_eq!(c.font_size_pt, 12);
        assert!(c.split_paragraphs);
    }

    #[test]
    fn builder_clamps_dpi_and_font() {
        let c = ConversionConfig::builder()
            .dpi(5000)
            .font_size_pt(1)
            .build()
            .unwrap();
        assert_eq!(c.dpi, 600);
        assert_eq!(c.font_size_pt, 6);
    }

    #[test]
    fn builder_joins_languages() {
        let c = ConversionConfig::builder()
            .ocr_languages(["eng", " ben ", ""])
            .build()
            .unwrap();
        assert_eq!(c.ocr_languages, "eng+ben");
    }

    #[test]
    fn builder_rejects_malformed_languages() {
        let err = ConversionConfig::builder()
            .ocr_language("eng; rm -rf")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConvertError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_missing_temp_dir() {
        let err = ConversionConfig::builder()
            .temp_dir("/definitely/not/a/dir")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn debug_redacts_password() {
        let c = ConversionConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
    }

    #[test]
    fn plan_table() {
        use Strategy::*;
        assert_eq!(ConversionMode::Auto.plan(), &[Structured, PerPage]);
        assert_eq!(ConversionMode::TextOnly.plan(), &[Structured]);
        assert_eq!(ConversionMode::OcrOnly.plan(), &[PerPage]);
    }

    #[test]
    fn labels_round_trip() {
        for mode in ConversionMode::ALL {
            assert_eq!(ConversionMode::from_label(mode.label()), Some(mode));
        }
        assert_eq!(ConversionMode::from_label("Something else"), None);
    }

    #[test]
    fn parse_names_and_aliases() {
        assert_eq!("auto".parse::<ConversionMode>().unwrap(), ConversionMode::Auto);
        assert_eq!("text".parse::<ConversionMode>().unwrap(), ConversionMode::TextOnly);
        assert_eq!("OCR-only".parse::<ConversionMode>().unwrap(), ConversionMode::OcrOnly);
        assert_eq!(
            "Scanned PDF with OCR".parse::<ConversionMode>().unwrap(),
            ConversionMode::OcrOnly
        );
        assert!("fast".parse::<ConversionMode>().is_err());
    }
}
