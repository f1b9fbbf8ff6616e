//! PDF access: open documents and expose their pages to the pipeline.
//!
//! The pipeline never talks to pdfium directly. It sees a [`PageSource`]
//! (page count, text layer, positioned text, rasterisation) handed out by a
//! [`DocumentBackend`]. [`PdfiumBackend`] is the real implementation; tests
//! plug in in-memory documents.
//!
//! ## Why a visitor instead of returning the document?
//!
//! A pdfium `PdfDocument` borrows the `Pdfium` bindings it was loaded with,
//! and pdfium is bound per operation on the worker thread (it is not safe to
//! share across threads). [`DocumentBackend::open`] therefore keeps both
//! alive for the duration of a callback; [`with_document`] wraps that in a
//! value-returning helper.

use crate::error::{ConvertError, PageError};
use crate::output::DocumentMetadata;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A run of text with its bounding box, in PDF points with a top-left origin
/// (`top < bottom`).
#[derive(Debug, Clone, PartialEq)]
pub struct TextSegment {
    pub text: String,
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl TextSegment {
    pub fn height(&self) -> f32 {
        (self.bottom - self.top).max(0.0)
    }
}

/// Read access to the pages of one opened PDF.
pub trait PageSource {
    fn page_count(&self) -> usize;

    /// The page's raw text layer. Image-only pages return an empty string.
    fn page_text(&self, index: usize) -> Result<String, PageError>;

    /// Positioned text segments of the page, in content-stream order.
    fn text_segments(&self, index: usize) -> Result<Vec<TextSegment>, PageError>;

    /// Whether the page draws any raster image (a scan, a photo).
    fn has_images(&self, index: usize) -> Result<bool, PageError>;

    /// Rasterise the page at `dpi`, with the longest edge capped at
    /// `max_pixels`.
    fn rasterize(&self, index: usize, dpi: u32, max_pixels: u32)
        -> Result<DynamicImage, PageError>;

    fn metadata(&self) -> DocumentMetadata;
}

/// Opens PDFs for the pipeline.
pub trait DocumentBackend: Send + Sync {
    /// Open `path` and call `visit` with the document. The document is only
    /// valid inside the callback.
    fn open(
        &self,
        path: &Path,
        password: Option<&str>,
        visit: &mut dyn FnMut(&dyn PageSource) -> Result<(), ConvertError>,
    ) -> Result<(), ConvertError>;
}

/// Open a document and run `f` on it, returning its result.
pub fn with_document<R>(
    backend: &dyn DocumentBackend,
    path: &Path,
    password: Option<&str>,
    f: impl FnOnce(&dyn PageSource) -> Result<R, ConvertError>,
) -> Result<R, ConvertError> {
    let mut f = Some(f);
    let mut out = None;
    backend.open(path, password, &mut |doc| {
        if let Some(f) = f.take() {
            out = Some(f(doc)?);
        }
        Ok(())
    })?;
    out.ok_or_else(|| ConvertError::Internal("document backend never opened the document".into()))
}

// ── pdfium ───────────────────────────────────────────────────────────────

/// [`DocumentBackend`] over the pdfium C library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumBackend {
    library_path: Option<PathBuf>,
}

impl PdfiumBackend {
    /// `library_path` may name the library file or the directory holding it.
    pub fn new(library_path: Option<PathBuf>) -> Self {
        Self { library_path }
    }
}

impl DocumentBackend for PdfiumBackend {
    fn open(
        &self,
        path: &Path,
        password: Option<&str>,
        visit: &mut dyn FnMut(&dyn PageSource) -> Result<(), ConvertError>,
    ) -> Result<(), ConvertError> {
        let pdfium = bind_pdfium(self.library_path.as_deref())?;
        let document = pdfium
            .load_pdf_from_file(path, password)
            .map_err(|e| map_load_error(path, password, e))?;

        let doc = PdfiumDocument { document };
        info!("PDF loaded: {} pages", doc.page_count());
        visit(&doc)
    }
}

/// Bind pdfium, from most-specific to least-specific location:
/// the explicit path, `PDFIUM_LIB_PATH`, the working directory, the system
/// library.
pub fn bind_pdfium(explicit: Option<&Path>) -> Result<Pdfium, ConvertError> {
    let env_path = std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from);
    let configured = explicit.map(Path::to_path_buf).or(env_path);

    let bindings = match configured {
        Some(p) => {
            let lib = if p.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&p)
            } else {
                p
            };
            debug!("Binding pdfium from {}", lib.display());
            Pdfium::bind_to_library(&lib).map_err(|e| {
                ConvertError::PdfiumBindingFailed(format!("{}: {:?}", lib.display(), e))
            })?
        }
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| ConvertError::PdfiumBindingFailed(format!("{:?}", e)))?,
    };

    Ok(Pdfium::new(bindings))
}

fn map_load_error(path: &Path, password: Option<&str>, e: PdfiumError) -> ConvertError {
    let err_str = format!("{:?}", e);
    if err_str.contains("Password") || err_str.contains("password") {
        if password.is_some() {
            ConvertError::WrongPassword {
                path: path.to_path_buf(),
            }
        } else {
            ConvertError::PasswordRequired {
                path: path.to_path_buf(),
            }
        }
    } else if err_str.contains("FileNotFound") || !path.exists() {
        ConvertError::FileNotFound {
            path: path.to_path_buf(),
        }
    } else {
        ConvertError::CorruptPdf {
            path: path.to_path_buf(),
            detail: err_str,
        }
    }
}

struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl<'a> PdfiumDocument<'a> {
    fn page(&self, index: usize) -> Result<PdfPage<'a>, String> {
        self.document
            .pages()
            .get(index as u16)
            .map_err(|e| format!("{:?}", e))
    }
}

impl PageSource for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page_text(&self, index: usize) -> Result<String, PageError> {
        let fail = |detail: String| PageError::ExtractionFailed {
            page: index + 1,
            detail,
        };
        let page = self.page(index).map_err(fail)?;
        let text = page.text().map_err(|e| fail(format!("{:?}", e)))?;
        Ok(text.all())
    }

    fn text_segments(&self, index: usize) -> Result<Vec<TextSegment>, PageError> {
        let fail = |detail: String| PageError::ExtractionFailed {
            page: index + 1,
            detail,
        };
        let page = self.page(index).map_err(fail)?;
        let page_height = page.height().value;
        let text = page.text().map_err(|e| fail(format!("{:?}", e)))?;

        let mut segments = Vec::new();
        for segment in text.segments().iter() {
            let content = segment.text();
            if content.trim().is_empty() {
                continue;
            }
            let bounds = segment.bounds();
            // pdfium uses a bottom-left origin; flip to top-left.
            let t = page_height - bounds.top().value;
            let b = page_height - bounds.bottom().value;
            segments.push(TextSegment {
                text: content,
                left: bounds.left().value,
                top: t.min(b),
                right: bounds.right().value,
                bottom: t.max(b),
            });
        }
        Ok(segments)
    }

    fn has_images(&self, index: usize) -> Result<bool, PageError> {
        let page = self
            .page(index)
            .map_err(|detail| PageError::ExtractionFailed {
                page: index + 1,
                detail,
            })?;
        let found = page
            .objects()
            .iter()
            .any(|object| object.object_type() == PdfPageObjectType::Image);
        Ok(found)
    }

    fn rasterize(
        &self,
        index: usize,
        dpi: u32,
        max_pixels: u32,
    ) -> Result<DynamicImage, PageError> {
        let fail = |detail: String| PageError::RenderFailed {
            page: index + 1,
            detail,
        };
        let page = self.page(index).map_err(fail)?;

        let (width, height) = raster_size(page.width().value, page.height().value, dpi, max_pixels);
        let render_config = PdfRenderConfig::new()
            .set_target_width(width)
            .set_target_height(height);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| fail(format!("{:?}", e)))?;
        let image = bitmap.as_image();
        debug!(
            "Rendered page {} at {} DPI → {}x{} px",
            index + 1,
            dpi,
            image.width(),
            image.height()
        );
        Ok(image)
    }

    fn metadata(&self) -> DocumentMetadata {
        let metadata = self.document.metadata();
        let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
            metadata.get(tag).and_then(|t| {
                let v = t.value().to_string();
                if v.is_empty() {
                    None
                } else {
                    Some(v)
                }
            })
        };

        DocumentMetadata {
            title: get_meta(PdfDocumentMetadataTagType::Title),
            author: get_meta(PdfDocumentMetadataTagType::Author),
            subject: get_meta(PdfDocumentMetadataTagType::Subject),
            creator: get_meta(PdfDocumentMetadataTagType::Creator),
            producer: get_meta(PdfDocumentMetadataTagType::Producer),
            page_count: self.page_count(),
            text_layer_pages: 0,
            pdf_version: format!("{:?}", self.document.version()),
        }
    }
}

/// Pixel size for a page of `width_pt × height_pt` points at `dpi`, scaled
/// down so neither edge exceeds `max_pixels`.
pub(crate) fn raster_size(width_pt: f32, height_pt: f32, dpi: u32, max_pixels: u32) -> (i32, i32) {
    let scale = dpi as f32 / 72.0;
    let mut w = (width_pt * scale).max(1.0);
    let mut h = (height_pt * scale).max(1.0);
    let longest = w.max(h);
    if longest > max_pixels as f32 {
        let shrink = max_pixels as f32 / longest;
        w *= shrink;
        h *= shrink;
    }
    (w.round().max(1.0) as i32, h.round().max(1.0) as i32)
}
