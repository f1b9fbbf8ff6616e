//! Progress-callback trait for conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to observe a
//! job synchronously from the thread that runs it. Front ends that must not
//! touch their state from a worker thread should use
//! [`crate::task::ConversionTask`] instead, which forwards the same events
//! through a channel.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2docx::{ConversionProgressCallback, ConversionConfig, PageOrigin};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct OcrCounter {
//!     ocr_pages: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for OcrCounter {
//!     fn on_page_complete(&self, _page: usize, _total: usize, origin: PageOrigin) {
//!         if origin == PageOrigin::Ocr {
//!             self.ocr_pages.fetch_add(1, Ordering::SeqCst);
//!         }
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(OcrCounter { ocr_pages: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::config::Strategy;
use crate::output::PageOrigin;
use std::sync::Arc;

/// Called by the conversion pipeline as it works through a document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Methods are called from the worker thread.
pub trait ConversionProgressCallback: Send + Sync {
    /// A strategy is about to be attempted. Page numbering restarts with
    /// each strategy, so a fallback reports pages from 1 again.
    fn on_strategy_start(&self, strategy: Strategy) {
        let _ = strategy;
    }

    /// A strategy failed; the next one in the plan (if any) follows.
    fn on_strategy_failed(&self, strategy: Strategy, error: &str) {
        let _ = (strategy, error);
    }

    /// Called once the per-page loop knows how many pages it will process.
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called after each page has been appended to the document.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — total pages in the document
    /// * `origin`      — where the page's text came from
    fn on_page_complete(&self, page_num: usize, total_pages: usize, origin: PageOrigin) {
        let _ = (page_num, total_pages, origin);
    }

    /// Called when a page-local failure was absorbed into placeholder text.
    /// Followed by `on_page_complete` for the same page.
    fn on_page_recovered(&self, page_num: usize, total_pages: usize, reason: &str) {
        let _ = (page_num, total_pages, reason);
    }

    /// Called once after the last page, before the document is written.
    ///
    /// # Arguments
    /// * `total_pages` — pages processed
    /// * `ocr_pages`   — pages that needed OCR
    fn on_conversion_complete(&self, total_pages: usize, ocr_pages: usize) {
        let _ = (total_pages, ocr_pages);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

/// Forwards every event to each inner callback, in order.
pub(crate) struct FanOut<'a>(pub(crate) Vec<&'a dyn ConversionProgressCallback>);

impl ConversionProgressCallback for FanOut<'_> {
    fn on_strategy_start(&self, strategy: Strategy) {
        self.0.iter().for_each(|cb| cb.on_strategy_start(strategy));
    }

    fn on_strategy_failed(&self, strategy: Strategy, error: &str) {
        self.0.iter().for_each(|cb| cb.on_strategy_failed(strategy, error));
    }

    fn on_conversion_start(&self, total_pages: usize) {
        self.0.iter().for_each(|cb| cb.on_conversion_start(total_pages));
    }

    fn on_page_complete(&self, page_num: usize, total_pages: usize, origin: PageOrigin) {
        self.0
            .iter()
            .for_each(|cb| cb.on_page_complete(page_num, total_pages, origin));
    }

    fn on_page_recovered(&self, page_num: usize, total_pages: usize, reason: &str) {
        self.0
            .iter()
            .for_each(|cb| cb.on_page_recovered(page_num, total_pages, reason));
    }

    fn on_conversion_complete(&self, total_pages: usize, ocr_pages: usize) {
        self.0
            .iter()
            .for_each(|cb| cb.on_conversion_complete(total_pages, ocr_pages));
    }
}
