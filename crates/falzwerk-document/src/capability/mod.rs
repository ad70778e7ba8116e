// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capability interfaces and the registry resolved once at startup.
//
// The engine itself never rasterises, recognises text or lays out office
// documents. Each of those jobs sits behind a trait here; `Capabilities`
// records which implementations were found, so a missing one surfaces as
// `CapabilityUnavailable` at request time instead of a crash.

pub mod builtin;
#[cfg(feature = "pdfium")]
pub mod pdfium;
pub mod tables;

use std::sync::Arc;

use falzwerk_core::config::EngineConfig;
use falzwerk_core::DocumentType;
use falzwerk_core::error::{FalzwerkError, Result};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::image::RasterImage;
use crate::pdf::{DocumentHandle, Page};

pub use builtin::{DocxEncoder, PptxEncoder};
pub use tables::StreamTableDetector;

/// A table as rows of cell text. Rows may differ in length.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

/// Turns encoded PDF bytes into page bitmaps.
pub trait Rasterizer: Send + Sync {
    fn name(&self) -> &str;

    /// Load a document for rendering. The session lives no longer than the
    /// rasterizer that opened it.
    fn open<'a>(&'a self, pdf: &[u8]) -> Result<Box<dyn RasterSession + 'a>>;
}

/// A document loaded by a [`Rasterizer`].
pub trait RasterSession {
    fn page_count(&self) -> usize;

    /// Render page `index` (zero-based) at `dpi`.
    fn render(&self, index: usize, dpi: u32) -> Result<DynamicImage>;
}

/// Optical text recognition.
///
/// Low-confidence input yields empty or partial text, not an error. Errors
/// are reserved for images the engine cannot process at all.
pub trait TextRecognizer: Send + Sync {
    fn name(&self) -> &str;
    fn recognize(&self, image: &DynamicImage) -> Result<String>;
}

/// Finds tables on one page of a decoded document. `page` comes from
/// [`DocumentHandle::pages`], so the page tree is walked once per document.
pub trait TableDetector: Send + Sync {
    fn name(&self) -> &str;
    fn detect(&self, handle: &DocumentHandle, page: &Page) -> Result<Vec<Table>>;
}

/// Converts a document into an editable word-processor file.
pub trait EditableEncoder: Send + Sync {
    fn name(&self) -> &str;
    fn content_type(&self) -> DocumentType;
    fn encode(&self, handle: &DocumentHandle) -> Result<Vec<u8>>;
}

/// Lays page images out as a slide deck, one slide per image.
pub trait SlideEncoder: Send + Sync {
    fn name(&self) -> &str;
    fn encode(&self, slides: &[RasterImage]) -> Result<Vec<u8>>;
}

/// Which implementation backs each capability, for logs and `--capabilities`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySummary {
    pub rasterizer: Option<String>,
    pub recognizer: Option<String>,
    pub table_detector: Option<String>,
    pub editable_encoder: Option<String>,
    pub slide_encoder: Option<String>,
}

/// The set of capabilities available to the dispatcher.
#[derive(Clone, Default)]
pub struct Capabilities {
    rasterizer: Option<Arc<dyn Rasterizer>>,
    recognizer: Option<Arc<dyn TextRecognizer>>,
    table_detector: Option<Arc<dyn TableDetector>>,
    editable_encoder: Option<Arc<dyn EditableEncoder>>,
    slide_encoder: Option<Arc<dyn SlideEncoder>>,
}

impl Capabilities {
    /// An empty registry. Operations that need a capability will fail.
    pub fn none() -> Self {
        Self::default()
    }

    /// Detect every capability this build supports.
    pub fn detect(config: &EngineConfig) -> Self {
        let mut caps = Self::none()
            .with_editable_encoder(Arc::new(DocxEncoder))
            .with_slide_encoder(Arc::new(PptxEncoder::new(config.render.jpeg_quality)));

        if config.capabilities.enable_tables {
            caps = caps.with_table_detector(Arc::new(StreamTableDetector::default()));
        }

        #[cfg(feature = "pdfium")]
        {
            let library_dir = config.capabilities.pdfium_library_dir.as_deref();
            match pdfium::PdfiumRasterizer::bind(library_dir) {
                Ok(rasterizer) => caps = caps.with_rasterizer(Arc::new(rasterizer)),
                Err(err) => warn!(error = %err, "PDFium not available; page rendering disabled"),
            }
        }

        #[cfg(feature = "ocr")]
        {
            let ocr_config = match &config.capabilities.ocr_model_dir {
                Some(dir) => crate::scan::ocr::OcrConfig::from_dir(dir),
                None => crate::scan::ocr::OcrConfig::default(),
            };
            match crate::scan::ocr::OcrsRecognizer::new(ocr_config) {
                Ok(recognizer) => caps = caps.with_recognizer(Arc::new(recognizer)),
                Err(err) => warn!(error = %err, "OCR models not available; text recognition disabled"),
            }
        }

        let summary = caps.summary();
        info!(
            rasterizer = summary.rasterizer.as_deref().unwrap_or("-"),
            recognizer = summary.recognizer.as_deref().unwrap_or("-"),
            table_detector = summary.table_detector.as_deref().unwrap_or("-"),
            "Capabilities resolved"
        );
        if summary.rasterizer.is_none() {
            warn!("No rasterizer: to-images, to-pptx and ocr will report capability_unavailable");
        }
        caps
    }

    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    pub fn with_recognizer(mut self, recognizer: Arc<dyn TextRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    pub fn with_table_detector(mut self, detector: Arc<dyn TableDetector>) -> Self {
        self.table_detector = Some(detector);
        self
    }

    pub fn with_editable_encoder(mut self, encoder: Arc<dyn EditableEncoder>) -> Self {
        self.editable_encoder = Some(encoder);
        self
    }

    pub fn with_slide_encoder(mut self, encoder: Arc<dyn SlideEncoder>) -> Self {
        self.slide_encoder = Some(encoder);
        self
    }

    pub fn rasterizer(&self) -> Result<&dyn Rasterizer> {
        self.rasterizer.as_deref().ok_or_else(|| missing("page rasterizer"))
    }

    pub fn recognizer(&self) -> Result<&dyn TextRecognizer> {
        self.recognizer.as_deref().ok_or_else(|| missing("text recognizer"))
    }

    pub fn table_detector(&self) -> Result<&dyn TableDetector> {
        self.table_detector.as_deref().ok_or_else(|| missing("table detector"))
    }

    pub fn editable_encoder(&self) -> Result<&dyn EditableEncoder> {
        self.editable_encoder.as_deref().ok_or_else(|| missing("editable document encoder"))
    }

    pub fn slide_encoder(&self) -> Result<&dyn SlideEncoder> {
        self.slide_encoder.as_deref().ok_or_else(|| missing("slide encoder"))
    }

    pub fn summary(&self) -> CapabilitySummary {
        CapabilitySummary {
            rasterizer: self.rasterizer.as_ref().map(|c| c.name().to_owned()),
            recognizer: self.recognizer.as_ref().map(|c| c.name().to_owned()),
            table_detector: self.table_detector.as_ref().map(|c| c.name().to_owned()),
            editable_encoder: self.editable_encoder.as_ref().map(|c| c.name().to_owned()),
            slide_encoder: self.slide_encoder.as_ref().map(|c| c.name().to_owned()),
        }
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Capabilities").field(&self.summary()).finish()
    }
}

fn missing(what: &str) -> FalzwerkError {
    FalzwerkError::CapabilityUnavailable(format!("no {what} is configured"))
}
