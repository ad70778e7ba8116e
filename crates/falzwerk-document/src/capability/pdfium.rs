// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDFium-backed page rasterizer (feature `pdfium`).
//
// The shared library is bound once at startup. Search order: the configured
// directory, the executable's directory, then the system library path.

use std::path::Path;

use falzwerk_core::error::{FalzwerkError, Result};
use image::{DynamicImage, RgbaImage};
use pdfium_render::prelude::*;
use tracing::{debug, info, instrument};

use super::{RasterSession, Rasterizer};

pub struct PdfiumRasterizer {
    pdfium: Pdfium,
}

impl PdfiumRasterizer {
    pub fn bind(library_dir: Option<&Path>) -> Result<Self> {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|path| path.parent().map(Path::to_path_buf));

        let candidates = library_dir.map(Path::to_path_buf).into_iter().chain(exe_dir);
        for dir in candidates {
            if let Ok(bindings) =
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&dir))
            {
                info!(dir = %dir.display(), "PDFium bound");
                return Ok(Self { pdfium: Pdfium::new(bindings) });
            }
        }

        let bindings = Pdfium::bind_to_system_library().map_err(|err| {
            FalzwerkError::CapabilityUnavailable(format!("cannot load the PDFium library: {err}"))
        })?;
        info!("PDFium bound from system library path");
        Ok(Self { pdfium: Pdfium::new(bindings) })
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn name(&self) -> &str {
        "pdfium"
    }

    fn open<'a>(&'a self, pdf: &[u8]) -> Result<Box<dyn RasterSession + 'a>> {
        let document = self
            .pdfium
            .load_pdf_from_byte_vec(pdf.to_vec(), None)
            .map_err(|err| FalzwerkError::Corrupt(format!("PDFium cannot load document: {err}")))?;
        Ok(Box::new(PdfiumSession { document }))
    }
}

struct PdfiumSession<'a> {
    document: PdfDocument<'a>,
}

impl RasterSession for PdfiumSession<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    #[instrument(skip(self))]
    fn render(&self, index: usize, dpi: u32) -> Result<DynamicImage> {
        let page_index = u16::try_from(index).map_err(|_| {
            FalzwerkError::ResourceExhausted(format!("page {} is beyond the renderer's range", index + 1))
        })?;
        let page = self
            .document
            .pages()
            .get(page_index)
            .map_err(|err| FalzwerkError::Corrupt(format!("cannot open page {}: {err}", index + 1)))?;

        let width_px = (page.width().value / 72.0 * dpi as f32).round().max(1.0) as i32;
        let config = PdfRenderConfig::new().set_target_width(width_px);
        let bitmap = page
            .render_with_config(&config)
            .map_err(|err| FalzwerkError::Corrupt(format!("cannot render page {}: {err}", index + 1)))?;

        let (width, height) = (bitmap.width() as u32, bitmap.height() as u32);
        let rgba = RgbaImage::from_raw(width, height, bitmap.as_rgba_bytes().to_vec()).ok_or_else(|| {
            FalzwerkError::ImageError(format!("page {} bitmap has unexpected size", index + 1))
        })?;
        debug!(width, height, "Page rendered");
        Ok(DynamicImage::ImageRgba8(rgba))
    }
}
