// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversion operations: pages to images and back, editable documents,
// slide decks, recognised text and extracted tables.
//
// Rendering is sequential because a raster session is tied to one thread.
// Recognition of the rendered pages runs on the rayon pool; every page is
// joined before the result is assembled.

pub mod outcome;

use falzwerk_core::error::{FalzwerkError, Result};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::capability::{Capabilities, Table};
use crate::image::RasterImage;
use crate::limits::Deadline;
use crate::office::PageTables;
use crate::pdf::DocumentHandle;
use crate::pdf::handle::encode_plain;
use crate::scan::prepare_for_recognition;

pub use crate::pdf::images_to_document;
pub use outcome::{PageFailure, PageOutcome, collect_pages};

/// Resolution assumed for uploaded images, so one pixel is one point.
pub const UPLOAD_DPI: u32 = 72;

/// Render every page, in order. A page that fails to render is returned as
/// an `Err` in its slot; only running out of time aborts.
fn render_pages(
    caps: &Capabilities,
    handle: &DocumentHandle,
    dpi: u32,
    deadline: &Deadline,
) -> Result<Vec<Result<RasterImage>>> {
    let rasterizer = caps.rasterizer()?;
    let bytes = encode_plain(handle)?;
    let session = rasterizer.open(&bytes)?;

    let count = handle.page_count();
    if session.page_count() != count {
        warn!(
            expected = count,
            rendered = session.page_count(),
            "Rasterizer sees a different page count"
        );
    }

    let mut pages = Vec::with_capacity(count);
    for index in 0..count {
        deadline.check(&format!("rendering page {}", index + 1))?;
        pages.push(
            session
                .render(index, dpi)
                .map(|image| RasterImage::new(index, image, dpi)),
        );
    }
    Ok(pages)
}

/// One image per page, in page order. Any page that cannot be rendered fails
/// the whole conversion, since the caller asked for exactly N images.
#[instrument(skip(caps, handle, deadline), fields(pages = handle.page_count()))]
pub fn to_images(
    caps: &Capabilities,
    handle: &DocumentHandle,
    dpi: u32,
    deadline: &Deadline,
) -> Result<Vec<RasterImage>> {
    let images = render_pages(caps, handle, dpi, deadline)?
        .into_iter()
        .collect::<Result<Vec<_>>>()?;
    info!(images = images.len(), dpi, "Pages rendered");
    Ok(images)
}

/// Decode uploaded raster images (PNG, JPEG, TIFF), keeping upload order.
pub fn decode_images(inputs: &[&[u8]]) -> Result<Vec<RasterImage>> {
    inputs
        .par_iter()
        .enumerate()
        .map(|(index, data)| RasterImage::decode(index, data, UPLOAD_DPI))
        .collect()
}

#[instrument(skip_all, fields(pages = handle.page_count()))]
pub fn to_editable_document(caps: &Capabilities, handle: &DocumentHandle) -> Result<Vec<u8>> {
    let encoder = caps.editable_encoder()?;
    let bytes = encoder.encode(handle)?;
    info!(encoder = encoder.name(), bytes = bytes.len(), "Editable document written");
    Ok(bytes)
}

/// Render the pages, then one slide per page image.
#[instrument(skip(caps, handle, deadline), fields(pages = handle.page_count()))]
pub fn to_slides(
    caps: &Capabilities,
    handle: &DocumentHandle,
    dpi: u32,
    deadline: &Deadline,
) -> Result<Vec<u8>> {
    let encoder = caps.slide_encoder()?;
    let images = to_images(caps, handle, dpi, deadline)?;
    deadline.check("building slides")?;
    let bytes = encoder.encode(&images)?;
    info!(slides = images.len(), bytes = bytes.len(), "Slide deck written");
    Ok(bytes)
}

/// Recognised text of one page, as serialised in the OCR result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageText {
    /// 1-based page number.
    pub page: usize,
    pub text: String,
    pub failure: Option<String>,
}

/// All recognised text. `text` joins the pages with blank lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedText {
    pub pages: Vec<PageText>,
    pub text: String,
}

impl ExtractedText {
    fn from_outcomes(outcomes: Vec<PageOutcome<String>>) -> Self {
        let text = outcomes
            .iter()
            .map(|o| o.value.trim_end())
            .collect::<Vec<_>>()
            .join("\n\n");
        let pages = outcomes
            .into_iter()
            .map(|o| PageText {
                page: o.page + 1,
                text: o.value,
                failure: o.failure.map(|f| f.message),
            })
            .collect();
        Self { pages, text }
    }

    pub fn failed_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.failure.is_some()).count()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TextOptions {
    pub dpi: u32,
    /// Binarise each page image before recognition.
    pub binarize: bool,
}

/// Optical text recognition over every page. Pages that fail to render or
/// recognise come back empty with the reason attached.
#[instrument(skip(caps, handle, deadline), fields(pages = handle.page_count()))]
pub fn extract_text(
    caps: &Capabilities,
    handle: &DocumentHandle,
    options: TextOptions,
    deadline: &Deadline,
) -> Result<ExtractedText> {
    let recognizer = caps.recognizer()?;
    let rendered = render_pages(caps, handle, options.dpi, deadline)?;

    let results: Vec<Result<String>> = rendered
        .into_par_iter()
        .map(|page| {
            let page = page?;
            deadline.check(&format!("recognising page {}", page.index + 1))?;
            if options.binarize {
                recognizer.recognize(&prepare_for_recognition(&page.image))
            } else {
                recognizer.recognize(&page.image)
            }
        })
        .collect();

    let extracted = ExtractedText::from_outcomes(collect_pages("text recognition", results)?);
    info!(
        pages = extracted.pages.len(),
        failed = extracted.failed_pages(),
        chars = extracted.text.len(),
        "Text extracted"
    );
    Ok(extracted)
}

/// Table detection over every page. A page without tables is an empty,
/// successful entry.
#[instrument(skip(caps, handle, deadline), fields(pages = handle.page_count()))]
pub fn extract_tables(
    caps: &Capabilities,
    handle: &DocumentHandle,
    deadline: &Deadline,
) -> Result<Vec<PageTables>> {
    let detector = caps.table_detector()?;

    let pages = handle.pages();
    let mut results: Vec<Result<Vec<Table>>> = Vec::with_capacity(pages.len());
    for page in &pages {
        deadline.check(&format!("detecting tables on page {}", page.index + 1))?;
        results.push(detector.detect(handle, page));
    }

    let pages: Vec<PageTables> = collect_pages("table detection", results)?
        .into_iter()
        .map(|o| PageTables { page: o.page, tables: o.value })
        .collect();
    let total: usize = pages.iter().map(|p| p.tables.len()).sum();
    info!(pages = pages.len(), tables = total, "Tables extracted");
    Ok(pages)
}

/// Reject a resolution the engine will not render at.
pub fn check_dpi(dpi: u32, max_dpi: u32) -> Result<u32> {
    if dpi == 0 || dpi > max_dpi {
        return Err(FalzwerkError::InvalidParameter(format!(
            "dpi must be between 1 and {max_dpi}, got {dpi}"
        )));
    }
    Ok(dpi)
}
