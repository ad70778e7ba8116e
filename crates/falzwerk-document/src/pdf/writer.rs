// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — build a new PDF from raster images using `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: each page is a `PdfPage` holding a
// `Vec<Op>`, and the document is serialised once via `PdfDocument::save()`.

use falzwerk_core::error::{FalzwerkError, Result};
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use tracing::{debug, info, instrument};

use super::handle::{DocumentHandle, decode};
use crate::image::RasterImage;

/// Title written into the document information dictionary.
const DOCUMENT_TITLE: &str = "Converted images";

/// One page per image, in the order given. Each page has the image's own
/// physical size, so the page aspect ratio matches the image exactly.
#[instrument(skip_all, fields(images = images.len()))]
pub fn images_to_document(images: &[RasterImage]) -> Result<DocumentHandle> {
    if images.is_empty() {
        return Err(FalzwerkError::InvalidParameter(
            "at least one image is required".into(),
        ));
    }

    let mut doc = PdfDocument::new(DOCUMENT_TITLE);
    let mut pages = Vec::with_capacity(images.len());

    for raster in images {
        let rgb = raster.image.to_rgb8();
        let (width, height) = rgb.dimensions();
        let raw = RawImage {
            pixels: RawImageData::U8(rgb.into_raw()),
            width: width as usize,
            height: height as usize,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };
        let xobject_id = doc.add_image(&raw);

        let (width_pt, height_pt) = raster.size_pt();
        let ops = vec![Op::UseXobject {
            id: xobject_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(0.0)),
                translate_y: Some(Pt(0.0)),
                scale_x: Some(1.0),
                scale_y: Some(1.0),
                dpi: Some(raster.dpi.max(1) as f32),
                rotate: None,
            },
        }];
        pages.push(PdfPage::new(pt_to_mm(width_pt), pt_to_mm(height_pt), ops));
        debug!(index = raster.index, width, height, width_pt, height_pt, "Image page laid out");
    }

    doc.with_pages(pages);

    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
    if !warnings.is_empty() {
        debug!(warnings = warnings.len(), "printpdf reported warnings");
    }

    info!(pages = images.len(), bytes = bytes.len(), "Images converted to PDF");
    decode(&bytes, None)
}

fn pt_to_mm(pt: f32) -> Mm {
    Mm(pt * 25.4 / 72.0)
}
