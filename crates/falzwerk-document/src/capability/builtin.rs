// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Office encoders that ship with the engine.

use falzwerk_core::DocumentType;
use falzwerk_core::error::Result;
use rayon::prelude::*;
use tracing::{instrument, warn};

use super::{EditableEncoder, SlideEncoder};
use crate::image::RasterImage;
use crate::office::{write_docx, write_pptx};
use crate::pdf::DocumentHandle;
use crate::pdf::text::{group_lines, page_runs};
use crate::pdf::tree::page_ids;

/// Baselines closer than this (in points) are treated as one line.
const LINE_TOLERANCE: f32 = 3.0;

/// Rebuilds the text layer of each page as DOCX paragraphs.
///
/// Only text that the PDF actually carries is recovered; scanned pages come
/// out blank. Page order is kept and pages are separated by page breaks.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxEncoder;

impl EditableEncoder for DocxEncoder {
    fn name(&self) -> &str {
        "docx"
    }

    fn content_type(&self) -> DocumentType {
        DocumentType::Docx
    }

    #[instrument(skip_all, fields(pages = handle.page_count()))]
    fn encode(&self, handle: &DocumentHandle) -> Result<Vec<u8>> {
        let doc = handle.document();
        let pages: Vec<Vec<String>> = page_ids(doc)
            .into_iter()
            .enumerate()
            .map(|(index, page_id)| match page_runs(doc, page_id) {
                Ok(runs) => group_lines(runs, LINE_TOLERANCE)
                    .iter()
                    .map(|line| line.text())
                    .collect(),
                Err(err) => {
                    warn!(page = index, error = %err, "Page text unreadable; leaving page blank");
                    Vec::new()
                }
            })
            .collect();
        write_docx(&pages)
    }
}

/// One JPEG slide per page image.
#[derive(Debug, Clone, Copy)]
pub struct PptxEncoder {
    jpeg_quality: u8,
}

impl PptxEncoder {
    pub fn new(jpeg_quality: u8) -> Self {
        Self { jpeg_quality: jpeg_quality.clamp(1, 100) }
    }
}

impl SlideEncoder for PptxEncoder {
    fn name(&self) -> &str {
        "pptx"
    }

    #[instrument(skip_all, fields(slides = slides.len()))]
    fn encode(&self, slides: &[RasterImage]) -> Result<Vec<u8>> {
        let jpegs = slides
            .par_iter()
            .map(|slide| slide.to_jpeg(self.jpeg_quality))
            .collect::<Result<Vec<_>>>()?;
        write_pptx(&jpegs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use image::{DynamicImage, RgbImage};
    use std::io::{Cursor, Read};

    fn unzip(bytes: Vec<u8>, name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut text = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut text).unwrap();
        text
    }

    #[test]
    fn docx_keeps_page_text_in_order() {
        let handle = fixtures::handle(3, "D");
        let xml = unzip(DocxEncoder.encode(&handle).unwrap(), "word/document.xml");
        let positions: Vec<usize> = ["D-1", "D-2", "D-3"]
            .iter()
            .map(|label| xml.find(label).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(xml.matches("w:type=\"page\"").count(), 2);
    }

    #[test]
    fn pptx_has_one_slide_per_image() {
        let slides: Vec<RasterImage> = (0..2)
            .map(|i| RasterImage::new(i, DynamicImage::ImageRgb8(RgbImage::new(8, 6)), 72))
            .collect();
        let bytes = PptxEncoder::new(80).encode(&slides).unwrap();
        let presentation = unzip(bytes, "ppt/presentation.xml");
        assert_eq!(presentation.matches("<p:sldId ").count(), 2);
    }
}
