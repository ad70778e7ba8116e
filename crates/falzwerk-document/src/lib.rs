// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// falzwerk-document — The document transformation pipeline.
//
// Provides PDF operations (merge, split, compress, rotate, watermark,
// encrypt, decrypt, page extraction), conversions through pluggable
// capabilities (rasterisation, OCR, table detection, DOCX and PPTX output),
// and the dispatcher that validates and runs one request at a time.

pub mod capability;
pub mod convert;
pub mod dispatch;
pub mod image;
pub mod limits;
pub mod office;
pub mod pdf;
pub mod scan;

#[cfg(test)]
mod fixtures;

// Re-export the primary entry points so callers can use `falzwerk_document::Dispatcher` etc.
pub use capability::Capabilities;
pub use dispatch::{Artifact, Dispatcher, InputFile};
pub use image::RasterImage;
pub use limits::Deadline;
pub use pdf::{DocumentHandle, EncodeOptions, decode, encode};

#[cfg(feature = "ocr")]
pub use scan::ocr::OcrsRecognizer;

#[cfg(feature = "pdfium")]
pub use capability::pdfium::PdfiumRasterizer;
