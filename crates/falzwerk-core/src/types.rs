// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Falzwerk document engine.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FalzwerkError, Result};

/// Opaque, request-scoped identifier. Internal addressing never uses
/// client-supplied filenames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a single dispatched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestState {
    Received,
    Validated,
    Executing,
    Completed,
    Failed,
}

impl RequestState {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: RequestState) -> bool {
        matches!(
            (self, next),
            (Self::Received, Self::Validated)
                | (Self::Received, Self::Failed)
                | (Self::Validated, Self::Executing)
                | (Self::Validated, Self::Failed)
                | (Self::Executing, Self::Completed)
                | (Self::Executing, Self::Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// File types the engine reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    Pdf,
    Jpeg,
    Png,
    Tiff,
    Docx,
    Pptx,
    Xlsx,
    Csv,
    Json,
    Zip,
}

impl DocumentType {
    /// MIME type for this document format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Tiff => "image/tiff",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Csv => "text/csv",
            Self::Json => "application/json",
            Self::Zip => "application/zip",
        }
    }

    /// Canonical file extension (without the dot).
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Tiff => "tiff",
            Self::Docx => "docx",
            Self::Pptx => "pptx",
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Zip => "zip",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "tif" | "tiff" => Some(Self::Tiff),
            "docx" => Some(Self::Docx),
            "pptx" => Some(Self::Pptx),
            "xlsx" => Some(Self::Xlsx),
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            "zip" => Some(Self::Zip),
            _ => None,
        }
    }

    /// Identify an input by its leading bytes. Only the formats accepted as
    /// uploads are recognised.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        // PDF headers may be preceded by junk; readers accept it within 1 KiB.
        let head = &bytes[..bytes.len().min(1024)];
        if head.windows(5).any(|w| w == b"%PDF-") {
            return Some(Self::Pdf);
        }
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }
        if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            return Some(Self::Png);
        }
        if bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*") {
            return Some(Self::Tiff);
        }
        None
    }

    pub fn is_raster_image(&self) -> bool {
        matches!(self, Self::Jpeg | Self::Png | Self::Tiff)
    }
}

/// Page rotation, always one of 0, 90, 180 or 270 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rotation(u16);

impl Rotation {
    pub const NONE: Rotation = Rotation(0);

    /// Normalise a requested rotation (`degrees mod 360`), rejecting values
    /// that are not multiples of 90.
    pub fn normalize(degrees: i64) -> Result<Self> {
        if degrees % 90 != 0 {
            return Err(FalzwerkError::InvalidParameter(format!(
                "rotation must be a multiple of 90, got {degrees}"
            )));
        }
        Ok(Self(degrees.rem_euclid(360) as u16))
    }

    /// Interpret a stored `/Rotate` value leniently: PDF writers in the wild
    /// emit negatives and values above 360.
    pub fn from_stored(value: i64) -> Self {
        let snapped = (value.rem_euclid(360) + 45) / 90 * 90;
        Self((snapped % 360) as u16)
    }

    pub fn degrees(self) -> u16 {
        self.0
    }

    /// Cumulative rotation: `(self + other) mod 360`.
    pub fn add(self, other: Rotation) -> Self {
        Self((self.0 + other.0) % 360)
    }
}

impl std::fmt::Display for Rotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.0)
    }
}

/// Which pages an operation applies to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageSelection {
    #[default]
    All,
    /// Zero-based inclusive ranges, sorted and non-overlapping. A range is
    /// never expanded before it is checked against a document.
    Ranges(Vec<(usize, usize)>),
}

impl PageSelection {
    pub fn indices(indices: impl IntoIterator<Item = usize>) -> Self {
        Self::from_ranges(indices.into_iter().map(|i| (i, i)).collect())
    }

    fn from_ranges(mut ranges: Vec<(usize, usize)>) -> Self {
        if ranges.is_empty() {
            return Self::All;
        }
        ranges.sort_unstable();
        let mut merged: Vec<(usize, usize)> = Vec::with_capacity(ranges.len());
        for (start, end) in ranges {
            match merged.last_mut() {
                Some(last) if start <= last.1.saturating_add(1) => last.1 = last.1.max(end),
                _ => merged.push((start, end)),
            }
        }
        Self::Ranges(merged)
    }

    /// Parse a human page range such as `"1-3, 5, 8-10"`. Page numbers are
    /// 1-based as users see them; the result holds zero-based indices. An
    /// empty string selects every page.
    pub fn parse(input: &str) -> Result<Self> {
        let mut ranges = Vec::new();

        for part in input.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            if let Some((start, end)) = part.split_once('-') {
                let start = parse_page_number(start)?;
                let end = parse_page_number(end)?;
                if start > end {
                    return Err(FalzwerkError::InvalidParameter(format!(
                        "page range start {start} is after end {end}"
                    )));
                }
                ranges.push((start - 1, end - 1));
            } else {
                let page = parse_page_number(part)? - 1;
                ranges.push((page, page));
            }
        }

        Ok(Self::from_ranges(ranges))
    }

    /// Resolve against a document with `page_count` pages, returning sorted
    /// zero-based indices.
    pub fn resolve(&self, page_count: usize) -> Result<Vec<usize>> {
        match self {
            Self::All => Ok((0..page_count).collect()),
            Self::Ranges(ranges) => {
                if let Some(&(start, _)) = ranges.iter().find(|&&(_, end)| end >= page_count) {
                    return Err(FalzwerkError::InvalidParameter(format!(
                        "page {} does not exist (document has {} pages)",
                        start.max(page_count) + 1,
                        page_count
                    )));
                }
                Ok(ranges.iter().flat_map(|&(start, end)| start..=end).collect())
            }
        }
    }
}

fn parse_page_number(raw: &str) -> Result<usize> {
    let raw = raw.trim();
    let page: usize = raw
        .parse()
        .map_err(|_| FalzwerkError::InvalidParameter(format!("invalid page number: {raw:?}")))?;
    if page == 0 {
        return Err(FalzwerkError::InvalidParameter(
            "page numbers start at 1".into(),
        ));
    }
    Ok(page)
}

/// Appearance of a text watermark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkStyle {
    /// Counter-clockwise angle of the text baseline in degrees.
    pub angle_degrees: f32,
    /// Fill opacity, 0.0 (invisible) to 1.0 (opaque).
    pub opacity: f32,
    /// Font size in points.
    pub font_size: f32,
    /// Grey level of the fill, 0.0 (black) to 1.0 (white).
    pub gray: f32,
}

impl Default for WatermarkStyle {
    fn default() -> Self {
        Self {
            angle_degrees: 45.0,
            opacity: 0.3,
            font_size: 40.0,
            gray: 0.7,
        }
    }
}

impl WatermarkStyle {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(FalzwerkError::InvalidParameter(format!(
                "opacity must be between 0 and 1, got {}",
                self.opacity
            )));
        }
        if !(self.font_size > 0.0 && self.font_size <= 500.0) {
            return Err(FalzwerkError::InvalidParameter(format!(
                "font size must be in (0, 500], got {}",
                self.font_size
            )));
        }
        if !self.angle_degrees.is_finite() {
            return Err(FalzwerkError::InvalidParameter(
                "watermark angle must be finite".into(),
            ));
        }
        Ok(())
    }
}

/// A password. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Raster output encodings for page images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageOutputFormat {
    #[default]
    Jpeg,
    Png,
}

impl ImageOutputFormat {
    pub fn document_type(self) -> DocumentType {
        match self {
            Self::Jpeg => DocumentType::Jpeg,
            Self::Png => DocumentType::Png,
        }
    }
}

impl FromStr for ImageOutputFormat {
    type Err = FalzwerkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            other => Err(FalzwerkError::InvalidParameter(format!(
                "unknown image format {other:?} (expected jpeg or png)"
            ))),
        }
    }
}

/// Serialisation of extracted tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TableFormat {
    #[default]
    Xlsx,
    Csv,
}

impl FromStr for TableFormat {
    type Err = FalzwerkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "xlsx" | "excel" => Ok(Self::Xlsx),
            "csv" => Ok(Self::Csv),
            other => Err(FalzwerkError::InvalidParameter(format!(
                "unknown table format {other:?} (expected xlsx or csv)"
            ))),
        }
    }
}

/// The closed set of operations the engine performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    Merge,
    Split,
    Compress,
    Rotate,
    Watermark,
    Encrypt,
    Decrypt,
    ExtractPages,
    ToImages,
    ImagesToPdf,
    ToDocx,
    ToPptx,
    Ocr,
    ExtractTables,
}

impl Operation {
    pub const ALL: [Operation; 14] = [
        Self::Merge,
        Self::Split,
        Self::Compress,
        Self::Rotate,
        Self::Watermark,
        Self::Encrypt,
        Self::Decrypt,
        Self::ExtractPages,
        Self::ToImages,
        Self::ImagesToPdf,
        Self::ToDocx,
        Self::ToPptx,
        Self::Ocr,
        Self::ExtractTables,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Split => "split",
            Self::Compress => "compress",
            Self::Rotate => "rotate",
            Self::Watermark => "watermark",
            Self::Encrypt => "encrypt",
            Self::Decrypt => "decrypt",
            Self::ExtractPages => "extract-pages",
            Self::ToImages => "to-images",
            Self::ImagesToPdf => "images-to-pdf",
            Self::ToDocx => "to-docx",
            Self::ToPptx => "to-pptx",
            Self::Ocr => "ocr",
            Self::ExtractTables => "extract-tables",
        }
    }

    /// Whether the operation takes several inputs.
    pub fn accepts_multiple_inputs(&self) -> bool {
        matches!(self, Self::Merge | Self::ImagesToPdf)
    }

    /// Input types the operation accepts.
    pub fn accepted_inputs(&self) -> &'static [DocumentType] {
        match self {
            Self::ImagesToPdf => &[DocumentType::Jpeg, DocumentType::Png, DocumentType::Tiff],
            _ => &[DocumentType::Pdf],
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = FalzwerkError;

    /// Accepts canonical names and the legacy route names used by the web UI.
    fn from_str(s: &str) -> Result<Self> {
        let normalised = s.trim().to_ascii_lowercase().replace('_', "-");
        let op = match normalised.as_str() {
            "merge" => Self::Merge,
            "split" => Self::Split,
            "compress" => Self::Compress,
            "rotate" => Self::Rotate,
            "watermark" => Self::Watermark,
            "encrypt" | "protect" => Self::Encrypt,
            "decrypt" | "unlock" => Self::Decrypt,
            "extract-pages" | "extract" => Self::ExtractPages,
            "to-images" | "pdf2jpg" | "pdf2img" => Self::ToImages,
            "images-to-pdf" | "jpg2pdf" | "img2pdf" => Self::ImagesToPdf,
            "to-docx" | "pdf2docx" => Self::ToDocx,
            "to-pptx" | "pdf2pptx" => Self::ToPptx,
            "ocr" | "extract-text" => Self::Ocr,
            "extract-tables" | "pdf2excel" => Self::ExtractTables,
            _ => {
                return Err(FalzwerkError::InvalidParameter(format!(
                    "unknown operation {s:?}"
                )));
            }
        };
        Ok(op)
    }
}
