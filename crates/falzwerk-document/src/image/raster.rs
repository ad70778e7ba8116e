// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster images flowing through conversions: decoded uploads on the way into
// a PDF, rendered pages on the way out. Uses the `image` crate codecs.

use std::io::Cursor;

use falzwerk_core::error::{FalzwerkError, Result};
use falzwerk_core::ImageOutputFormat;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use tracing::{debug, instrument};

/// One raster image with the resolution it was produced or is placed at.
///
/// Lives only for the conversion that created it.
#[derive(Debug, Clone)]
pub struct RasterImage {
    /// Zero-based position in the sequence (page index or upload order).
    pub index: usize,
    pub image: DynamicImage,
    pub dpi: u32,
}

impl RasterImage {
    pub fn new(index: usize, image: DynamicImage, dpi: u32) -> Self {
        Self { index, image, dpi }
    }

    /// Decode an uploaded PNG, JPEG or TIFF.
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn decode(index: usize, data: &[u8], dpi: u32) -> Result<Self> {
        let format = image::guess_format(data).map_err(|err| {
            FalzwerkError::UnsupportedFormat(format!("image #{} is not recognised: {err}", index + 1))
        })?;
        if !matches!(format, ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Tiff) {
            return Err(FalzwerkError::UnsupportedFormat(format!(
                "image #{} is {format:?}; expected PNG, JPEG or TIFF",
                index + 1
            )));
        }

        let image = image::load_from_memory_with_format(data, format).map_err(|err| {
            FalzwerkError::ImageError(format!("failed to decode image #{}: {err}", index + 1))
        })?;
        debug!(width = image.width(), height = image.height(), ?format, "Image decoded");
        Ok(Self { index, image, dpi })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Physical size in PDF points at the image's resolution.
    pub fn size_pt(&self) -> (f32, f32) {
        let dpi = self.dpi.max(1) as f32;
        (
            self.width() as f32 / dpi * 72.0,
            self.height() as f32 / dpi * 72.0,
        )
    }

    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .map_err(|err| FalzwerkError::ImageError(format!("PNG encoding failed: {err}")))?;
        Ok(buffer)
    }

    /// JPEG at `quality` (1-100). Alpha is dropped.
    pub fn to_jpeg(&self, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
        self.image
            .to_rgb8()
            .write_with_encoder(encoder)
            .map_err(|err| FalzwerkError::ImageError(format!("JPEG encoding failed: {err}")))?;
        Ok(buffer)
    }

    pub fn encode(&self, format: ImageOutputFormat, jpeg_quality: u8) -> Result<Vec<u8>> {
        match format {
            ImageOutputFormat::Jpeg => self.to_jpeg(jpeg_quality),
            ImageOutputFormat::Png => self.to_png(),
        }
    }

    /// File name for this image inside an archive, numbered from one.
    pub fn file_name(&self, format: ImageOutputFormat) -> String {
        format!(
            "page_{}.{}",
            self.index + 1,
            format.document_type().extension()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn sample(width: u32, height: u32) -> RasterImage {
        let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x * 8) as u8, (y * 8) as u8, 128]));
        RasterImage::new(0, DynamicImage::ImageRgb8(img), 72)
    }

    #[test]
    fn png_round_trip_keeps_dimensions() {
        let png = sample(20, 10).to_png().unwrap();
        let back = RasterImage::decode(3, &png, 150).unwrap();
        assert_eq!((back.width(), back.height()), (20, 10));
        assert_eq!(back.index, 3);
    }

    #[test]
    fn jpeg_output_has_jpeg_signature() {
        let jpeg = sample(16, 16).to_jpeg(80).unwrap();
        assert_eq!(&jpeg[..3], &[0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn size_follows_dpi() {
        let mut img = sample(144, 72);
        assert_eq!(img.size_pt(), (144.0, 72.0));
        img.dpi = 144;
        assert_eq!(img.size_pt(), (72.0, 36.0));
    }

    #[test]
    fn non_image_bytes_are_unsupported() {
        let err = RasterImage::decode(0, b"%PDF-1.7 not an image", 150).unwrap_err();
        assert_eq!(err.kind(), falzwerk_core::ErrorKind::UnsupportedFormat);
    }

    #[test]
    fn archive_names_are_one_based() {
        let mut img = sample(2, 2);
        img.index = 4;
        assert_eq!(img.file_name(ImageOutputFormat::Png), "page_5.png");
    }
}
