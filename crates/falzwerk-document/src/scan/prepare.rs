// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Adaptive binarisation of rendered pages before text recognition.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;
use tracing::{debug, instrument};

/// Neighbourhood radius for the local mean, in pixels.
const BLOCK_RADIUS: u32 = 15;
/// A pixel is ink when darker than the local mean minus this offset.
const OFFSET: i32 = 10;
/// Light blur applied first so speckle does not become ink.
const BLUR_SIGMA: f32 = 0.8;

/// Smooth, then threshold each pixel against its local mean.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn prepare_for_recognition(image: &DynamicImage) -> DynamicImage {
    let gray = gaussian_blur_f32(&image.to_luma8(), BLUR_SIGMA);
    let binary = binarize(&gray, BLOCK_RADIUS, OFFSET);
    debug!("Page binarised");
    DynamicImage::ImageLuma8(binary)
}

pub fn binarize(gray: &GrayImage, block_radius: u32, offset: i32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let integral = integral_image(gray);

    GrayImage::from_fn(width, height, |x, y| {
        let mean = region_mean(&integral, width, height, x, y, block_radius);
        let threshold = (mean as i32 - offset).clamp(0, 255) as u8;
        if gray.get_pixel(x, y).0[0] < threshold {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

/// Summed-area table with a zero row and column in front.
fn integral_image(gray: &GrayImage) -> Vec<u64> {
    let (w, h) = gray.dimensions();
    let stride = (w + 1) as usize;
    let mut table = vec![0u64; stride * (h + 1) as usize];

    for y in 0..h {
        let mut row_sum = 0u64;
        for x in 0..w {
            row_sum += u64::from(gray.get_pixel(x, y).0[0]);
            let idx = (y + 1) as usize * stride + (x + 1) as usize;
            table[idx] = row_sum + table[y as usize * stride + (x + 1) as usize];
        }
    }
    table
}

fn region_mean(integral: &[u64], width: u32, height: u32, cx: u32, cy: u32, radius: u32) -> f64 {
    let stride = (width + 1) as usize;
    let x1 = cx.saturating_sub(radius) as usize;
    let y1 = cy.saturating_sub(radius) as usize;
    let x2 = (cx as usize + radius as usize + 1).min(width as usize);
    let y2 = (cy as usize + radius as usize + 1).min(height as usize);

    let area = ((x2 - x1) * (y2 - y1)) as f64;
    if area == 0.0 {
        return 128.0;
    }
    let sum = integral[y2 * stride + x2] + integral[y1 * stride + x1]
        - integral[y1 * stride + x2]
        - integral[y2 * stride + x1];
    sum as f64 / area
}
