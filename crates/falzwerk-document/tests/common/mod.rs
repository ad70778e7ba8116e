// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared helpers for the integration tests: labelled PDFs built with lopdf,
// archive readers, and in-memory capabilities standing in for PDFium and OCR.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::Arc;

use falzwerk_core::EngineConfig;
use falzwerk_core::error::{FalzwerkError, Result};
use falzwerk_document::capability::{RasterSession, Rasterizer, TextRecognizer};
use falzwerk_document::{Artifact, Capabilities, Dispatcher, InputFile};
use image::{DynamicImage, Rgb, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, StringFormat};

fn name(value: &str) -> Object {
    Object::Name(value.as_bytes().to_vec())
}

/// An `n`-page PDF whose pages draw `<prefix>-1` .. `<prefix>-n`.
pub fn labelled_pdf(n: usize, prefix: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", name("Font")),
        ("Subtype", name("Type1")),
        ("BaseFont", name("Helvetica")),
    ]));

    let mut kids = Vec::with_capacity(n);
    for i in 1..=n {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![name("F1"), Object::Integer(24)]),
                Operation::new("Td", vec![Object::Integer(72), Object::Integer(700)]),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        format!("{prefix}-{i}").into_bytes(),
                        StringFormat::Literal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(lopdf::Stream::new(
            Dictionary::new(),
            content.encode().unwrap(),
        ));
        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", name("Page")),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
            (
                "Resources",
                Object::Dictionary(Dictionary::from_iter(vec![(
                    "Font",
                    Object::Dictionary(Dictionary::from_iter(vec![(
                        "F1",
                        Object::Reference(font_id),
                    )])),
                )])),
            ),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ]),
            ),
        ]));
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter(vec![
            ("Type", name("Pages")),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(n as i64)),
        ])),
    );
    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", name("Catalog")),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

pub fn pdf_input(n: usize, prefix: &str) -> InputFile {
    InputFile::new(format!("{prefix}.pdf"), labelled_pdf(n, prefix))
}

/// The first `Tj` string drawn on each page, in page order.
pub fn labels(pdf: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(pdf).unwrap();
    doc.get_pages()
        .values()
        .map(|&id| {
            let content = Content::decode(&doc.get_page_content(id).unwrap()).unwrap();
            content
                .operations
                .iter()
                .filter(|op| op.operator == "Tj")
                .find_map(|op| op.operands.first()?.as_str().ok().map(<[u8]>::to_vec))
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                .unwrap_or_default()
        })
        .collect()
}

/// Decoded content stream bytes of every page, in page order.
pub fn page_contents(pdf: &[u8]) -> Vec<Vec<u8>> {
    let doc = Document::load_mem(pdf).unwrap();
    doc.get_pages()
        .values()
        .map(|&id| doc.get_page_content(id).unwrap())
        .collect()
}

/// Entries of a ZIP archive in stored order.
pub fn unzip(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index(i).unwrap();
            let mut data = Vec::new();
            file.read_to_end(&mut data).unwrap();
            (file.name().to_owned(), data)
        })
        .collect()
}

pub fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// A dispatcher with binarisation off, so recognised text is the fake
/// rasterizer's page marker as drawn.
pub fn dispatcher(capabilities: Capabilities) -> Dispatcher {
    let mut config = EngineConfig::default();
    config.capabilities.ocr_binarize = false;
    Dispatcher::new(config, capabilities)
}

/// A dispatcher on the stock configuration, binarisation included.
pub fn default_dispatcher(capabilities: Capabilities) -> Dispatcher {
    Dispatcher::new(EngineConfig::default(), capabilities)
}

pub fn run(dispatcher: &Dispatcher, op: &str, inputs: Vec<InputFile>, pairs: &[(&str, &str)]) -> Artifact {
    dispatcher
        .execute(op, inputs, &params(pairs))
        .unwrap_or_else(|err| panic!("{op} failed: {err}"))
}

/// Renders page `i` as a `(20 + i) x 10` image whose red channel is `i`, so
/// both order and identity survive a round trip.
pub struct FakeRasterizer {
    pub broken_page: Option<usize>,
}

struct FakeSession {
    pages: usize,
    broken_page: Option<usize>,
}

impl Rasterizer for FakeRasterizer {
    fn name(&self) -> &str {
        "fake-raster"
    }

    fn open<'a>(&'a self, pdf: &[u8]) -> Result<Box<dyn RasterSession + 'a>> {
        let doc = Document::load_mem(pdf).map_err(|err| FalzwerkError::Corrupt(err.to_string()))?;
        Ok(Box::new(FakeSession {
            pages: doc.get_pages().len(),
            broken_page: self.broken_page,
        }))
    }
}

impl RasterSession for FakeSession {
    fn page_count(&self) -> usize {
        self.pages
    }

    fn render(&self, index: usize, _dpi: u32) -> Result<DynamicImage> {
        if Some(index) == self.broken_page {
            return Err(FalzwerkError::Corrupt(format!("page {index} cannot be drawn")));
        }
        Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            20 + index as u32,
            10,
            Rgb([index as u8, 0, 0]),
        )))
    }
}

/// Reads back the red channel written by [`FakeRasterizer`]. A binarised
/// page has lost that marker, so it is reported with its width as well.
pub struct FakeRecognizer;

impl TextRecognizer for FakeRecognizer {
    fn name(&self) -> &str {
        "fake-ocr"
    }

    fn recognize(&self, image: &DynamicImage) -> Result<String> {
        if let DynamicImage::ImageLuma8(gray) = image {
            return Ok(format!("binarised {}x{}", gray.width(), gray.height()));
        }
        Ok(format!("page {}", image.to_rgb8().get_pixel(0, 0).0[0]))
    }
}

/// Built-in capabilities plus the fakes.
pub fn fake_capabilities(broken_page: Option<usize>) -> Capabilities {
    Capabilities::detect(&EngineConfig::default())
        .with_rasterizer(Arc::new(FakeRasterizer { broken_page }))
        .with_recognizer(Arc::new(FakeRecognizer))
}
