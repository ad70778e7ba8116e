// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end properties of the pipeline, driven through `Dispatcher::execute`
// the way the request layer drives it.

mod common;

use std::sync::Arc;

use common::*;
use falzwerk_core::ErrorKind;
use falzwerk_core::error::{FalzwerkError, Result};
use falzwerk_document::capability::{Table, TableDetector};
use falzwerk_document::pdf::Page;
use falzwerk_document::{Capabilities, DocumentHandle, InputFile, decode};
use pretty_assertions::assert_eq;

fn rotations(pdf: &[u8]) -> Vec<u16> {
    decode(pdf, None)
        .unwrap()
        .rotations()
        .iter()
        .map(|r| r.degrees())
        .collect()
}

#[test]
fn rotating_pages_two_and_three_leaves_page_one_alone() {
    let d = dispatcher(Capabilities::none());
    let out = run(&d, "rotate", vec![pdf_input(3, "A")], &[("pages", "2-3"), ("degrees", "90")]);
    assert_eq!(rotations(&out.bytes), vec![0, 90, 90]);
    assert_eq!(labels(&out.bytes), vec!["A-1", "A-2", "A-3"]);
}

#[test]
fn four_quarter_turns_restore_rotation() {
    let d = dispatcher(Capabilities::none());
    let mut bytes = labelled_pdf(2, "Q");
    for _ in 0..4 {
        bytes = run(&d, "rotate", vec![InputFile::new("q.pdf", bytes)], &[("degrees", "90")]).bytes;
    }
    assert_eq!(rotations(&bytes), vec![0, 0]);
}

#[test]
fn rotation_adds_modulo_full_turn() {
    let d = dispatcher(Capabilities::none());
    let once = run(&d, "rotate", vec![pdf_input(1, "R")], &[("degrees", "270")]);
    let twice = run(&d, "rotate", vec![InputFile::new("r.pdf", once.bytes)], &[("degrees", "180")]);
    assert_eq!(rotations(&twice.bytes), vec![90]);
}

#[test]
fn merge_concatenates_in_upload_order() {
    let d = dispatcher(Capabilities::none());
    let b = labelled_pdf(1, "B");
    let out = run(
        &d,
        "merge",
        vec![pdf_input(2, "A"), InputFile::new("b.pdf", b.clone())],
        &[],
    );
    assert_eq!(out.filename, "merged.pdf");
    assert_eq!(labels(&out.bytes), vec!["A-1", "A-2", "B-1"]);
    assert_eq!(page_contents(&out.bytes)[2], page_contents(&b)[0]);
}

#[test]
fn merge_of_one_document_is_identity() {
    let d = dispatcher(Capabilities::none());
    let out = run(&d, "merge", vec![pdf_input(3, "M")], &[]);
    assert_eq!(labels(&out.bytes), vec!["M-1", "M-2", "M-3"]);
    assert_eq!(rotations(&out.bytes), vec![0, 0, 0]);
}

#[test]
fn split_then_merge_reconstructs_the_document() {
    let d = dispatcher(Capabilities::none());
    let rotated = run(&d, "rotate", vec![pdf_input(3, "S")], &[("pages", "2"), ("degrees", "180")]);

    let split = run(&d, "split", vec![InputFile::new("s.pdf", rotated.bytes.clone())], &[]);
    let parts = unzip(&split.bytes);
    let names: Vec<&str> = parts.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["page_1.pdf", "page_2.pdf", "page_3.pdf"]);
    for (_, part) in &parts {
        assert_eq!(labels(part).len(), 1);
    }

    let inputs = parts
        .into_iter()
        .map(|(name, bytes)| InputFile::new(name, bytes))
        .collect();
    let merged = run(&d, "merge", inputs, &[]);
    assert_eq!(rotations(&merged.bytes), rotations(&rotated.bytes));
    assert_eq!(labels(&merged.bytes), vec!["S-1", "S-2", "S-3"]);
}

#[test]
fn extract_pages_keeps_ascending_order() {
    let d = dispatcher(Capabilities::none());
    let out = run(&d, "extract-pages", vec![pdf_input(4, "E")], &[("pages", "4, 1")]);
    assert_eq!(labels(&out.bytes), vec!["E-1", "E-4"]);

    let err = d
        .execute("extract-pages", vec![pdf_input(2, "E")], &params(&[("pages", "3")]))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidParameter);
}

#[test]
fn an_enormous_page_range_is_refused_promptly() {
    let d = dispatcher(Capabilities::none());
    let started = std::time::Instant::now();
    let err = d
        .execute(
            "rotate",
            vec![pdf_input(2, "H")],
            &params(&[("pages", "1-18446744073709551615"), ("degrees", "90")]),
        )
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidParameter);
    assert!(started.elapsed() < std::time::Duration::from_secs(5));
}

#[test]
fn encrypt_then_decrypt_restores_the_document() {
    let d = dispatcher(Capabilities::none());
    let rotated = run(&d, "rotate", vec![pdf_input(3, "C")], &[("pages", "1"), ("degrees", "90")]);
    let locked = run(
        &d,
        "protect",
        vec![InputFile::new("c.pdf", rotated.bytes.clone())],
        &[("password", "s3cret")],
    );
    assert_eq!(locked.filename, "protected.pdf");

    let err = decode(&locked.bytes, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Encrypted);

    let unlocked = run(
        &d,
        "unlock",
        vec![InputFile::new("locked.pdf", locked.bytes.clone())],
        &[("password", "s3cret")],
    );
    assert!(!decode(&unlocked.bytes, None).unwrap().is_encrypted());
    assert_eq!(rotations(&unlocked.bytes), vec![90, 0, 0]);
    assert_eq!(labels(&unlocked.bytes), vec!["C-1", "C-2", "C-3"]);
}

#[test]
fn wrong_password_is_never_reported_as_corruption() {
    let d = dispatcher(Capabilities::none());
    let locked = run(&d, "encrypt", vec![pdf_input(1, "W")], &[("password", "right")]);

    for op in ["decrypt", "rotate", "split"] {
        let err = d
            .execute(
                op,
                vec![InputFile::new("w.pdf", locked.bytes.clone())],
                &params(&[("password", "wrong")]),
            )
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::WrongCredential, "{op}");
    }

    let err = d
        .execute("decrypt", vec![InputFile::new("w.pdf", locked.bytes)], &params(&[]))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Encrypted);
}

#[test]
fn operations_on_an_unlocked_input_keep_it_protected() {
    let d = dispatcher(Capabilities::none());
    let locked = run(&d, "encrypt", vec![pdf_input(2, "K")], &[("password", "pw")]);
    let rotated = run(
        &d,
        "rotate",
        vec![InputFile::new("k.pdf", locked.bytes)],
        &[("password", "pw"), ("degrees", "90")],
    );
    assert_eq!(decode(&rotated.bytes, None).unwrap_err().kind(), ErrorKind::Encrypted);
    let reopened = decode(&rotated.bytes, Some(&falzwerk_core::Secret::new("pw"))).unwrap();
    assert_eq!(reopened.page_count(), 2);
    assert_eq!(reopened.rotations().iter().map(|r| r.degrees()).collect::<Vec<_>>(), vec![90, 90]);
}

#[test]
fn either_password_unlocks_after_an_operation_with_the_other() {
    let d = dispatcher(Capabilities::none());
    let locked = run(
        &d,
        "encrypt",
        vec![pdf_input(2, "U")],
        &[("password", "user"), ("owner_password", "owner")],
    );

    for (opener, other) in [("user", "owner"), ("owner", "user")] {
        let rotated = run(
            &d,
            "rotate",
            vec![InputFile::new("u.pdf", locked.bytes.clone())],
            &[("password", opener), ("degrees", "90")],
        );
        let unlocked = run(
            &d,
            "decrypt",
            vec![InputFile::new("u.pdf", rotated.bytes)],
            &[("password", other)],
        );
        assert_eq!(rotations(&unlocked.bytes), vec![90, 90], "rotated with {opener}");
        assert_eq!(labels(&unlocked.bytes), vec!["U-1", "U-2"]);
    }
}

#[test]
fn images_come_back_in_page_order_and_round_trip() {
    let d = dispatcher(fake_capabilities(None));
    let images = run(&d, "to-images", vec![pdf_input(3, "I")], &[("format", "png"), ("dpi", "72")]);
    assert_eq!(images.filename, "pages.zip");

    let entries = unzip(&images.bytes);
    let names: Vec<&str> = entries.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["page_1.png", "page_2.png", "page_3.png"]);
    for (index, (_, png)) in entries.iter().enumerate() {
        let decoded = image::load_from_memory(png).unwrap().to_rgb8();
        assert_eq!(decoded.get_pixel(0, 0).0[0], index as u8);
    }

    let inputs = entries
        .into_iter()
        .map(|(name, bytes)| InputFile::new(name, bytes))
        .collect();
    let pdf = run(&d, "jpg2pdf", inputs, &[]);
    assert_eq!(pdf.filename, "converted.pdf");
    let handle = decode(&pdf.bytes, None).unwrap();
    let widths: Vec<f32> = handle.pages().iter().map(|p| p.width).collect();
    assert_eq!(widths.len(), 3);
    for (index, width) in widths.iter().enumerate() {
        assert!((width - (20 + index) as f32).abs() < 0.5, "page {index} is {width}pt wide");
    }
}

#[test]
fn single_page_to_images_is_a_bare_jpeg() {
    let d = dispatcher(fake_capabilities(None));
    let out = run(&d, "pdf2jpg", vec![pdf_input(1, "J")], &[]);
    assert_eq!(out.filename, "page_1.jpg");
    assert_eq!(out.content_type, "image/jpeg");
    assert!(out.bytes.starts_with(&[0xFF, 0xD8]));
}

#[test]
fn to_images_fails_as_a_whole_on_a_broken_page() {
    let d = dispatcher(fake_capabilities(Some(1)));
    let err = d
        .execute("to-images", vec![pdf_input(3, "B")], &params(&[]))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Corrupt);
}

#[test]
fn conversions_without_a_rasterizer_report_the_missing_capability() {
    let d = dispatcher(Capabilities::none());
    for op in ["to-images", "to-pptx", "ocr"] {
        let err = d.execute(op, vec![pdf_input(1, "N")], &params(&[])).unwrap_err();
        assert_eq!(err.kind, ErrorKind::CapabilityUnavailable, "{op}");
    }
}

#[test]
fn text_extraction_survives_an_unreadable_page() {
    let d = dispatcher(fake_capabilities(Some(1)));
    let out = run(&d, "ocr", vec![pdf_input(3, "O")], &[]);
    assert_eq!(out.filename, "ocr.json");

    let json: serde_json::Value = serde_json::from_slice(&out.bytes).unwrap();
    let pages = json["pages"].as_array().unwrap();
    assert_eq!(pages.len(), 3);
    assert_eq!(pages[0]["text"], "page 0");
    assert_eq!(pages[1]["text"], "");
    assert!(pages[1]["failure"].is_string());
    assert!(pages[2]["failure"].is_null());
    assert_eq!(pages[2]["page"], 3);
}

#[test]
fn binarised_recognition_keeps_page_order_and_failures() {
    let d = default_dispatcher(fake_capabilities(Some(1)));
    let out = run(&d, "ocr", vec![pdf_input(3, "B")], &[]);

    let json: serde_json::Value = serde_json::from_slice(&out.bytes).unwrap();
    let pages = json["pages"].as_array().unwrap();
    assert_eq!(pages.len(), 3);
    assert_eq!(pages[0]["text"], "binarised 20x10");
    assert!(pages[0]["failure"].is_null());
    assert!(pages[1]["failure"].is_string());
    assert_eq!(pages[2]["text"], "binarised 22x10");
    assert!(pages[2]["failure"].is_null());
}

/// Finds one 2x2 table on every page except `broken_page`.
struct FlakyDetector {
    broken_page: usize,
}

impl TableDetector for FlakyDetector {
    fn name(&self) -> &str {
        "flaky"
    }

    fn detect(&self, _handle: &DocumentHandle, page: &Page) -> Result<Vec<Table>> {
        let page = page.index;
        if page == self.broken_page {
            return Err(FalzwerkError::PdfError("garbled content stream".into()));
        }
        Ok(vec![Table {
            rows: vec![
                vec!["name".into(), "qty".into()],
                vec![format!("item{page}"), page.to_string()],
            ],
        }])
    }
}

#[test]
fn table_extraction_survives_an_unreadable_page() {
    let caps = Capabilities::none().with_table_detector(Arc::new(FlakyDetector { broken_page: 1 }));
    let d = dispatcher(caps);
    let out = run(&d, "extract-tables", vec![pdf_input(3, "T")], &[("format", "csv")]);
    assert_eq!(out.filename, "tables.csv");
    assert_eq!(
        String::from_utf8(out.bytes).unwrap(),
        "page,table,column_1,column_2\n\
         1,1,name,qty\n\
         1,1,item0,0\n\
         3,1,name,qty\n\
         3,1,item2,2\n"
    );
}

#[test]
fn table_extraction_fails_only_when_every_page_fails() {
    let caps = Capabilities::none().with_table_detector(Arc::new(FlakyDetector { broken_page: 0 }));
    let err = dispatcher(caps)
        .execute("extract-tables", vec![pdf_input(1, "T")], &params(&[]))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Corrupt);
}

#[test]
fn office_conversions_produce_packages() {
    let d = dispatcher(fake_capabilities(None));

    let docx = run(&d, "pdf2docx", vec![pdf_input(2, "D")], &[]);
    assert_eq!(docx.filename, "converted.docx");
    let parts = unzip(&docx.bytes);
    let (_, body) = parts
        .iter()
        .find(|(name, _)| name == "word/document.xml")
        .unwrap();
    let body = String::from_utf8_lossy(body);
    assert!(body.contains("D-1") && body.contains("D-2"));

    let pptx = run(&d, "pdf2pptx", vec![pdf_input(2, "P")], &[]);
    assert_eq!(pptx.filename, "presentation.pptx");
    let slides = unzip(&pptx.bytes)
        .into_iter()
        .filter(|(name, _)| name.starts_with("ppt/slides/slide") && name.ends_with(".xml"))
        .count();
    assert_eq!(slides, 2);
}

#[test]
fn watermark_and_compress_keep_the_page_structure() {
    let d = dispatcher(Capabilities::none());
    let marked = run(&d, "watermark", vec![pdf_input(2, "W")], &[("text", "DRAFT"), ("pages", "1")]);
    assert_eq!(rotations(&marked.bytes), vec![0, 0]);

    let compressed = run(&d, "compress", vec![InputFile::new("w.pdf", marked.bytes)], &[("quality", "40")]);
    assert_eq!(compressed.filename, "compressed.pdf");
    assert_eq!(decode(&compressed.bytes, None).unwrap().page_count(), 2);
}
