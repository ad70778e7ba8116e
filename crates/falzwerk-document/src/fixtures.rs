// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Small PDFs built with lopdf for unit tests. Every page draws one label such
// as `A-2`, so tests can tell pages apart after they have been moved around.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::pdf::DocumentHandle;
use crate::pdf::handle::decode;

fn name(value: &str) -> Object {
    Object::Name(value.as_bytes().to_vec())
}

/// Content stream drawing `label` at (72, 700) in 24pt Helvetica.
pub fn label_content(label: &str) -> Vec<u8> {
    text_content(24, &[(72, 700, label)])
}

/// Content stream drawing each `(x, y, text)` in Helvetica of `size` points.
pub fn text_content(size: i64, items: &[(i64, i64, &str)]) -> Vec<u8> {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![name("F1"), Object::Integer(size)]),
    ];
    for &(x, y, text) in items {
        operations.push(Operation::new(
            "Tm",
            vec![
                Object::Integer(1),
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(1),
                Object::Integer(x),
                Object::Integer(y),
            ],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(text.as_bytes().to_vec(), StringFormat::Literal)],
        ));
    }
    operations.push(Operation::new("ET", vec![]));
    Content { operations }.encode().unwrap()
}

/// Build an `n`-page document whose pages read `<prefix>-1` .. `<prefix>-n`.
pub fn document(n: usize, prefix: &str) -> Document {
    document_with_contents(
        (1..=n)
            .map(|i| label_content(&format!("{prefix}-{i}")))
            .collect(),
    )
}

/// One page per content stream, in order.
pub fn document_with_contents(contents: Vec<Vec<u8>>) -> Document {
    let n = contents.len();
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", name("Font")),
        ("Subtype", name("Type1")),
        ("BaseFont", name("Helvetica")),
    ]));
    let resources_id = doc.add_object(Dictionary::from_iter(vec![(
        "Font",
        Object::Dictionary(Dictionary::from_iter(vec![(
            "F1",
            Object::Reference(font_id),
        )])),
    )]));

    let mut kids = Vec::with_capacity(n);
    for content in contents {
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content));
        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", name("Page")),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Reference(resources_id)),
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
    doc
}

pub fn pdf_bytes(n: usize, prefix: &str) -> Vec<u8> {
    let mut doc = document(n, prefix);
    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

pub fn handle(n: usize, prefix: &str) -> DocumentHandle {
    decode(&pdf_bytes(n, prefix), None).unwrap()
}

/// Encode and decode `doc`, as a request would see it.
pub fn handle_from(mut doc: Document) -> DocumentHandle {
    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    decode(&out, None).unwrap()
}

/// The label drawn on a page, read back from its content stream.
pub fn page_label(doc: &Document, page_id: ObjectId) -> String {
    let content = doc.get_page_content(page_id).unwrap_or_default();
    let Ok(content) = Content::decode(&content) else {
        return String::new();
    };
    content
        .operations
        .iter()
        .filter(|op| op.operator == "Tj")
        .filter_map(|op| op.operands.first())
        .filter_map(|obj| obj.as_str().ok())
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        .next()
        .unwrap_or_default()
}

/// Labels of every page in order.
pub fn labels(handle: &DocumentHandle) -> Vec<String> {
    let doc = handle.document();
    crate::pdf::tree::page_ids(doc)
        .into_iter()
        .map(|id| page_label(doc, id))
        .collect()
}
