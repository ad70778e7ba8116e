// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page-tree plumbing on top of `lopdf`: ordered page lookup, inherited page
// attributes, and rebuilding a flat /Pages node after pages are added or
// removed.

use falzwerk_core::Rotation;
use falzwerk_core::error::{FalzwerkError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against /Parent cycles in malformed files.
const MAX_TREE_DEPTH: usize = 64;

/// US Letter, used when a page carries no usable /MediaBox.
pub const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Page object ids in document order.
pub fn page_ids(doc: &Document) -> Vec<ObjectId> {
    // `get_pages` is keyed by 1-based page number, so values come out ordered.
    doc.get_pages().into_values().collect()
}

/// Numeric value of an integer or real object.
pub fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Follow a reference (if any) and return the dictionary it points at.
pub fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match obj {
        Object::Dictionary(dict) => Some(dict),
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        _ => None,
    }
}

/// Look up `key` on the page, walking up /Parent links when the page itself
/// does not define it.
pub fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value.clone());
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// Effective rotation of a page.
pub fn page_rotation(doc: &Document, page_id: ObjectId) -> Rotation {
    inherited_attribute(doc, page_id, b"Rotate")
        .and_then(|obj| obj.as_i64().ok())
        .map(Rotation::from_stored)
        .unwrap_or(Rotation::NONE)
}

/// Write /Rotate directly on the page dictionary.
pub fn set_page_rotation(doc: &mut Document, page_id: ObjectId, rotation: Rotation) -> Result<()> {
    let dict = doc.get_dictionary_mut(page_id).map_err(|err| {
        FalzwerkError::PdfError(format!("page object {page_id:?} is not a dictionary: {err}"))
    })?;
    dict.set("Rotate", Object::Integer(rotation.degrees() as i64));
    Ok(())
}

/// Effective media box `[llx, lly, urx, ury]` of a page.
pub fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let resolved = inherited_attribute(doc, page_id, b"MediaBox").and_then(|obj| match obj {
        Object::Reference(id) => doc.get_object(id).ok().cloned(),
        other => Some(other),
    });

    resolved
        .as_ref()
        .and_then(|obj| obj.as_array().ok())
        .filter(|array| array.len() == 4)
        .and_then(|array| {
            Some([
                number(&array[0])?,
                number(&array[1])?,
                number(&array[2])?,
                number(&array[3])?,
            ])
        })
        .unwrap_or(DEFAULT_MEDIA_BOX)
}

/// Width and height of the page's media box in points.
pub fn page_size(doc: &Document, page_id: ObjectId) -> (f32, f32) {
    let [x0, y0, x1, y1] = media_box(doc, page_id);
    ((x1 - x0).abs(), (y1 - y0).abs())
}

/// Copy inherited attributes onto the page itself, so the page keeps them
/// when it is re-parented.
pub fn materialize_inherited(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let mut missing = Vec::new();
    {
        let page = doc.get_dictionary(page_id).map_err(|err| {
            FalzwerkError::PdfError(format!("cannot read page {page_id:?}: {err}"))
        })?;
        for key in INHERITABLE {
            if !page.has(key) {
                if let Some(value) = inherited_attribute(doc, page_id, key) {
                    missing.push((key.to_vec(), value));
                }
            }
        }
    }

    if missing.is_empty() {
        return Ok(());
    }

    let page = doc.get_dictionary_mut(page_id).map_err(|err| {
        FalzwerkError::PdfError(format!("cannot update page {page_id:?}: {err}"))
    })?;
    for (key, value) in missing {
        page.set(key, value);
    }
    Ok(())
}

/// Id of the root /Pages node referenced by the catalog.
pub fn pages_root_id(doc: &Document) -> Result<ObjectId> {
    doc.catalog()
        .map_err(|err| FalzwerkError::PdfError(format!("no catalog: {err}")))?
        .get(b"Pages")
        .and_then(Object::as_reference)
        .map_err(|err| FalzwerkError::PdfError(format!("catalog has no /Pages reference: {err}")))
}

/// Replace the page tree with a single flat /Pages node whose kids are
/// `page_refs`, in that order. Every page must already carry its inherited
/// attributes (see [`materialize_inherited`]).
pub fn rebuild_page_tree(doc: &mut Document, page_refs: &[ObjectId]) -> Result<()> {
    let pages_id = pages_root_id(doc)?;

    let pages_dict = doc.get_dictionary_mut(pages_id).map_err(|err| {
        FalzwerkError::PdfError(format!("invalid /Pages dictionary: {err}"))
    })?;
    let kids = page_refs.iter().map(|&id| Object::Reference(id)).collect();
    pages_dict.set("Kids", Object::Array(kids));
    pages_dict.set("Count", Object::Integer(page_refs.len() as i64));
    // The flat root owns no inheritable attributes; each page carries its own.
    for key in INHERITABLE {
        pages_dict.remove(key);
    }

    for &page_id in page_refs {
        if let Ok(page) = doc.get_dictionary_mut(page_id) {
            page.set("Parent", Object::Reference(pages_id));
        }
    }
    Ok(())
}

/// Build an empty document with a catalog and an empty /Pages node.
pub fn empty_document() -> Document {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(Vec::new())),
            ("Count", Object::Integer(0)),
        ])),
    );
    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc
}
