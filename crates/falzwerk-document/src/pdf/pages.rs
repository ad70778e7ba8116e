// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page-level operations: rotate, watermark, and extract a page selection.

use falzwerk_core::error::{FalzwerkError, Result};
use falzwerk_core::{PageSelection, Rotation, WatermarkStyle};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info, instrument, warn};
use unicode_normalization::UnicodeNormalization;

use super::handle::DocumentHandle;
use super::tree;

/// Resource names used by the watermark overlay.
const WATERMARK_FONT: &str = "FzWmF1";
const WATERMARK_GSTATE: &str = "FzWmGS1";

/// Rotate every selected page by `rotation`, adding to its current rotation.
#[instrument(skip(handle), fields(pages = handle.page_count()))]
pub fn rotate(
    mut handle: DocumentHandle,
    selection: &PageSelection,
    rotation: Rotation,
) -> Result<DocumentHandle> {
    let ids = selected_ids(&handle, selection)?;
    let doc = handle.document_mut();

    for id in ids {
        let current = tree::page_rotation(doc, id);
        let updated = current.add(rotation);
        tree::set_page_rotation(doc, id, updated)?;
        debug!(?id, %current, %updated, "Page rotated");
    }

    info!(%rotation, "Rotation applied");
    Ok(handle)
}

/// Overlay `text` on every selected page. Page rotation and page count are
/// left untouched.
#[instrument(skip(handle, text), fields(pages = handle.page_count(), text_len = text.len()))]
pub fn watermark(
    mut handle: DocumentHandle,
    selection: &PageSelection,
    text: &str,
    style: &WatermarkStyle,
) -> Result<DocumentHandle> {
    if text.trim().is_empty() {
        return Err(FalzwerkError::InvalidParameter(
            "watermark text must not be empty".into(),
        ));
    }
    style.validate()?;

    let ids = selected_ids(&handle, selection)?;
    let (encoded, substituted) = encode_win_ansi(text);
    if substituted > 0 {
        warn!(substituted, "Watermark characters outside the font were substituted");
    }

    let doc = handle.document_mut();
    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
    ]));
    let gstate_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"ExtGState".to_vec())),
        ("ca", Object::Real(style.opacity)),
        ("CA", Object::Real(style.opacity)),
    ]));

    for id in ids {
        let [x0, y0, x1, y1] = tree::media_box(doc, id);
        let origin = (x0 + (x1 - x0) / 4.0, y0 + (y1 - y0) / 2.0);

        add_resource(doc, id, b"Font", WATERMARK_FONT, font_id)?;
        add_resource(doc, id, b"ExtGState", WATERMARK_GSTATE, gstate_id)?;

        let overlay = overlay_content(&encoded, text, origin, style);
        append_content(doc, id, overlay)?;
    }

    info!("Watermark applied");
    Ok(handle)
}

/// Keep only the selected pages, in document order.
#[instrument(skip(handle), fields(pages = handle.page_count()))]
pub fn extract_pages(mut handle: DocumentHandle, selection: &PageSelection) -> Result<DocumentHandle> {
    let ids = selected_ids(&handle, selection)?;
    if ids.is_empty() {
        return Err(FalzwerkError::InvalidParameter(
            "no pages selected for extraction".into(),
        ));
    }
    retain_pages(handle.document_mut(), &ids)?;
    info!(kept = ids.len(), "Pages extracted");
    Ok(handle)
}

/// Drop every page not listed in `keep` and the objects only they used.
pub(crate) fn retain_pages(doc: &mut Document, keep: &[ObjectId]) -> Result<()> {
    for &id in keep {
        tree::materialize_inherited(doc, id)?;
    }
    tree::rebuild_page_tree(doc, keep)?;
    doc.prune_objects();
    Ok(())
}

fn selected_ids(handle: &DocumentHandle, selection: &PageSelection) -> Result<Vec<ObjectId>> {
    let ids = tree::page_ids(handle.document());
    let indices = selection.resolve(ids.len())?;
    Ok(indices.into_iter().map(|i| ids[i]).collect())
}

/// Register `id` under `/Resources/<category>/<name>` for one page. The page
/// gets its own copy of the resource dictionary so pages that shared one are
/// not affected.
fn add_resource(
    doc: &mut Document,
    page_id: ObjectId,
    category: &[u8],
    name: &str,
    id: ObjectId,
) -> Result<()> {
    let mut resources = tree::inherited_attribute(doc, page_id, b"Resources")
        .and_then(|obj| tree::resolve_dict(doc, &obj).cloned())
        .unwrap_or_else(Dictionary::new);

    let mut entries = resources
        .get(category)
        .ok()
        .and_then(|obj| tree::resolve_dict(doc, obj).cloned())
        .unwrap_or_else(Dictionary::new);
    entries.set(name, Object::Reference(id));
    resources.set(category.to_vec(), Object::Dictionary(entries));

    let page = doc.get_dictionary_mut(page_id).map_err(|err| {
        FalzwerkError::PdfError(format!("cannot update page {page_id:?}: {err}"))
    })?;
    page.set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// Append `content` after the page's existing streams. The existing content is
/// wrapped in `q`/`Q` so graphics state it leaves behind cannot leak into the
/// overlay.
fn append_content(doc: &mut Document, page_id: ObjectId, content: Vec<u8>) -> Result<()> {
    let existing = doc
        .get_dictionary(page_id)
        .ok()
        .and_then(|page| page.get(b"Contents").ok())
        .cloned();

    let mut streams = Vec::new();
    match existing {
        Some(Object::Array(items)) => streams.extend(items),
        Some(Object::Reference(id)) => match doc.get_object(id) {
            Ok(Object::Array(items)) => streams.extend(items.iter().cloned()),
            _ => streams.push(Object::Reference(id)),
        },
        Some(other) => warn!(?other, "Unexpected /Contents value dropped"),
        None => {}
    }

    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let restore_id = doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));
    let overlay_id = doc.add_object(Stream::new(Dictionary::new(), content));

    let mut contents = Vec::with_capacity(streams.len() + 3);
    contents.push(Object::Reference(save_id));
    contents.extend(streams);
    contents.push(Object::Reference(restore_id));
    contents.push(Object::Reference(overlay_id));

    let page = doc.get_dictionary_mut(page_id).map_err(|err| {
        FalzwerkError::PdfError(format!("cannot update page {page_id:?}: {err}"))
    })?;
    page.set("Contents", Object::Array(contents));
    Ok(())
}

/// Content stream drawing the watermark, tagged with the original Unicode
/// text so extraction and screen readers see it even where glyphs fell back.
fn overlay_content(
    encoded: &[u8],
    original: &str,
    (x, y): (f32, f32),
    style: &WatermarkStyle,
) -> Vec<u8> {
    let radians = style.angle_degrees.to_radians();
    let (sin, cos) = radians.sin_cos();

    let mut out = Vec::new();
    out.extend_from_slice(b"/Span <</ActualText ");
    out.extend_from_slice(&hex_string(&utf16_be(original)));
    out.extend_from_slice(b">> BDC\nq\n");
    out.extend_from_slice(format!("/{WATERMARK_GSTATE} gs\n{:.3} g\nBT\n", style.gray).as_bytes());
    out.extend_from_slice(format!("/{WATERMARK_FONT} {:.2} Tf\n", style.font_size).as_bytes());
    out.extend_from_slice(
        format!(
            "{cos:.5} {sin:.5} {:.5} {cos:.5} {x:.2} {y:.2} Tm\n",
            -sin
        )
        .as_bytes(),
    );
    out.extend_from_slice(&literal_string(encoded));
    out.extend_from_slice(b" Tj\nET\nQ\nEMC\n");
    out
}

/// Map text onto WinAnsi bytes. Characters the standard font cannot show fall
/// back to their unaccented base letter, then to `?`. Returns the bytes and
/// how many characters were substituted.
fn encode_win_ansi(text: &str) -> (Vec<u8>, usize) {
    let mut bytes = Vec::with_capacity(text.len());
    let mut substituted = 0;

    for ch in text.chars() {
        if let Some(byte) = win_ansi_byte(ch) {
            bytes.push(byte);
            continue;
        }
        substituted += 1;
        let fallback = ch
            .to_string()
            .nfkd()
            .find_map(win_ansi_byte)
            .filter(|b| b.is_ascii_graphic())
            .unwrap_or(b'?');
        bytes.push(fallback);
    }

    (bytes, substituted)
}

fn win_ansi_byte(ch: char) -> Option<u8> {
    match ch {
        ' '..='~' => Some(ch as u8),
        '\u{00A0}'..='\u{00FF}' => Some(ch as u32 as u8),
        '€' => Some(0x80),
        '‘' => Some(0x91),
        '’' => Some(0x92),
        '“' => Some(0x93),
        '”' => Some(0x94),
        '•' => Some(0x95),
        '–' => Some(0x96),
        '—' => Some(0x97),
        _ => None,
    }
}

fn utf16_be(text: &str) -> Vec<u8> {
    let mut out = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

fn hex_string(bytes: &[u8]) -> Vec<u8> {
    let mut out = String::with_capacity(bytes.len() * 2 + 2);
    out.push('<');
    for b in bytes {
        out.push_str(&format!("{b:02X}"));
    }
    out.push('>');
    out.into_bytes()
}

fn literal_string(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 2);
    out.push(b'(');
    for &b in bytes {
        if matches!(b, b'(' | b')' | b'\\') {
            out.push(b'\\');
        }
        out.push(b);
    }
    out.push(b')');
    out
}
