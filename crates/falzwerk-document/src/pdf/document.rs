// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document-level operations: merge, split, compress, encrypt and decrypt.

use std::collections::BTreeMap;

use falzwerk_core::Secret;
use falzwerk_core::error::{FalzwerkError, Result};
use image::ImageFormat;
use image::codecs::jpeg::JpegEncoder;
use lopdf::{Document, Object, ObjectId};
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use super::handle::{self, DocumentHandle, EncryptionInfo};
use super::pages::retain_pages;
use super::tree;

/// Concatenate documents in the order given.
///
/// The result is encrypted with the first encrypted input's secrets when any
/// input was encrypted. An encrypted input must have been opened with its
/// password.
#[instrument(skip_all, fields(inputs = handles.len()))]
pub fn merge(handles: Vec<DocumentHandle>) -> Result<DocumentHandle> {
    if handles.is_empty() {
        return Err(FalzwerkError::InvalidParameter(
            "merge needs at least one document".into(),
        ));
    }
    for (index, handle) in handles.iter().enumerate() {
        if handle.is_encrypted() && handle.encryption().user_secret.is_none() {
            return Err(FalzwerkError::EncryptedInput { index });
        }
    }
    let mut handles = handles;
    if handles.len() == 1 {
        debug!("Single input; merge is the identity");
        return Ok(handles.remove(0));
    }

    let encryption = handles
        .iter()
        .find(|h| h.is_encrypted())
        .map(|h| h.encryption().clone())
        .unwrap_or_default();

    let mut inputs = handles.into_iter();
    let (mut dest, _) = inputs
        .next()
        .ok_or_else(|| FalzwerkError::InvalidParameter("merge needs at least one document".into()))?
        .into_parts();

    let mut page_refs = tree::page_ids(&dest);
    for &id in &page_refs {
        tree::materialize_inherited(&mut dest, id)?;
    }
    let mut max_id = dest.max_id;

    for (position, input) in inputs.enumerate() {
        let (mut source, _) = input.into_parts();
        let source_pages = tree::page_ids(&source);
        for &id in &source_pages {
            tree::materialize_inherited(&mut source, id)?;
        }

        // Shift every source object id past the destination's range.
        let offset = max_id;
        let remapped: BTreeMap<ObjectId, Object> = source
            .objects
            .into_iter()
            .map(|((number, generation), object)| {
                ((number + offset, generation), remap_refs(object, offset))
            })
            .collect();
        dest.objects.extend(remapped);

        page_refs.extend(
            source_pages
                .into_iter()
                .map(|(number, generation)| (number + offset, generation)),
        );
        max_id = max_id.max(source.max_id + offset);
        debug!(input = position + 1, offset, "Input appended");
    }

    dest.max_id = max_id;
    tree::rebuild_page_tree(&mut dest, &page_refs)?;
    dest.prune_objects();

    info!(pages = page_refs.len(), encrypted = encryption.is_encrypted, "Documents merged");
    Ok(DocumentHandle::from_document(dest).with_encryption(encryption))
}

fn remap_refs(object: Object, offset: u32) -> Object {
    match object {
        Object::Reference((number, generation)) => Object::Reference((number + offset, generation)),
        Object::Array(items) => {
            Object::Array(items.into_iter().map(|o| remap_refs(o, offset)).collect())
        }
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = remap_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = remap_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}

/// One single-page document per page, in page order.
#[instrument(skip_all, fields(pages = handle.page_count()))]
pub fn split(handle: DocumentHandle) -> Result<Vec<DocumentHandle>> {
    let ids = tree::page_ids(handle.document());
    match ids.len() {
        0 => return Ok(Vec::new()),
        1 => return Ok(vec![handle]),
        _ => {}
    }

    let mut parts = Vec::with_capacity(ids.len());
    for id in ids {
        let mut part = handle.clone();
        retain_pages(part.document_mut(), &[id])?;
        parts.push(part);
    }

    info!(parts = parts.len(), "Document split");
    Ok(parts)
}

/// JPEG image stream that can be re-encoded without changing its colour model.
struct JpegCandidate {
    id: ObjectId,
    gray: bool,
    data: Vec<u8>,
}

/// Re-encode embedded JPEG images at `quality` and drop unused objects.
/// A re-encoded image is kept only when it is smaller than the original.
#[instrument(skip(handle), fields(pages = handle.page_count()))]
pub fn compress(mut handle: DocumentHandle, quality: u8) -> Result<DocumentHandle> {
    if !(1..=100).contains(&quality) {
        return Err(FalzwerkError::InvalidParameter(format!(
            "quality must be between 1 and 100, got {quality}"
        )));
    }

    let doc = handle.document_mut();
    let candidates = jpeg_candidates(doc);
    let found = candidates.len();

    let replacements: Vec<(ObjectId, Vec<u8>)> = candidates
        .into_par_iter()
        .filter_map(|candidate| {
            let smaller = reencode_jpeg(&candidate, quality)?;
            (smaller.len() < candidate.data.len()).then_some((candidate.id, smaller))
        })
        .collect();

    let replaced = replacements.len();
    for (id, data) in replacements {
        if let Ok(Object::Stream(stream)) = doc.get_object_mut(id) {
            stream.set_content(data);
        }
    }

    handle::optimize(doc);
    info!(found, replaced, quality, "Document compressed");
    Ok(handle)
}

fn jpeg_candidates(doc: &Document) -> Vec<JpegCandidate> {
    doc.objects
        .iter()
        .filter_map(|(&id, object)| {
            let Object::Stream(stream) = object else {
                return None;
            };
            let dict = &stream.dict;
            let is_image = dict
                .get(b"Subtype")
                .and_then(Object::as_name)
                .is_ok_and(|name| name == b"Image");
            if !is_image || dict.has(b"Decode") || !is_single_dct_filter(dict.get(b"Filter").ok()) {
                return None;
            }
            let gray = match dict.get(b"ColorSpace").and_then(Object::as_name) {
                Ok(b"DeviceRGB") => false,
                Ok(b"DeviceGray") => true,
                _ => return None,
            };
            Some(JpegCandidate {
                id,
                gray,
                data: stream.content.clone(),
            })
        })
        .collect()
}

fn is_single_dct_filter(filter: Option<&Object>) -> bool {
    match filter {
        Some(Object::Name(name)) => name == b"DCTDecode",
        Some(Object::Array(items)) => {
            items.len() == 1 && matches!(&items[0], Object::Name(name) if name == b"DCTDecode")
        }
        _ => false,
    }
}

fn reencode_jpeg(candidate: &JpegCandidate, quality: u8) -> Option<Vec<u8>> {
    let decoded = match image::load_from_memory_with_format(&candidate.data, ImageFormat::Jpeg) {
        Ok(img) => img,
        Err(err) => {
            warn!(id = ?candidate.id, %err, "Embedded JPEG could not be decoded; left as is");
            return None;
        }
    };

    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    let result = if candidate.gray {
        decoded.to_luma8().write_with_encoder(encoder)
    } else {
        decoded.to_rgb8().write_with_encoder(encoder)
    };
    match result {
        Ok(()) => Some(buffer),
        Err(err) => {
            warn!(id = ?candidate.id, %err, "JPEG re-encode failed; left as is");
            None
        }
    }
}

/// Mark the document for encryption. The owner secret defaults to the user
/// secret when not given.
#[instrument(skip_all, fields(pages = handle.page_count(), with_owner = owner_secret.is_some()))]
pub fn encrypt(
    handle: DocumentHandle,
    user_secret: Secret,
    owner_secret: Option<Secret>,
) -> Result<DocumentHandle> {
    if user_secret.expose().is_empty() {
        return Err(FalzwerkError::InvalidParameter(
            "password must not be empty".into(),
        ));
    }
    let owner_secret = owner_secret
        .filter(|owner| !owner.expose().is_empty())
        .unwrap_or_else(|| user_secret.clone());

    info!("Document will be written encrypted");
    Ok(handle.with_encryption(EncryptionInfo {
        is_encrypted: true,
        user_secret: Some(user_secret),
        owner_secret: Some(owner_secret),
        retained: None,
    }))
}

/// Remove encryption. `secret` must match the user or owner secret. A document
/// that is not encrypted is returned unchanged.
#[instrument(skip_all, fields(pages = handle.page_count()))]
pub fn decrypt(handle: DocumentHandle, secret: &Secret) -> Result<DocumentHandle> {
    if !handle.is_encrypted() {
        debug!("Document is not encrypted; nothing to remove");
        return Ok(handle);
    }

    if !handle.encryption().accepts(secret) {
        return Err(FalzwerkError::WrongCredential);
    }

    info!("Encryption removed");
    Ok(handle.with_encryption(EncryptionInfo::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::pdf::handle::{EncodeOptions, decode, encode};
    use crate::pdf::pages::rotate;
    use falzwerk_core::{ErrorKind, PageSelection, Rotation};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn reopen(handle: &DocumentHandle, password: Option<&Secret>) -> DocumentHandle {
        let bytes = encode(handle, EncodeOptions::default()).unwrap();
        decode(&bytes, password).unwrap()
    }

    #[test]
    fn merge_empty_fails() {
        let err = merge(Vec::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn merge_single_is_identity() {
        let merged = merge(vec![fixtures::handle(2, "A")]).unwrap();
        assert_eq!(fixtures::labels(&merged), vec!["A-1", "A-2"]);
    }

    #[test]
    fn merge_concatenates_in_order() {
        let merged = merge(vec![fixtures::handle(2, "A"), fixtures::handle(1, "B")]).unwrap();
        let reopened = reopen(&merged, None);
        assert_eq!(fixtures::labels(&reopened), vec!["A-1", "A-2", "B-1"]);
    }

    #[test]
    fn merge_keeps_inherited_rotation() {
        let mut second = fixtures::document(1, "B");
        let root = tree::pages_root_id(&second).unwrap();
        second
            .get_dictionary_mut(root)
            .unwrap()
            .set("Rotate", Object::Integer(90));
        let second = DocumentHandle::from_document(second);

        let merged = merge(vec![fixtures::handle(1, "A"), second]).unwrap();
        assert_eq!(
            merged.rotations(),
            vec![Rotation::NONE, Rotation::normalize(90).unwrap()]
        );
    }

    #[test]
    fn merge_of_encrypted_input_stays_encrypted() {
        let locked = encrypt(fixtures::handle(1, "L"), Secret::new("pw"), None).unwrap();
        let locked = reopen(&locked, Some(&Secret::new("pw")));

        let merged = merge(vec![fixtures::handle(1, "A"), locked]).unwrap();
        assert!(merged.is_encrypted());
        let reopened = reopen(&merged, Some(&Secret::new("pw")));
        assert_eq!(fixtures::labels(&reopened), vec!["A-1", "L-1"]);
    }

    #[test]
    fn merge_rejects_encrypted_input_without_secret() {
        let locked = fixtures::handle(1, "L").with_encryption(EncryptionInfo {
            is_encrypted: true,
            ..EncryptionInfo::default()
        });
        let err = merge(vec![fixtures::handle(1, "A"), locked]).unwrap_err();
        assert!(matches!(err, FalzwerkError::EncryptedInput { index: 1 }));
    }

    #[test]
    fn split_yields_one_document_per_page() {
        let parts = split(fixtures::handle(3, "S")).unwrap();
        assert_eq!(parts.len(), 3);
        for (i, part) in parts.iter().enumerate() {
            let reopened = reopen(part, None);
            assert_eq!(reopened.page_count(), 1);
            assert_eq!(fixtures::labels(&reopened), vec![format!("S-{}", i + 1)]);
        }
    }

    #[test]
    fn split_of_single_page_is_the_input() {
        let parts = split(fixtures::handle(1, "O")).unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(fixtures::labels(&parts[0]), vec!["O-1"]);
    }

    #[test]
    fn split_of_empty_document_is_empty() {
        let empty = DocumentHandle::from_document(tree::empty_document());
        assert!(split(empty).unwrap().is_empty());
    }

    #[test]
    fn split_then_merge_restores_rotations() {
        let handle = rotate(
            fixtures::handle(3, "M"),
            &PageSelection::indices([1]),
            Rotation::normalize(270).unwrap(),
        )
        .unwrap();
        let before = handle.rotations();

        let rebuilt = merge(split(handle).unwrap()).unwrap();
        assert_eq!(rebuilt.rotations(), before);
        assert_eq!(fixtures::labels(&rebuilt), vec!["M-1", "M-2", "M-3"]);
    }

    #[test]
    fn compress_keeps_pages_and_rotation() {
        let handle = rotate(
            fixtures::handle(2, "C"),
            &PageSelection::All,
            Rotation::normalize(90).unwrap(),
        )
        .unwrap();
        let compressed = compress(handle, 40).unwrap();
        let reopened = reopen(&compressed, None);
        assert_eq!(fixtures::labels(&reopened), vec!["C-1", "C-2"]);
        assert_eq!(reopened.rotations(), vec![Rotation::normalize(90).unwrap(); 2]);
    }

    #[test]
    fn compress_rejects_zero_quality() {
        let err = compress(fixtures::handle(1, "Q"), 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn dct_filter_detection() {
        assert!(is_single_dct_filter(Some(&Object::Name(b"DCTDecode".to_vec()))));
        assert!(is_single_dct_filter(Some(&Object::Array(vec![Object::Name(
            b"DCTDecode".to_vec()
        )]))));
        assert!(!is_single_dct_filter(Some(&Object::Array(vec![
            Object::Name(b"FlateDecode".to_vec()),
            Object::Name(b"DCTDecode".to_vec()),
        ]))));
        assert!(!is_single_dct_filter(None));
    }

    #[test]
    fn encrypt_then_decrypt_round_trips() {
        let handle = rotate(
            fixtures::handle(2, "E"),
            &PageSelection::indices([0]),
            Rotation::normalize(180).unwrap(),
        )
        .unwrap();
        let before = handle.rotations();

        let locked = encrypt(handle, Secret::new("open sesame"), None).unwrap();
        let bytes = encode(&locked, EncodeOptions::default()).unwrap();
        assert_eq!(decode(&bytes, None).unwrap_err().kind(), ErrorKind::Encrypted);

        let opened = decode(&bytes, Some(&Secret::new("open sesame"))).unwrap();
        let unlocked = decrypt(opened, &Secret::new("open sesame")).unwrap();
        assert!(!unlocked.is_encrypted());

        let plain = reopen(&unlocked, None);
        assert_eq!(plain.rotations(), before);
        assert_eq!(fixtures::labels(&plain), vec!["E-1", "E-2"]);
    }

    #[test]
    fn decrypt_with_wrong_secret_fails() {
        let locked = encrypt(
            fixtures::handle(1, "W"),
            Secret::new("user"),
            Some(Secret::new("owner")),
        )
        .unwrap();
        let err = decrypt(locked.clone(), &Secret::new("nope")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WrongCredential);

        assert!(!decrypt(locked, &Secret::new("owner")).unwrap().is_encrypted());
    }

    #[test]
    fn encrypt_rejects_empty_password() {
        let err = encrypt(fixtures::handle(1, "X"), Secret::new(""), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn rotating_with_either_password_keeps_the_other() {
        let locked = encrypt(
            fixtures::handle(2, "R"),
            Secret::new("user"),
            Some(Secret::new("owner")),
        )
        .unwrap();
        let bytes = encode(&locked, EncodeOptions::default()).unwrap();
        let quarter = Rotation::normalize(90).unwrap();

        for (opener, other) in [("user", "owner"), ("owner", "user")] {
            let opened = decode(&bytes, Some(&Secret::new(opener))).unwrap();
            let rotated = rotate(opened, &PageSelection::All, quarter).unwrap();

            let reopened = reopen(&rotated, Some(&Secret::new(other)));
            assert_eq!(reopened.rotations(), vec![quarter; 2]);
            let unlocked = decrypt(reopened, &Secret::new(opener)).unwrap();
            assert!(!unlocked.is_encrypted());
            assert_eq!(fixtures::labels(&unlocked), vec!["R-1", "R-2"]);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn merge_preserves_input_order(counts in proptest::collection::vec(1usize..4, 1..5)) {
            let prefixes = ["A", "B", "C", "D"];
            let handles = counts
                .iter()
                .zip(prefixes)
                .map(|(&n, prefix)| fixtures::handle(n, prefix))
                .collect();
            let expected: Vec<String> = counts
                .iter()
                .zip(prefixes)
                .flat_map(|(&n, prefix)| (1..=n).map(move |i| format!("{prefix}-{i}")))
                .collect();

            let merged = merge(handles).unwrap();
            prop_assert_eq!(fixtures::labels(&reopen(&merged, None)), expected);
        }

        #[test]
        fn split_then_merge_keeps_every_rotation(turns in proptest::collection::vec(0i64..4, 1..6)) {
            let mut handle = fixtures::handle(turns.len(), "S");
            for (page, &quarter) in turns.iter().enumerate() {
                let rotation = Rotation::normalize(quarter * 90).unwrap();
                handle = rotate(handle, &PageSelection::indices([page]), rotation).unwrap();
            }
            let before = handle.rotations();

            let rebuilt = merge(split(handle).unwrap()).unwrap();
            prop_assert_eq!(rebuilt.rotations(), before);
            prop_assert_eq!(rebuilt.page_count(), turns.len());
        }
    }
}
