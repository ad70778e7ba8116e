// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document handle — a decoded PDF plus its encryption state, produced by
// `decode` and turned back into bytes by `encode`.
//
// Operations take a handle by value and return a new one. The handle is owned
// by exactly one request, so no two operations ever observe each other's
// intermediate state.

use std::collections::{BTreeMap, HashSet};

use falzwerk_core::error::{FalzwerkError, Result};
use falzwerk_core::integrity::hash_bytes;
use falzwerk_core::{DocumentType, Rotation, Secret};
use lopdf::encryption::{
    self, DecryptionError, EncryptionState, EncryptionVersion, PasswordAlgorithm, Permissions,
};
use lopdf::xref::XrefEntry;
use lopdf::{Document, Object, ObjectId, ObjectStream, Reader};
use tracing::{debug, info, instrument, warn};

use super::tree;

/// Key length of the standard security handler written by [`encode`].
const KEY_LENGTH_BITS: usize = 128;

/// Encryption state carried alongside the decoded objects.
#[derive(Debug, Clone, Default)]
pub struct EncryptionInfo {
    pub is_encrypted: bool,
    pub user_secret: Option<Secret>,
    pub owner_secret: Option<Secret>,
    /// Security handler of a decoded file. Re-encoding reuses it, so both
    /// of the file's passwords keep working.
    pub(crate) retained: Option<RetainedEncryption>,
}

/// The standard security handler state of a decoded file together with the
/// /ID its key was derived from.
#[derive(Debug, Clone)]
pub(crate) struct RetainedEncryption {
    state: EncryptionState,
    file_id: Option<Object>,
}

impl EncryptionInfo {
    /// Whether `secret` is one of the document's passwords. For a decoded
    /// file the retained security handler also accepts the password that
    /// was not used to open it.
    pub fn accepts(&self, secret: &Secret) -> bool {
        let stored = [&self.user_secret, &self.owner_secret]
            .into_iter()
            .flatten()
            .any(|known| known == secret);
        stored || self.retained.as_ref().is_some_and(|r| r.authenticates(secret))
    }
}

impl RetainedEncryption {
    fn authenticates(&self, secret: &Secret) -> bool {
        let Ok(dict) = self.state.encode() else {
            return false;
        };
        let mut lock = Document::with_version("1.7");
        if let Some(id) = &self.file_id {
            lock.trailer.set("ID", id.clone());
        }
        let dict_id = lock.add_object(dict);
        lock.trailer.set("Encrypt", Object::Reference(dict_id));
        lock.authenticate_password(secret.expose()).is_ok()
    }
}

/// One page of a [`DocumentHandle`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Page {
    /// Zero-based position in the document.
    pub index: usize,
    pub rotation: Rotation,
    /// Media box width in points.
    pub width: f32,
    /// Media box height in points.
    pub height: f32,
    pub(crate) content_ref: ObjectId,
}

/// An in-memory decoded PDF.
#[derive(Debug, Clone)]
pub struct DocumentHandle {
    document: Document,
    encryption: EncryptionInfo,
}

/// Hints for [`encode`]. Both may be ignored without error.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodeOptions {
    /// Drop unreferenced objects and compress streams.
    pub optimize: bool,
    /// Reorder for incremental access. Not supported by the writer.
    pub linearize: bool,
}

impl DocumentHandle {
    pub(crate) fn from_document(document: Document) -> Self {
        Self {
            document,
            encryption: EncryptionInfo::default(),
        }
    }

    pub(crate) fn with_encryption(mut self, encryption: EncryptionInfo) -> Self {
        self.encryption = encryption;
        self
    }

    pub(crate) fn document(&self) -> &Document {
        &self.document
    }

    pub(crate) fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub(crate) fn into_parts(self) -> (Document, EncryptionInfo) {
        (self.document, self.encryption)
    }

    pub fn source_format(&self) -> DocumentType {
        DocumentType::Pdf
    }

    pub fn encryption(&self) -> &EncryptionInfo {
        &self.encryption
    }

    pub fn is_encrypted(&self) -> bool {
        self.encryption.is_encrypted
    }

    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Pages in document order, indexed from zero.
    pub fn pages(&self) -> Vec<Page> {
        tree::page_ids(&self.document)
            .into_iter()
            .enumerate()
            .map(|(index, id)| {
                let (width, height) = tree::page_size(&self.document, id);
                Page {
                    index,
                    rotation: tree::page_rotation(&self.document, id),
                    width,
                    height,
                    content_ref: id,
                }
            })
            .collect()
    }

    /// Per-page rotations in order, the fingerprint most properties compare.
    pub fn rotations(&self) -> Vec<Rotation> {
        self.pages().into_iter().map(|page| page.rotation).collect()
    }
}

/// Decode PDF bytes. An encrypted file opens only with its user or owner
/// password, except files protected by an empty user password.
#[instrument(skip_all, fields(bytes_len = bytes.len(), with_password = password.is_some()))]
pub fn decode(bytes: &[u8], password: Option<&Secret>) -> Result<DocumentHandle> {
    let document = Document::load_mem(bytes).map_err(|err| match err {
        lopdf::Error::Decryption(_) if password.is_some() => FalzwerkError::WrongCredential,
        lopdf::Error::Decryption(_) => FalzwerkError::Encrypted,
        other => FalzwerkError::Corrupt(format!("failed to parse PDF: {other}")),
    })?;

    if !document.is_encrypted() {
        debug!(pages = document.get_pages().len(), "PDF decoded");
        return Ok(DocumentHandle::from_document(document));
    }

    let (secret, on_rejected) = match password {
        Some(secret) => (secret.clone(), FalzwerkError::WrongCredential),
        None => (Secret::new(""), FalzwerkError::Encrypted),
    };
    let password_bytes = PasswordAlgorithm::try_from(&document)
        .and_then(|algorithm| Ok(algorithm.sanitize_password(secret.expose())?))
        .map_err(|err| map_decrypt_error(err, FalzwerkError::WrongCredential))?;
    document
        .authenticate_raw_password(&password_bytes)
        .map_err(|err| map_decrypt_error(err, on_rejected))?;
    let state = EncryptionState::decode(&document, &password_bytes)
        .map_err(|err| map_decrypt_error(err, FalzwerkError::WrongCredential))?;

    let file_id = document.trailer.get(b"ID").ok().cloned();
    let document = decrypt_objects(bytes, document, &state)?;
    let pages = document.get_pages().len();
    if pages == 0 {
        return Err(FalzwerkError::Corrupt(
            "encrypted PDF has no readable pages".into(),
        ));
    }

    info!(pages, "Encrypted PDF decoded");
    Ok(DocumentHandle::from_document(document).with_encryption(EncryptionInfo {
        is_encrypted: true,
        user_secret: Some(secret),
        owner_secret: None,
        retained: Some(RetainedEncryption { state, file_id }),
    }))
}

/// Re-read every indirect object of an encrypted file from `bytes` and
/// decrypt it with `state`. The loader only parses the encryption
/// dictionary when the empty password is rejected, so the objects have to
/// be fetched by their xref offsets.
fn decrypt_objects(bytes: &[u8], shell: Document, state: &EncryptionState) -> Result<Document> {
    let encrypt_id = shell
        .trailer
        .get(b"Encrypt")
        .and_then(Object::as_reference)
        .ok();
    let start = bytes.windows(5).position(|w| w == b"%PDF-").unwrap_or(0);
    let reader = Reader {
        buffer: &bytes[start..],
        document: shell,
        encryption_state: None,
        raw_objects: BTreeMap::new(),
    };

    let mut objects = BTreeMap::new();
    for (&number, entry) in &reader.document.reference_table.entries {
        let XrefEntry::Normal { generation, .. } = *entry else {
            continue;
        };
        let id = (number, generation);
        if Some(id) == encrypt_id {
            continue;
        }
        let mut object = match reader.get_object(id, &mut HashSet::new()) {
            Ok(object) => object,
            Err(err) => {
                warn!(?id, %err, "Unreadable object skipped");
                continue;
            }
        };
        if let Err(err) = encryption::decrypt_object(state, id, &mut object) {
            warn!(?id, %err, "Object could not be decrypted; skipped");
            continue;
        }
        objects.insert(id, object);
    }

    let mut packed = Vec::new();
    for object in objects.values_mut() {
        let Ok(stream) = object.as_stream_mut() else {
            continue;
        };
        if !stream.dict.has_type(b"ObjStm") {
            continue;
        }
        if let Ok(unpacked) = ObjectStream::new(stream) {
            packed.extend(unpacked.objects);
        }
    }
    for (id, object) in packed {
        objects.entry(id).or_insert(object);
    }

    let mut document = reader.document;
    document.objects = objects;
    document.trailer.remove(b"Encrypt");
    document.encryption_state = None;
    Ok(document)
}

/// Serialise a handle. An encrypted handle is written encrypted again with
/// its stored secrets.
#[instrument(skip_all, fields(pages = handle.page_count(), encrypted = handle.is_encrypted()))]
pub fn encode(handle: &DocumentHandle, options: EncodeOptions) -> Result<Vec<u8>> {
    let mut document = handle.document.clone();

    if options.optimize {
        optimize(&mut document);
    }
    if options.linearize {
        debug!("Linearization requested; writing a regular file instead");
    }

    if let Some(retained) = handle.encryption.retained.as_ref().filter(|_| handle.is_encrypted()) {
        reapply_encryption(&mut document, retained)?;
    } else if handle.is_encrypted() {
        let user = handle
            .encryption
            .user_secret
            .as_ref()
            .map(Secret::expose)
            .unwrap_or_default();
        let owner = handle
            .encryption
            .owner_secret
            .as_ref()
            .map(Secret::expose)
            .unwrap_or(user);
        apply_encryption(&mut document, user, owner)?;
    }

    save(&mut document)
}

/// Serialise without encryption, for handing pages to a rasterizer.
pub(crate) fn encode_plain(handle: &DocumentHandle) -> Result<Vec<u8>> {
    let mut document = handle.document.clone();
    document.trailer.remove(b"Encrypt");
    save(&mut document)
}

pub(crate) fn optimize(document: &mut Document) {
    let before = document.objects.len();
    document.delete_zero_length_streams();
    document.prune_objects();
    document.compress();
    debug!(before, after = document.objects.len(), "Unreferenced objects pruned");
}

fn save(document: &mut Document) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    document
        .save_to(&mut output)
        .map_err(|err| FalzwerkError::PdfError(format!("failed to serialise PDF: {err}")))?;
    Ok(output)
}

fn apply_encryption(document: &mut Document, user: &str, owner: &str) -> Result<()> {
    ensure_file_id(document);

    let version = EncryptionVersion::V2 {
        document: &*document,
        owner_password: owner,
        user_password: user,
        key_length: KEY_LENGTH_BITS,
        permissions: Permissions::all(),
    };
    let state = EncryptionState::try_from(version)
        .map_err(|err| FalzwerkError::PdfError(format!("cannot derive encryption key: {err}")))?;
    document
        .encrypt(&state)
        .map_err(|err| FalzwerkError::PdfError(format!("failed to encrypt PDF: {err}")))
}

fn reapply_encryption(document: &mut Document, retained: &RetainedEncryption) -> Result<()> {
    match &retained.file_id {
        Some(id) => document.trailer.set("ID", id.clone()),
        None => {
            document.trailer.remove(b"ID");
        }
    }
    document
        .encrypt(&retained.state)
        .map_err(|err| FalzwerkError::PdfError(format!("failed to encrypt PDF: {err}")))
}

/// The standard security handler mixes the first /ID string into the key, so
/// documents built from scratch need one.
fn ensure_file_id(document: &mut Document) {
    if document.trailer.has(b"ID") {
        return;
    }
    let seed = format!(
        "{}:{}:{}",
        document.version,
        document.max_id,
        document.get_pages().len()
    );
    let digest = hash_bytes(seed.as_bytes());
    let id = digest.as_bytes()[..32].to_vec();
    document.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(id.clone(), lopdf::StringFormat::Hexadecimal),
            Object::String(id, lopdf::StringFormat::Hexadecimal),
        ]),
    );
}
