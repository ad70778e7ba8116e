// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content fingerprints — SHA-256 digests that name inputs in logs instead of
// client-supplied filenames.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of `data` and return it as a lowercase hex string.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Short content id (first 12 hex digits) for log fields.
pub fn content_id(data: &[u8]) -> String {
    let mut full = hash_bytes(data);
    full.truncate(12);
    full
}
