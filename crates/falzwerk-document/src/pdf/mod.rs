// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — decode/encode, page-level and document-level operations, and
// PDF creation from images.

pub mod document;
pub mod handle;
pub mod pages;
pub mod text;
pub mod tree;
pub mod writer;

pub use document::{compress, decrypt, encrypt, merge, split};
pub use handle::{DocumentHandle, EncodeOptions, Page, decode, encode};
pub use pages::{extract_pages, rotate, watermark};
pub use writer::images_to_document;
