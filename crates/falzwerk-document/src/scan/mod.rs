// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanned-page handling: image preparation for recognition and, with the
// `ocr` feature, the ocrs-backed text recognizer.

#[cfg(feature = "ocr")]
pub mod ocr;
pub mod prepare;

pub use prepare::prepare_for_recognition;
