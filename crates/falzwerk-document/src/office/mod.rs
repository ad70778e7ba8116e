// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Office Open XML and CSV writers.

pub mod docx;
pub mod package;
pub mod pptx;
pub mod xlsx;

pub use docx::write_docx;
pub use package::ZipPackage;
pub use pptx::write_pptx;
pub use xlsx::{PageTables, write_csv, write_xlsx};
