// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-page results for conversions that degrade page by page.

use falzwerk_core::ErrorKind;
use falzwerk_core::error::{FalzwerkError, Result};
use serde::Serialize;
use tracing::warn;

/// Why one page produced no data. Recorded next to the other pages' results,
/// never raised as an error on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&FalzwerkError> for PageFailure {
    fn from(err: &FalzwerkError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Result for one page. A failed page carries the default (empty) value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageOutcome<T> {
    /// Zero-based page index.
    pub page: usize,
    pub value: T,
    pub failure: Option<PageFailure>,
}

impl<T> PageOutcome<T> {
    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// Fold per-page results, in page order, into outcomes.
///
/// A failed page becomes an empty value plus a [`PageFailure`]. Running out
/// of time aborts the whole operation, and so does a document on which every
/// page failed (reported as `Corrupt`).
pub fn collect_pages<T: Default>(what: &str, results: Vec<Result<T>>) -> Result<Vec<PageOutcome<T>>> {
    for result in &results {
        if let Err(FalzwerkError::ResourceExhausted(message)) = result {
            return Err(FalzwerkError::ResourceExhausted(message.clone()));
        }
    }

    if !results.is_empty() && results.iter().all(Result::is_err) {
        let first = results
            .iter()
            .find_map(|r| r.as_ref().err())
            .map(ToString::to_string)
            .unwrap_or_default();
        return Err(FalzwerkError::Corrupt(format!(
            "{what} failed on all {} pages (first error: {first})",
            results.len()
        )));
    }

    Ok(results
        .into_iter()
        .enumerate()
        .map(|(page, result)| match result {
            Ok(value) => PageOutcome { page, value, failure: None },
            Err(err) => {
                warn!(page, error = %err, "{what} failed for one page; continuing");
                PageOutcome {
                    page,
                    value: T::default(),
                    failure: Some(PageFailure::from(&err)),
                }
            }
        })
        .collect())
}
