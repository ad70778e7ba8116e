// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the browser UI.
//
// Every technical error is mapped to plain English with a clear suggestion.
// Operations are deterministic, so nothing here is ever "try again": either
// the user changes the input or the request cannot succeed.

use crate::error::FalzwerkError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// User must change the input (supply a password, pick other pages).
    ActionRequired,
    /// Cannot be fixed by changing parameters: broken file, missing feature.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Severity level (drives icon/colour in UI).
    pub severity: Severity,
}

/// Convert a `FalzwerkError` into a `HumanError`.
pub fn humanize_error(err: &FalzwerkError) -> HumanError {
    match err {
        FalzwerkError::InvalidParameter(detail) => HumanError {
            message: "Some of the settings for this action aren't valid.".into(),
            suggestion: format!("Check the values you entered and try again. ({detail})"),
            severity: Severity::ActionRequired,
        },

        FalzwerkError::UnsupportedFormat(detail) => HumanError {
            message: "This type of file isn't supported for this action.".into(),
            suggestion: format!("Upload a PDF, or a JPEG/PNG image for image conversions. ({detail})"),
            severity: Severity::ActionRequired,
        },

        FalzwerkError::Encrypted => HumanError {
            message: "This PDF is password protected.".into(),
            suggestion: "Enter the document's password and try again.".into(),
            severity: Severity::ActionRequired,
        },

        FalzwerkError::EncryptedInput { index } => HumanError {
            message: format!("File number {} is password protected.", index + 1),
            suggestion: "Unlock that file first, then merge the unlocked copy.".into(),
            severity: Severity::ActionRequired,
        },

        FalzwerkError::WrongCredential => HumanError {
            message: "That password didn't unlock the PDF.".into(),
            suggestion: "Check the password (it is case sensitive) and try again.".into(),
            severity: Severity::ActionRequired,
        },

        FalzwerkError::Corrupt(_) | FalzwerkError::PdfError(_) => HumanError {
            message: "There's a problem with this PDF file.".into(),
            suggestion: "The file may be damaged. Try opening it on your computer first to check it works, or try a different file.".into(),
            severity: Severity::Permanent,
        },

        FalzwerkError::ImageError(_) => HumanError {
            message: "There's a problem with this image.".into(),
            suggestion: "The image may be damaged or in an unusual format. Try saving it as a JPEG or PNG first.".into(),
            severity: Severity::Permanent,
        },

        FalzwerkError::CapabilityUnavailable(what) => HumanError {
            message: "This feature isn't available on this server.".into(),
            suggestion: format!("The server was started without {what}. Ask the administrator to enable it."),
            severity: Severity::Permanent,
        },

        FalzwerkError::ResourceExhausted(detail) => HumanError {
            message: "This file is too large to process.".into(),
            suggestion: format!("Try a smaller file, fewer pages, or a lower resolution. ({detail})"),
            severity: Severity::ActionRequired,
        },

        FalzwerkError::Io(_) | FalzwerkError::Serialization(_) | FalzwerkError::Archive(_) => {
            HumanError {
                message: "The server had an internal problem.".into(),
                suggestion: "If this keeps happening with the same file, please report it.".into(),
                severity: Severity::Permanent,
            }
        }
    }
}
