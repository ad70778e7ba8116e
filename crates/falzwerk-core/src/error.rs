// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Falzwerk.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::human_errors::humanize_error;

/// Top-level error type for all Falzwerk operations.
#[derive(Debug, Error)]
pub enum FalzwerkError {
    // -- Request / parameter errors --
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    // -- Credential errors --
    #[error("document is encrypted and no password was supplied")]
    Encrypted,

    #[error("input document #{index} is encrypted and no password was supplied for it")]
    EncryptedInput { index: usize },

    #[error("the supplied password does not unlock this document")]
    WrongCredential,

    // -- Document errors --
    #[error("corrupt document: {0}")]
    Corrupt(String),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Capabilities and limits --
    #[error("capability not available: {0}")]
    CapabilityUnavailable(String),

    #[error("resource limit exceeded: {0}")]
    ResourceExhausted(String),

    // -- Storage / serialisation --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("archive error: {0}")]
    Archive(String),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FalzwerkError>;

/// Stable classification of a failed operation, independent of the detail
/// message. The request layer maps these onto its own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidParameter,
    UnsupportedFormat,
    Encrypted,
    WrongCredential,
    Corrupt,
    CapabilityUnavailable,
    ResourceExhausted,
    /// Failure of the engine itself (I/O, serialisation) rather than of the input.
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidParameter => "invalid_parameter",
            Self::UnsupportedFormat => "unsupported_format",
            Self::Encrypted => "encrypted",
            Self::WrongCredential => "wrong_credential",
            Self::Corrupt => "corrupt",
            Self::CapabilityUnavailable => "capability_unavailable",
            Self::ResourceExhausted => "resource_exhausted",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FalzwerkError {
    /// Project this error onto its [`ErrorKind`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidParameter(_) => ErrorKind::InvalidParameter,
            Self::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Self::Encrypted | Self::EncryptedInput { .. } => ErrorKind::Encrypted,
            Self::WrongCredential => ErrorKind::WrongCredential,
            // A PDF or image that the codec cannot make sense of is broken input.
            Self::Corrupt(_) | Self::PdfError(_) | Self::ImageError(_) => ErrorKind::Corrupt,
            Self::CapabilityUnavailable(_) => ErrorKind::CapabilityUnavailable,
            Self::ResourceExhausted(_) => ErrorKind::ResourceExhausted,
            Self::Io(_) | Self::Serialization(_) | Self::Archive(_) => ErrorKind::Internal,
        }
    }

    /// Convert into the wire form returned by the dispatcher.
    pub fn to_structured(&self) -> StructuredError {
        StructuredError {
            kind: self.kind(),
            message: self.to_string(),
            suggestion: humanize_error(self).suggestion,
        }
    }
}

/// Kind plus human-readable message, as handed to the request layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredError {
    pub kind: ErrorKind,
    pub message: String,
    /// What the user can do about it, in plain English.
    pub suggestion: String,
}

impl std::fmt::Display for StructuredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for StructuredError {}

impl From<FalzwerkError> for StructuredError {
    fn from(err: FalzwerkError) -> Self {
        err.to_structured()
    }
}
