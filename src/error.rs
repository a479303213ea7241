//! Error types for the docconv library.
//!
//! Two layers reflect two audiences:
//!
//! * [`ConvertError`] — everything that can stop a conversion, with full
//!   context (paths, keys, codec detail). This is what gets logged.
//!
//! * [`ErrorClass`] — a coarse classification of a [`ConvertError`]. The HTTP
//!   handler only ever shows the caller the class message, never the raw
//!   error text, so storage endpoints, bucket names and library internals do
//!   not leak into 500 responses.
//!
//! Request-shape problems (missing body, unsupported pair, bad base64) are not
//! errors here: they are ordinary 400 outcomes built by [`crate::handler`].

use crate::format::Format;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the docconv library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Storage errors ────────────────────────────────────────────────────
    /// A blob-store operation failed.
    #[error("Storage error on '{key}': {source}")]
    Storage {
        key: String,
        #[source]
        source: StorageError,
    },

    // ── Input errors ──────────────────────────────────────────────────────
    /// The input bytes could not be decoded as the declared format.
    #[error("Input is not a valid {format} file: {detail}")]
    InvalidInput { format: Format, detail: String },

    /// The PDF has no pages to render.
    #[error("PDF '{path}' has no pages")]
    EmptyDocument { path: PathBuf },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH to the directory holding libpdfium, or install it system-wide."
    )]
    PdfiumBindingFailed(String),

    /// pdfium returned an error while opening or rendering the document.
    #[error("Rasterisation failed for '{path}': {detail}")]
    RasterisationFailed { path: PathBuf, detail: String },

    // ── Encode errors ─────────────────────────────────────────────────────
    /// The image codec could not produce the target format.
    #[error("Failed to encode {format}: {source}")]
    EncodeFailed {
        format: Format,
        #[source]
        source: image::ImageError,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Scratch-file creation, write or read failed.
    #[error("Scratch file error at '{path}': {source}")]
    Scratch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder or environment validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`ConvertError`] for external reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Object storage rejected or failed a request.
    Storage,
    /// The uploaded file does not match its declared format.
    InvalidInput,
    /// The PDF engine failed.
    Render,
    /// The target format could not be produced.
    Encode,
    /// Anything else.
    Internal,
}

impl ErrorClass {
    /// Message shown to callers; stable and free of internal detail.
    pub fn public_message(self) -> &'static str {
        match self {
            ErrorClass::Storage => "storage service unavailable",
            ErrorClass::InvalidInput => "input file could not be read in the declared format",
            ErrorClass::Render => "document could not be rendered",
            ErrorClass::Encode => "output image could not be encoded",
            ErrorClass::Internal => "internal error",
        }
    }
}

impl ConvertError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ConvertError::Storage { .. } => ErrorClass::Storage,
            ConvertError::InvalidInput { .. } | ConvertError::EmptyDocument { .. } => {
                ErrorClass::InvalidInput
            }
            ConvertError::PdfiumBindingFailed(_) | ConvertError::RasterisationFailed { .. } => {
                ErrorClass::Render
            }
            ConvertError::EncodeFailed { .. } => ErrorClass::Encode,
            ConvertError::Scratch { .. }
            | ConvertError::InvalidConfig(_)
            | ConvertError::Internal(_) => ErrorClass::Internal,
        }
    }

    pub(crate) fn storage(key: impl Into<String>, source: StorageError) -> Self {
        ConvertError::Storage {
            key: key.into(),
            source,
        }
    }
}

/// Errors raised by [`crate::storage::BlobStore`] implementations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("Failed to write '{path}': {source}")]
    LocalWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
