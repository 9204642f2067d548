//! Error types for the imgconv library.
//!
//! Two distinct types reflect two distinct failure modes:
//!
//! * [`ConvertError`] — **Fatal**: the engine or a request cannot proceed at
//!   all (pdfium missing, invalid configuration, unreadable input during
//!   validation). Returned as `Err(ConvertError)` from constructors and
//!   validation helpers.
//!
//! * [`Failure`] — **Non-fatal**: one source file (or one merge group)
//!   failed, recorded inside [`crate::outcome::ConversionOutcome`] while the
//!   rest of the batch continues. Callers must inspect `failures` even when
//!   `success_paths` is non-empty: both can be populated at once.

use crate::format::Format;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the imgconv library.
///
/// Per-file failures use [`Failure`] and are aggregated in
/// [`crate::outcome::ConversionOutcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Engine construction ───────────────────────────────────────────────
    /// The pdfium shared library could not be bound at engine construction.
    ///
    /// Raised at startup so a missing codec capability never surfaces as a
    /// confusing per-file failure mid-batch.
    #[error(
        "Failed to bind to the pdfium library: {0}\n\
         Set PDFIUM_DYNAMIC_LIB_PATH or install libpdfium on the system\n\
         library path, then restart."
    )]
    PdfiumUnavailable(String),

    // ── Validation errors ─────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// The path exists but is not a regular file.
    #[error("Path is not a file: '{path}'")]
    NotAFile { path: PathBuf },

    /// Extension is not one of the recognised input formats.
    #[error("Unsupported file extension '{extension}' for '{path}'\nSupported: .pdf .jpg .jpeg .png .tif .tiff .svg")]
    UnsupportedExtension { path: PathBuf, extension: String },

    /// File exceeds the configured size ceiling.
    #[error("File too large: '{path}' is {size_mb} MB (limit {limit_mb} MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        limit_mb: u64,
    },

    /// Output directory is missing, not a directory, or not writable.
    #[error("Output directory unavailable: '{path}': {reason}")]
    OutputDirUnavailable { path: PathBuf, reason: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Task registry ─────────────────────────────────────────────────────
    /// No task in the registry carries this id.
    #[error("Unknown task id: '{id}'")]
    TaskNotFound { id: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal failure for a single source file.
///
/// Stored in [`crate::outcome::ConversionOutcome::failures`]. Every input
/// file that produced no output contributes exactly one `Failure`; a file
/// that errors midway through multi-page expansion still yields exactly one
/// entry, never a partial mix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// The source file the error is attributed to.
    pub source_path: PathBuf,
    /// Human-readable reason.
    pub message: String,
}

impl Failure {
    pub fn new(source_path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            message: message.into(),
        }
    }

    /// The failure recorded for every file of a group whose format pair has
    /// no handler.
    pub fn unsupported_pair(source_path: impl Into<PathBuf>, from: Format, to: Format) -> Self {
        Self::new(
            source_path,
            format!("conversion not supported: {from} -> {to}"),
        )
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.source_path.display(), self.message)
    }
}
