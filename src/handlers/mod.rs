//! Format-pair handlers: the routines behind each supported (source, target)
//! cell of the conversion matrix.
//!
//! Each submodule implements one family of pairs:
//!
//! 1. [`pdf_raster`] — PDF → JPG/PNG/TIFF, one output per page, rasterised
//!    via pdfium
//! 2. [`raster`]     — flat raster ↔ raster (JPG/PNG/TIFF), with multi-frame
//!    TIFF sources expanding one output per frame
//! 3. [`merge_pdf`]  — anything → PDF: the whole group merges into a single
//!    timestamped document
//! 4. [`svg`]        — SVG sources rasterised via resvg; raster → SVG as an
//!    explicitly degraded base64-embed wrapper
//!
//! Behavioural rules shared by every handler (cancellation at unit
//! boundaries, one failure entry per failed file, alpha flattening before
//! opaque targets, the output naming contract) are documented on
//! [`PairHandler::convert`] and enforced in each implementation.

pub(crate) mod codec;
pub(crate) mod merge_pdf;
pub(crate) mod pdf_raster;
pub(crate) mod raster;
pub(crate) mod svg;

use crate::config::EngineConfig;
use crate::descriptor::FileDescriptor;
use crate::error::Failure;
use crate::progress::{CancelToken, ProgressSink};
use std::path::{Path, PathBuf};

/// How faithfully a pair handler reproduces the target format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Support {
    /// A genuine encoder exists for the pair.
    Full,
    /// The pair is served by a best-effort substitute (raster content
    /// embedded in an SVG wrapper rather than true vector output). Outputs
    /// are reported in [`crate::ConversionOutcome::degraded_paths`].
    Degraded,
    /// No handler exists; files of such a group surface as failures.
    NotSupported,
}

/// Everything a handler needs beyond the file group itself.
///
/// Borrowed for the duration of one group dispatch; handlers hold no state
/// across calls.
pub struct ConvertContext<'a> {
    pub output_dir: &'a Path,
    /// Already clamped to the supported range by the engine.
    pub dpi: u32,
    pub config: &'a EngineConfig,
    pub progress: &'a dyn ProgressSink,
    pub cancel: &'a CancelToken,
}

impl ConvertContext<'_> {
    pub fn report(&self, message: &str, percent: u8) {
        self.progress.on_progress(message, percent);
    }

    pub fn cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// `output_dir/base.ext` — the flat-output naming contract.
    pub fn flat_output(&self, base: &str, ext: &str) -> PathBuf {
        self.output_dir.join(format!("{base}.{ext}"))
    }

    /// `output_dir/base_{page}.ext` (1-indexed) — the per-page contract.
    pub fn page_output(&self, base: &str, page_index: usize, ext: &str) -> PathBuf {
        self.output_dir
            .join(format!("{base}_{}.{ext}", page_index + 1))
    }
}

/// Result of one handler invocation over one format group.
#[derive(Debug, Default)]
pub struct HandlerOutcome {
    pub success_paths: Vec<PathBuf>,
    pub failures: Vec<Failure>,
}

impl HandlerOutcome {
    pub fn push_failure(&mut self, failure: Failure) {
        self.failures.push(failure);
    }
}

/// The conversion routine for one ordered (source, target) format pair.
///
/// Implementations must uphold the shared behavioural contract:
///
/// * check `ctx.cancelled()` before starting each unit of work and stop
///   without recording failures for unstarted units;
/// * isolate per-file errors — one bad file never aborts its siblings
///   (merge handlers excepted: their single output makes errors fatal to
///   the group);
/// * a file that fails midway through multi-page expansion contributes no
///   success entries and exactly one failure entry;
/// * report progress after each completed unit as
///   `round(completed / total × 100)`.
pub trait PairHandler: Send + Sync {
    /// Fidelity of this handler's output. Defaults to [`Support::Full`].
    fn support(&self) -> Support {
        Support::Full
    }

    /// Convert one format group. Infallible at the group level for per-file
    /// handlers: errors are captured per file inside the outcome.
    fn convert(&self, files: &[FileDescriptor], ctx: &ConvertContext<'_>) -> HandlerOutcome;
}
