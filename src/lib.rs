//! # imgconv
//!
//! Batch document and image format conversion: PDF, JPEG, PNG, TIFF, and SVG,
//! dispatched per format pair with progress reporting and cooperative
//! cancellation.
//!
//! ## Why this crate?
//!
//! Shelling out to a zoo of single-purpose converters (pdftoppm, ImageMagick,
//! rsvg-convert) means a zoo of naming conventions, error formats, and
//! progress stories. This crate puts the whole 5×5 conversion matrix behind
//! one engine with one behavioural contract: group by source format, dispatch
//! each group to its pair handler, isolate per-file failures, and account for
//! every input in the outcome.
//!
//! ## Pipeline Overview
//!
//! ```text
//! files
//!  │
//!  ├─ 1. Validate  existence, extension, size cap (per file)
//!  ├─ 2. Group     BTreeMap by source format, submission order kept
//!  ├─ 3. Resolve   capability table → pair handler (or per-file failure)
//!  ├─ 4. Convert   sequential units, progress + cancel at unit boundaries
//!  └─ 5. Account   success paths / failures / degraded paths
//! ```
//!
//! Multi-page sources (PDF pages, TIFF frames) fan out to `{base}_{n}.{ext}`;
//! single-frame conversions write `{base}.{ext}`; merges to PDF produce one
//! timestamped `output_YYYYMMDD_HHMMSS.pdf` per source-format group.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use imgconv::{validate_file, CancelToken, ConversionEngine, Format, NoopProgress};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = ConversionEngine::new()?; // binds pdfium, fails fast
//!     let files = vec![validate_file("scan.pdf")?];
//!     let cancel = CancelToken::new();
//!     let outcome = engine.convert(
//!         &files,
//!         Format::Png,
//!         std::path::Path::new("out"),
//!         300,
//!         &NoopProgress,
//!         &cancel,
//!     );
//!     println!("{} written, {} failed", outcome.success_paths.len(), outcome.failures.len());
//!     Ok(())
//! }
//! ```
//!
//! For async front ends, [`TaskRegistry`] runs batches on blocking threads
//! and exposes poll-by-id status and cancellation.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `imgconv` binary (clap + indicatif + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! imgconv = { version = "0.4", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod capability;
pub mod config;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod format;
pub mod handlers;
pub mod outcome;
pub mod progress;
pub mod task;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{group_by_format, summarize, BatchSummary};
pub use capability::CapabilityTable;
pub use config::{EngineConfig, EngineConfigBuilder, DEFAULT_DPI, MAX_DPI, MAX_FILE_SIZE_MB, MIN_DPI};
pub use descriptor::{unique_output_path, validate_file, validate_output_dir, FileDescriptor};
pub use engine::ConversionEngine;
pub use error::{ConvertError, Failure};
pub use format::Format;
pub use handlers::{PairHandler, Support};
pub use outcome::ConversionOutcome;
pub use progress::{CancelToken, NoopProgress, ProgressSink};
pub use task::{ConversionRequest, ConversionTask, TaskRegistry, TaskStatus};
