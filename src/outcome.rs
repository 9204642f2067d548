//! Aggregated result of one engine invocation.

use crate::error::Failure;
use serde::Serialize;
use std::path::PathBuf;

/// What a conversion produced: output paths, per-file failures, and the
/// subset of outputs that came from a degraded (best-effort) handler.
///
/// Invariant: with no cancellation, every input file either contributes
/// ≥ 0 entries to `success_paths` (one per page, or a share of a merged
/// output) or exactly one entry to `failures` — never both, never neither.
/// Cancellation relaxes this: units not started are simply omitted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversionOutcome {
    /// Output file paths in production order (ascending page order within a
    /// file, submission order across a group).
    pub success_paths: Vec<PathBuf>,
    /// One entry per failed source file, in encounter order.
    pub failures: Vec<Failure>,
    /// Outputs produced by a degraded handler (raster-embedded SVG). Always
    /// a subset of `success_paths`; listed separately so callers never
    /// mistake a best-effort substitute for a faithful conversion.
    pub degraded_paths: Vec<PathBuf>,
}

impl ConversionOutcome {
    pub fn is_empty(&self) -> bool {
        self.success_paths.is_empty() && self.failures.is_empty()
    }

    /// Fold another outcome into this one, preserving order.
    pub fn absorb(&mut self, other: ConversionOutcome) {
        self.success_paths.extend(other.success_paths);
        self.failures.extend(other.failures);
        self.degraded_paths.extend(other.degraded_paths);
    }

    /// Record one failure.
    pub fn push_failure(&mut self, failure: Failure) {
        self.failures.push(failure);
    }
}
