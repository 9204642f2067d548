//! Flat raster ↔ raster conversions: JPG/PNG/TIFF sources to JPG/PNG/TIFF
//! targets.
//!
//! Single-frame sources produce one `{base}.{ext}` output each. Multi-frame
//! TIFF sources expand to `{base}_{n}.{ext}`, one per frame in ascending
//! frame order. The unit total for progress is computed up front by counting
//! frames across the whole group, so a batch of mixed flat and multi-frame
//! files reports a single monotone percentage.

use super::codec::{self, CodecError};
use super::{ConvertContext, HandlerOutcome, PairHandler};
use crate::descriptor::FileDescriptor;
use crate::error::Failure;
use crate::format::Format;
use image::DynamicImage;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Handler for the six flat raster pairs. One instance per (source, target).
pub struct RasterHandler {
    source: Format,
    target: Format,
}

impl RasterHandler {
    pub fn new(source: Format, target: Format) -> Self {
        debug_assert!(matches!(source, Format::Jpg | Format::Png | Format::Tiff));
        debug_assert!(matches!(target, Format::Jpg | Format::Png | Format::Tiff));
        debug_assert_ne!(source, target);
        Self { source, target }
    }

    fn write(&self, image: &DynamicImage, path: &PathBuf, ctx: &ConvertContext<'_>) -> Result<(), CodecError> {
        match self.target {
            Format::Jpg => codec::write_jpeg(image, path, ctx.config.jpeg_quality),
            Format::Png => codec::write_png(image, path),
            Format::Tiff => codec::write_tiff(image, path),
            _ => unreachable!("RasterHandler only targets raster formats"),
        }
    }

    /// Number of output units one source file will produce.
    fn unit_count(&self, file: &FileDescriptor) -> usize {
        if self.source == Format::Tiff {
            codec::count_tiff_frames(file.path()).unwrap_or(1)
        } else {
            1
        }
    }

    /// Convert one source file; returns the output paths or the error that
    /// aborted it. `completed` tracks group-wide finished units for progress.
    fn convert_file(
        &self,
        file: &FileDescriptor,
        ctx: &ConvertContext<'_>,
        completed: &mut usize,
        total_units: usize,
    ) -> Result<Vec<PathBuf>, CodecError> {
        let ext = self.target.target_extension();

        let frames: Vec<DynamicImage> = if self.source == Format::Tiff {
            codec::decode_tiff_frames(file.path())?
        } else {
            vec![image::open(file.path())?]
        };

        let multi = frames.len() > 1;
        let mut written = Vec::with_capacity(frames.len());
        for (index, frame) in frames.iter().enumerate() {
            if ctx.cancelled() {
                break;
            }
            let path = if multi {
                ctx.page_output(file.base_name(), index, ext)
            } else {
                ctx.flat_output(file.base_name(), ext)
            };
            self.write(frame, &path, ctx)?;
            written.push(path);
            *completed += 1;
            ctx.report(
                &format!("Converting: {}", file.name()),
                codec::unit_percent(*completed, total_units),
            );
        }
        Ok(written)
    }
}

impl PairHandler for RasterHandler {
    fn convert(&self, files: &[FileDescriptor], ctx: &ConvertContext<'_>) -> HandlerOutcome {
        let mut outcome = HandlerOutcome::default();

        // Unit total before any work starts (frame counts for TIFF sources,
        // one per flat file).
        let total_units: usize = files.iter().map(|f| self.unit_count(f)).sum();
        let mut completed = 0usize;

        for file in files {
            if ctx.cancelled() {
                break;
            }
            match self.convert_file(file, ctx, &mut completed, total_units) {
                Ok(paths) => outcome.success_paths.extend(paths),
                Err(e) => {
                    warn!("{} -> {} failed for {}: {e}", self.source, self.target, file.name());
                    outcome.push_failure(Failure::new(file.path(), e.to_string()));
                }
            }
        }

        debug!(
            "{} -> {}: {} output(s), {} failure(s)",
            self.source,
            self.target,
            outcome.success_paths.len(),
            outcome.failures.len()
        );
        outcome
    }
}
