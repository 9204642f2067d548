//! PDF → JPG/PNG/TIFF: rasterise each page via pdfium, one output per page.
//!
//! pdfium wraps a C++ library with thread-local state; each invocation binds
//! its own instance rather than sharing one across threads. The engine has
//! already probed the binding at construction, so a bind failure here is
//! unexpected and recorded against the file rather than panicking.

use super::codec::{self, CodecError};
use super::{ConvertContext, HandlerOutcome, PairHandler};
use crate::descriptor::FileDescriptor;
use crate::error::Failure;
use crate::format::Format;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Handler for the three PDF → raster pairs. One instance per target format.
pub struct PdfRasterHandler {
    target: Format,
}

impl PdfRasterHandler {
    pub fn new(target: Format) -> Self {
        debug_assert!(matches!(target, Format::Jpg | Format::Png | Format::Tiff));
        Self { target }
    }

    fn write_page(
        &self,
        image: &DynamicImage,
        path: &PathBuf,
        ctx: &ConvertContext<'_>,
    ) -> Result<(), CodecError> {
        match self.target {
            Format::Jpg => codec::write_jpeg(image, path, ctx.config.jpeg_quality),
            Format::Png => codec::write_png(image, path),
            Format::Tiff => codec::write_tiff(image, path),
            _ => unreachable!("PdfRasterHandler only targets raster formats"),
        }
    }

    /// Render and write every page of one document. Returns the page paths,
    /// or the error that aborted the file. Pages written before a
    /// mid-document error stay on disk but are not claimed as successes.
    fn convert_file(
        &self,
        file: &FileDescriptor,
        ctx: &ConvertContext<'_>,
    ) -> Result<Vec<PathBuf>, CodecError> {
        let bindings = crate::engine::bind_pdfium()
            .map_err(|e| CodecError::Unsupported(format!("pdfium unavailable: {e}")))?;
        let pdfium = Pdfium::new(bindings);

        let document = pdfium
            .load_pdf_from_file(file.path(), None)
            .map_err(|e| CodecError::Unsupported(format!("cannot open PDF: {e}")))?;

        let pages = document.pages();
        let total = pages.len() as usize;
        let ext = self.target.target_extension();
        ctx.report(&format!("Converting: {}", file.name()), 0);

        let mut written = Vec::with_capacity(total);
        for (index, page) in pages.iter().enumerate() {
            if ctx.cancelled() {
                break;
            }

            // Pixel width from the page's physical size at the requested
            // DPI, capped by the configured edge limit.
            let width_px = (page.width().value / 72.0 * ctx.dpi as f32).round() as i32;
            let cap = ctx.config.max_render_edge as i32;
            let render_config = PdfRenderConfig::new()
                .set_target_width(width_px.min(cap).max(1))
                .set_maximum_height(cap);

            let bitmap = page
                .render_with_config(&render_config)
                .map_err(|e| CodecError::Unsupported(format!("page {}: {e}", index + 1)))?;
            let image = bitmap.as_image();

            let path = ctx.page_output(file.base_name(), index, ext);
            self.write_page(&image, &path, ctx)?;
            written.push(path);

            ctx.report(
                &format!("Converting: {} ({}/{})", file.name(), index + 1, total),
                codec::unit_percent(index + 1, total),
            );
        }
        Ok(written)
    }
}

impl PairHandler for PdfRasterHandler {
    fn convert(&self, files: &[FileDescriptor], ctx: &ConvertContext<'_>) -> HandlerOutcome {
        let mut outcome = HandlerOutcome::default();

        for file in files {
            if ctx.cancelled() {
                break;
            }
            match self.convert_file(file, ctx) {
                Ok(paths) => outcome.success_paths.extend(paths),
                Err(e) => {
                    warn!("PDF conversion failed for {}: {e}", file.name());
                    outcome.push_failure(Failure::new(file.path(), e.to_string()));
                }
            }
        }

        debug!(
            "pdf -> {}: {} output(s), {} failure(s)",
            self.target,
            outcome.success_paths.len(),
            outcome.failures.len()
        );
        outcome
    }
}
