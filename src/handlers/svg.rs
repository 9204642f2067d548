//! SVG-involving pairs.
//!
//! SVG *sources* are parsed and rasterised with resvg at the requested DPI,
//! so svg → jpg/png/tiff are full-fidelity conversions. The reverse
//! direction has no tracer: raster → svg wraps the pixels in an `<image>`
//! element with a base64 PNG payload. That output is a valid SVG and
//! renders identically, but it is not vector art — the pair is declared
//! [`Support::Degraded`] and its outputs land in
//! [`crate::ConversionOutcome::degraded_paths`].

use super::codec::{self, CodecError};
use super::{ConvertContext, HandlerOutcome, PairHandler, Support};
use crate::descriptor::FileDescriptor;
use crate::error::Failure;
use crate::format::Format;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::DynamicImage;
use std::io::Cursor;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Handler for svg → jpg/png/tiff. One instance per target format.
pub struct SvgRasterHandler {
    target: Format,
}

impl SvgRasterHandler {
    pub fn new(target: Format) -> Self {
        debug_assert!(matches!(target, Format::Jpg | Format::Png | Format::Tiff));
        Self { target }
    }

    fn convert_file(
        &self,
        file: &FileDescriptor,
        ctx: &ConvertContext<'_>,
    ) -> Result<PathBuf, CodecError> {
        let image = codec::rasterize_svg(
            file.path(),
            ctx.dpi,
            ctx.config.svg_base_ppi,
            ctx.config.max_render_edge,
        )?;
        let path = ctx.flat_output(file.base_name(), self.target.target_extension());
        match self.target {
            Format::Jpg => codec::write_jpeg(&image, &path, ctx.config.jpeg_quality)?,
            Format::Png => codec::write_png(&image, &path)?,
            Format::Tiff => codec::write_tiff(&image, &path)?,
            _ => unreachable!("SvgRasterHandler only targets raster formats"),
        }
        Ok(path)
    }
}

impl PairHandler for SvgRasterHandler {
    fn convert(&self, files: &[FileDescriptor], ctx: &ConvertContext<'_>) -> HandlerOutcome {
        let mut outcome = HandlerOutcome::default();
        let total = files.len();

        for (index, file) in files.iter().enumerate() {
            if ctx.cancelled() {
                break;
            }
            match self.convert_file(file, ctx) {
                Ok(path) => {
                    outcome.success_paths.push(path);
                    ctx.report(
                        &format!("Converting: {}", file.name()),
                        codec::unit_percent(index + 1, total),
                    );
                }
                Err(e) => {
                    warn!("svg -> {} failed for {}: {e}", self.target, file.name());
                    outcome.push_failure(Failure::new(file.path(), e.to_string()));
                }
            }
        }
        outcome
    }
}

/// Degraded handler for jpg/png/tiff → svg.
///
/// Multi-frame TIFF sources expand to one wrapper per frame, following the
/// usual `{base}_{n}.svg` page naming.
pub struct RasterToSvgHandler {
    source: Format,
}

impl RasterToSvgHandler {
    pub fn new(source: Format) -> Self {
        debug_assert!(matches!(source, Format::Jpg | Format::Png | Format::Tiff));
        Self { source }
    }

    fn convert_file(
        &self,
        file: &FileDescriptor,
        ctx: &ConvertContext<'_>,
        completed: &mut usize,
        total_units: usize,
    ) -> Result<Vec<PathBuf>, CodecError> {
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
                ctx.page_output(file.base_name(), index, "svg")
            } else {
                ctx.flat_output(file.base_name(), "svg")
            };
            std::fs::write(&path, raster_svg_wrapper(frame)?)?;
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

impl PairHandler for RasterToSvgHandler {
    fn support(&self) -> Support {
        Support::Degraded
    }

    fn convert(&self, files: &[FileDescriptor], ctx: &ConvertContext<'_>) -> HandlerOutcome {
        let mut outcome = HandlerOutcome::default();
        // Unit total from the IFD chain only; each file is pixel-decoded
        // once, inside convert_file.
        let total_units: usize = files
            .iter()
            .map(|f| {
                if self.source == Format::Tiff {
                    codec::count_tiff_frames(f.path()).unwrap_or(1)
                } else {
                    1
                }
            })
            .sum();
        let mut completed = 0usize;

        for file in files {
            if ctx.cancelled() {
                break;
            }
            match self.convert_file(file, ctx, &mut completed, total_units) {
                Ok(paths) => outcome.success_paths.extend(paths),
                Err(e) => {
                    warn!("{} -> svg failed for {}: {e}", self.source, file.name());
                    outcome.push_failure(Failure::new(file.path(), e.to_string()));
                }
            }
        }

        debug!(
            "{} -> svg (degraded): {} wrapper(s) written",
            self.source,
            outcome.success_paths.len()
        );
        outcome
    }
}

/// Build the SVG wrapper document: intrinsic pixel dimensions, one `<image>`
/// element carrying the frame as a base64 PNG data URI. Alpha survives.
fn raster_svg_wrapper(frame: &DynamicImage) -> Result<String, CodecError> {
    let mut png = Vec::new();
    frame.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)?;
    let b64 = STANDARD.encode(&png);
    let (w, h) = (frame.width(), frame.height());
    Ok(format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" \
         xmlns:xlink=\"http://www.w3.org/1999/xlink\" \
         width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n  \
         <image width=\"{w}\" height=\"{h}\" \
         xlink:href=\"data:image/png;base64,{b64}\"/>\n</svg>\n"
    ))
}
