//! Merge-style handlers: an entire group of JPG/PNG/TIFF/SVG files becomes
//! one PDF named `output_{YYYYMMDD_HHMMSS}.pdf`.
//!
//! The group is sorted by file name for deterministic page order, every
//! source page is staged as an opaque JPEG (`_temp_page_{i}.jpg`, one
//! running counter across the whole group), and the staged pages are
//! embedded as DCTDecode image XObjects in a single document. Staging temps
//! are removed unconditionally, merge success or not.
//!
//! Unlike the per-file handlers, a fatal error here fails the whole group:
//! there is only one output unit. Progress is two milestones — 0 before
//! staging, 100 after a successful merge — because nothing useful can be
//! reported until every page is collected.

use super::codec::{self, CodecError};
use super::{ConvertContext, HandlerOutcome, PairHandler};
use crate::descriptor::FileDescriptor;
use crate::error::Failure;
use crate::format::Format;
use chrono::Local;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::PathBuf;
use tracing::{debug, warn};

/// One staged page: an opaque JPEG on disk plus its pixel dimensions.
struct StagedPage {
    temp_path: PathBuf,
    jpeg: Vec<u8>,
    width: u32,
    height: u32,
}

/// Handler for the four … → PDF pairs. One instance per source format.
pub struct MergePdfHandler {
    source: Format,
}

impl MergePdfHandler {
    pub fn new(source: Format) -> Self {
        debug_assert!(matches!(
            source,
            Format::Jpg | Format::Png | Format::Tiff | Format::Svg
        ));
        Self { source }
    }

    /// Decode one source file into page images, in page order.
    fn load_pages(
        &self,
        file: &FileDescriptor,
        ctx: &ConvertContext<'_>,
    ) -> Result<Vec<image::DynamicImage>, CodecError> {
        match self.source {
            Format::Tiff => codec::decode_tiff_frames(file.path()),
            Format::Svg => Ok(vec![codec::rasterize_svg(
                file.path(),
                ctx.dpi,
                ctx.config.svg_base_ppi,
                ctx.config.max_render_edge,
            )?]),
            _ => Ok(vec![image::open(file.path())?]),
        }
    }

    /// Stage every page of one file as `_temp_page_{counter}.jpg`.
    fn stage_file(
        &self,
        file: &FileDescriptor,
        ctx: &ConvertContext<'_>,
        counter: &mut usize,
    ) -> Result<Vec<StagedPage>, CodecError> {
        let mut staged = Vec::new();
        for page in self.load_pages(file, ctx)? {
            let jpeg = codec::encode_jpeg_bytes(&page, ctx.config.jpeg_quality)?;
            let temp_path = ctx.output_dir.join(format!("_temp_page_{counter}.jpg"));
            std::fs::write(&temp_path, &jpeg)?;
            staged.push(StagedPage {
                temp_path,
                jpeg,
                width: page.width(),
                height: page.height(),
            });
            *counter += 1;
        }
        Ok(staged)
    }
}

impl PairHandler for MergePdfHandler {
    fn convert(&self, files: &[FileDescriptor], ctx: &ConvertContext<'_>) -> HandlerOutcome {
        let mut outcome = HandlerOutcome::default();
        ctx.report("Merging files...", 0);

        // Deterministic page order regardless of submission order.
        let mut sorted: Vec<&FileDescriptor> = files.iter().collect();
        sorted.sort_by(|a, b| a.name().cmp(b.name()));

        let mut staged: Vec<StagedPage> = Vec::new();
        let mut temp_counter = 0usize;
        let mut cancelled = false;

        for file in &sorted {
            if ctx.cancelled() {
                cancelled = true;
                break;
            }
            match self.stage_file(file, ctx, &mut temp_counter) {
                Ok(pages) => staged.extend(pages),
                Err(e) => {
                    warn!("staging failed for {}: {e}", file.name());
                    outcome.push_failure(Failure::new(file.path(), e.to_string()));
                }
            }
        }

        if !cancelled && !staged.is_empty() {
            let name = format!("output_{}.pdf", Local::now().format("%Y%m%d_%H%M%S"));
            let output_path = ctx.output_dir.join(name);

            match write_merged_pdf(&staged, ctx.dpi, &output_path) {
                Ok(()) => {
                    debug!(
                        "{} -> pdf: merged {} page(s) into {}",
                        self.source,
                        staged.len(),
                        output_path.display()
                    );
                    outcome.success_paths.push(output_path);
                    cleanup(&staged);
                    ctx.report("Merge complete", 100);
                    return outcome;
                }
                Err(e) => {
                    // Fatal to the group: every file that survived staging
                    // gets the merge error attributed to it.
                    warn!("{} -> pdf merge failed: {e}", self.source);
                    let already_failed: Vec<PathBuf> = outcome
                        .failures
                        .iter()
                        .map(|f| f.source_path.clone())
                        .collect();
                    for file in &sorted {
                        if !already_failed.contains(&file.path().to_path_buf()) {
                            outcome.push_failure(Failure::new(file.path(), e.to_string()));
                        }
                    }
                }
            }
        }

        cleanup(&staged);
        outcome
    }
}

/// Remove staging temps, best-effort. Failure to delete is swallowed.
fn cleanup(staged: &[StagedPage]) {
    for page in staged {
        if let Err(e) = std::fs::remove_file(&page.temp_path) {
            debug!("could not remove {}: {e}", page.temp_path.display());
        }
    }
}

/// Assemble staged JPEG pages into one PDF document.
///
/// Each page becomes an image XObject with a DCTDecode filter (the JPEG
/// bytes embedded as-is) drawn to fill a media box sized so the image prints
/// at `dpi`.
fn write_merged_pdf(
    staged: &[StagedPage],
    dpi: u32,
    output_path: &std::path::Path,
) -> Result<(), CodecError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::with_capacity(staged.len());

    for page in staged {
        let image_dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => page.width as i64,
            "Height" => page.height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        };
        let image_id =
            doc.add_object(Stream::new(image_dict, page.jpeg.clone()).with_compression(false));

        let width_pt = page.width as f32 * 72.0 / dpi as f32;
        let height_pt = page.height as f32 * 72.0 / dpi as f32;

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        width_pt.into(),
                        0.into(),
                        0.into(),
                        height_pt.into(),
                        0.into(),
                        0.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), width_pt.into(), height_pt.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    doc.save(output_path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::progress::{CancelToken, NoopProgress};
    use image::{Rgb, RgbImage};
    use regex::Regex;
    use std::path::Path;

    fn ctx<'a>(
        out: &'a Path,
        config: &'a EngineConfig,
        cancel: &'a CancelToken,
    ) -> ConvertContext<'a> {
        ConvertContext {
            output_dir: out,
            dpi: 300,
            config,
            progress: &NoopProgress,
            cancel,
        }
    }

    fn jpeg_fixture(dir: &Path, name: &str) -> FileDescriptor {
        let path = dir.join(name);
        RgbImage::from_pixel(6, 4, Rgb([120, 130, 140]))
            .save(&path)
            .unwrap();
        FileDescriptor::new(path)
    }

    fn leftover_temps(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with("_temp_page_"))
            .collect()
    }

    #[test]
    fn group_merges_into_one_timestamped_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![jpeg_fixture(dir.path(), "b.jpg"), jpeg_fixture(dir.path(), "a.jpg")];

        let config = EngineConfig::default();
        let cancel = CancelToken::new();
        let handler = MergePdfHandler::new(Format::Jpg);
        let outcome = handler.convert(&files, &ctx(dir.path(), &config, &cancel));

        assert_eq!(outcome.success_paths.len(), 1);
        assert!(outcome.failures.is_empty());

        let name = outcome.success_paths[0]
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned();
        let pattern = Regex::new(r"^output_\d{8}_\d{6}\.pdf$").unwrap();
        assert!(pattern.is_match(&name), "got: {name}");

        let doc = Document::load(&outcome.success_paths[0]).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
        assert!(leftover_temps(dir.path()).is_empty(), "staging temps leaked");
    }

    #[test]
    fn staging_failure_does_not_sink_the_group() {
        let dir = tempfile::tempdir().unwrap();
        let good = jpeg_fixture(dir.path(), "page.jpg");
        let bad_path = dir.path().join("corrupt.jpg");
        std::fs::write(&bad_path, b"not a jpeg").unwrap();

        let config = EngineConfig::default();
        let cancel = CancelToken::new();
        let handler = MergePdfHandler::new(Format::Jpg);
        let outcome = handler.convert(
            &[FileDescriptor::new(&bad_path), good],
            &ctx(dir.path(), &config, &cancel),
        );

        assert_eq!(outcome.success_paths.len(), 1);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].source_path, bad_path);
        let doc = Document::load(&outcome.success_paths[0]).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn cancelled_group_produces_nothing_and_leaks_no_temps() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![jpeg_fixture(dir.path(), "x.jpg")];

        let config = EngineConfig::default();
        let cancel = CancelToken::new();
        cancel.cancel();
        let handler = MergePdfHandler::new(Format::Jpg);
        let outcome = handler.convert(&files, &ctx(dir.path(), &config, &cancel));

        assert!(outcome.success_paths.is_empty());
        assert!(outcome.failures.is_empty());
        assert!(leftover_temps(dir.path()).is_empty());
    }
}
