//! End-to-end conversion tests against the public engine API.
//!
//! Engine construction binds the pdfium system library, so every test here
//! skips (with a SKIP line on stderr) when pdfium is not installed. The
//! handler-level behaviour that does not need pdfium is covered by the unit
//! tests inside the library; these tests exercise grouping, dispatch, and
//! accounting across real files on disk.
//!
//! Run with:
//!   cargo test --test conversions -- --nocapture

use image::{Rgb, RgbImage};
use imgconv::{
    validate_file, CancelToken, ConversionEngine, FileDescriptor, Format, NoopProgress,
    ProgressSink,
};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn engine() -> Option<ConversionEngine> {
    match ConversionEngine::new() {
        Ok(engine) => Some(engine),
        Err(e) => {
            eprintln!("SKIP — pdfium not available: {e}");
            None
        }
    }
}

fn png_fixture(dir: &Path, name: &str) -> FileDescriptor {
    let path = dir.join(name);
    RgbImage::from_pixel(8, 8, Rgb([200, 100, 50]))
        .save(&path)
        .unwrap();
    validate_file(path).unwrap()
}

fn jpg_fixture(dir: &Path, name: &str) -> FileDescriptor {
    let path = dir.join(name);
    RgbImage::from_pixel(8, 8, Rgb([50, 100, 200]))
        .save(&path)
        .unwrap();
    validate_file(path).unwrap()
}

/// Progress sink that records every reported percentage.
struct Recorder(Mutex<Vec<u8>>);

impl ProgressSink for Recorder {
    fn on_progress(&self, _message: &str, percent: u8) {
        self.0.lock().unwrap().push(percent);
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn mixed_batch_converts_every_group() {
    let Some(engine) = engine() else { return };
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    std::fs::create_dir(&out).unwrap();

    let files = vec![
        png_fixture(dir.path(), "one.png"),
        jpg_fixture(dir.path(), "two.jpg"),
    ];
    let cancel = CancelToken::new();
    let outcome = engine.convert(&files, Format::Tiff, &out, 300, &NoopProgress, &cancel);

    assert!(outcome.failures.is_empty(), "{:?}", outcome.failures);
    let mut written: Vec<PathBuf> = outcome.success_paths.clone();
    written.sort();
    assert_eq!(written, vec![out.join("one.tif"), out.join("two.tif")]);
    assert!(outcome.degraded_paths.is_empty());
}

#[test]
fn pdf_to_svg_surfaces_unsupported_failures() {
    let Some(engine) = engine() else { return };
    let dir = tempfile::tempdir().unwrap();
    // Capability is checked before the file is ever opened.
    let files = vec![FileDescriptor::new(dir.path().join("doc.pdf"))];
    let cancel = CancelToken::new();
    let outcome = engine.convert(
        &files,
        Format::Svg,
        dir.path(),
        300,
        &NoopProgress,
        &cancel,
    );

    assert!(outcome.success_paths.is_empty());
    assert_eq!(outcome.failures.len(), 1);
    assert!(
        outcome.failures[0].message.contains("pdf -> svg"),
        "got: {}",
        outcome.failures[0].message
    );
}

#[test]
fn raster_to_svg_outputs_are_marked_degraded() {
    let Some(engine) = engine() else { return };
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    std::fs::create_dir(&out).unwrap();

    let files = vec![png_fixture(dir.path(), "photo.png")];
    let cancel = CancelToken::new();
    let outcome = engine.convert(&files, Format::Svg, &out, 300, &NoopProgress, &cancel);

    assert_eq!(outcome.success_paths, vec![out.join("photo.svg")]);
    assert_eq!(outcome.degraded_paths, outcome.success_paths);
    let doc = std::fs::read_to_string(&outcome.success_paths[0]).unwrap();
    assert!(doc.starts_with("<svg"));
}

#[test]
fn merge_then_rasterise_roundtrip() {
    let Some(engine) = engine() else { return };
    let dir = tempfile::tempdir().unwrap();
    let merged = dir.path().join("merged");
    std::fs::create_dir(&merged).unwrap();

    // Two JPEGs merge into one two-page PDF.
    let files = vec![
        jpg_fixture(dir.path(), "p1.jpg"),
        jpg_fixture(dir.path(), "p2.jpg"),
    ];
    let cancel = CancelToken::new();
    let outcome = engine.convert(&files, Format::Pdf, &merged, 300, &NoopProgress, &cancel);
    assert_eq!(outcome.success_paths.len(), 1, "{:?}", outcome.failures);

    let pdf = &outcome.success_paths[0];
    let name = pdf.file_name().unwrap().to_string_lossy().into_owned();
    assert!(
        Regex::new(r"^output_\d{8}_\d{6}\.pdf$").unwrap().is_match(&name),
        "got: {name}"
    );

    // That PDF rasterises back into one PNG per page.
    let pages = dir.path().join("pages");
    std::fs::create_dir(&pages).unwrap();
    let back = engine.convert(
        &[validate_file(pdf).unwrap()],
        Format::Png,
        &pages,
        300,
        &NoopProgress,
        &cancel,
    );
    assert!(back.failures.is_empty(), "{:?}", back.failures);

    let base = name.trim_end_matches(".pdf");
    let mut produced = back.success_paths.clone();
    produced.sort();
    assert_eq!(
        produced,
        vec![
            pages.join(format!("{base}_1.png")),
            pages.join(format!("{base}_2.png")),
        ]
    );
}

#[test]
fn progress_is_monotone_and_finishes_at_100() {
    let Some(engine) = engine() else { return };
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    std::fs::create_dir(&out).unwrap();

    let files = vec![
        png_fixture(dir.path(), "a.png"),
        png_fixture(dir.path(), "b.png"),
        png_fixture(dir.path(), "c.png"),
    ];
    let recorder = Recorder(Mutex::new(Vec::new()));
    let cancel = CancelToken::new();
    let outcome = engine.convert(&files, Format::Jpg, &out, 300, &recorder, &cancel);
    assert_eq!(outcome.success_paths.len(), 3);

    let reported = recorder.0.into_inner().unwrap();
    assert!(!reported.is_empty());
    assert!(
        reported.windows(2).all(|w| w[0] <= w[1]),
        "progress went backwards: {reported:?}"
    );
    assert_eq!(*reported.last().unwrap(), 100);
}

#[test]
fn cancellation_keeps_finished_work_and_reports_no_phantom_failures() {
    let Some(engine) = engine() else { return };
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    std::fs::create_dir(&out).unwrap();

    let files = vec![
        png_fixture(dir.path(), "a.png"),
        png_fixture(dir.path(), "b.png"),
        png_fixture(dir.path(), "c.png"),
    ];

    // Cancel as soon as the first unit completes.
    struct CancelAfterFirst<'a>(&'a CancelToken);
    impl ProgressSink for CancelAfterFirst<'_> {
        fn on_progress(&self, _message: &str, _percent: u8) {
            self.0.cancel();
        }
    }

    let cancel = CancelToken::new();
    let sink = CancelAfterFirst(&cancel);
    let outcome = engine.convert(&files, Format::Jpg, &out, 300, &sink, &cancel);

    // Exactly the units finished before the flag was observed are claimed;
    // nothing unstarted shows up as a failure.
    assert_eq!(outcome.success_paths, vec![out.join("a.jpg")]);
    assert!(outcome.failures.is_empty());
}
