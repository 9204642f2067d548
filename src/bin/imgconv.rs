//! CLI binary for imgconv.
//!
//! A thin shim over the library crate that maps CLI flags to an
//! `EngineConfig`, runs one batch, and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use imgconv::{
    validate_file, validate_output_dir, CancelToken, ConversionEngine, ConversionOutcome,
    EngineConfig, Format, Support, DEFAULT_DPI, MAX_DPI, MIN_DPI,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Rasterise a PDF to PNG pages (scan_1.png, scan_2.png, ...)
  imgconv scan.pdf --to png --out pages/

  # Convert a mixed batch; files group by source format automatically
  imgconv a.jpg b.png c.tiff --to png --out converted/

  # Merge images into one timestamped PDF (one per source format group)
  imgconv *.jpg --to pdf --out merged/

  # High-resolution SVG rasterisation
  imgconv logo.svg --to png --dpi 600 --out renders/

  # Machine-readable outcome
  imgconv scan.pdf --to jpg --out pages/ --json > outcome.json

  # What conversions are available?
  imgconv --list-formats

OUTPUT NAMING:
  single output        {base}.{ext}
  per page / frame     {base}_{n}.{ext}   (1-indexed)
  merged PDF           output_YYYYMMDD_HHMMSS.pdf

ENVIRONMENT VARIABLES:
  RUST_LOG                  Tracing filter (overrides -v/-q defaults)
  PDFIUM_DYNAMIC_LIB_PATH   Path to an existing libpdfium shared library
"#;

/// Convert documents and images between PDF, JPG, PNG, TIFF, and SVG.
#[derive(Parser, Debug)]
#[command(
    name = "imgconv",
    version,
    about = "Batch-convert documents and images between PDF, JPG, PNG, TIFF, and SVG",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input files (any mix of supported formats).
    #[arg(required_unless_present = "list_formats")]
    files: Vec<PathBuf>,

    /// Target format: pdf, jpg, png, tiff, svg.
    #[arg(long, value_parser = parse_format, required_unless_present = "list_formats")]
    to: Option<Format>,

    /// Output directory (created if missing).
    #[arg(short, long, default_value = ".")]
    out: PathBuf,

    /// Rasterisation DPI. Values outside the range are clamped.
    #[arg(long, default_value_t = DEFAULT_DPI,
          help = format!("Rasterisation DPI ({MIN_DPI}-{MAX_DPI}, clamped)"))]
    dpi: u32,

    /// JPEG encoder quality, 1-100.
    #[arg(long, default_value_t = 95)]
    quality: u8,

    /// Print the outcome as JSON instead of the human summary.
    #[arg(long)]
    json: bool,

    /// Disable the progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Print the supported conversion matrix and exit.
    #[arg(long)]
    list_formats: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors and the final summary.
    #[arg(short, long)]
    quiet: bool,
}

fn parse_format(s: &str) -> core::result::Result<Format, String> {
    s.parse::<Format>()
        .map_err(|_| format!("unknown format '{s}' (expected pdf, jpg, png, tiff, or svg)"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar owns the terminal while active; keep library logs
    // quiet unless the user asked for them.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    let config = EngineConfig::builder()
        .jpeg_quality(cli.quality)
        .build()
        .context("Invalid configuration")?;
    let engine =
        ConversionEngine::with_config(config).context("PDF engine (pdfium) is not available")?;

    if cli.list_formats {
        print_matrix(&engine);
        return Ok(());
    }
    let target = cli.to.expect("clap enforces --to unless --list-formats");

    // ── Validate inputs ──────────────────────────────────────────────────
    let mut files = Vec::with_capacity(cli.files.len());
    for path in &cli.files {
        let descriptor =
            validate_file(path).with_context(|| format!("Cannot convert {}", path.display()))?;
        files.push(descriptor);
    }
    validate_output_dir(&cli.out)
        .with_context(|| format!("Output directory {} is not usable", cli.out.display()))?;

    // ── Run the batch on a blocking thread; Ctrl-C cancels it ────────────
    let bar = if show_progress {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}%  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Some(bar)
    } else {
        None
    };

    let cancel = CancelToken::new();
    let worker_cancel = cancel.clone();
    let worker_bar = bar.clone();
    let engine = Arc::new(engine);
    let worker_engine = Arc::clone(&engine);
    let out_dir = cli.out.clone();
    let dpi = cli.dpi;
    let mut worker = tokio::task::spawn_blocking(move || {
        let sink = move |message: &str, percent: u8| {
            if let Some(ref bar) = worker_bar {
                bar.set_position(u64::from(percent));
                bar.set_message(message.to_string());
            }
        };
        worker_engine.convert(&files, target, &out_dir, dpi, &sink, &worker_cancel)
    });

    let outcome = tokio::select! {
        result = &mut worker => result.context("Conversion thread panicked")?,
        _ = tokio::signal::ctrl_c() => {
            cancel.cancel();
            if let Some(ref bar) = bar {
                bar.set_message("cancelling...".to_string());
            }
            (&mut worker).await.context("Conversion thread panicked")?
        }
    };
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    // ── Report ───────────────────────────────────────────────────────────
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("Failed to serialise outcome")?
        );
    } else {
        print_summary(&outcome, cancel.is_cancelled());
    }

    if outcome.success_paths.is_empty() && !outcome.failures.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_summary(outcome: &ConversionOutcome, cancelled: bool) {
    for path in &outcome.success_paths {
        let mark = if outcome.degraded_paths.contains(path) {
            cyan("~")
        } else {
            green("✓")
        };
        eprintln!("  {mark} {}", path.display());
    }
    for failure in &outcome.failures {
        eprintln!(
            "  {} {}  {}",
            red("✗"),
            failure.source_path.display(),
            red(&failure.message)
        );
    }

    let written = outcome.success_paths.len();
    let failed = outcome.failures.len();
    if cancelled {
        eprintln!("{} cancelled after {written} output(s)", cyan("⚠"));
    } else if failed == 0 {
        eprintln!("{} {} output(s) written", green("✔"), bold(&written.to_string()));
    } else {
        eprintln!(
            "{} {written} output(s) written, {} failed",
            if written == 0 { red("✘") } else { cyan("⚠") },
            red(&failed.to_string())
        );
    }
    if !outcome.degraded_paths.is_empty() {
        eprintln!(
            "   {}",
            dim(&format!(
                "{} output(s) are raster-embedded SVG, not true vector art",
                outcome.degraded_paths.len()
            ))
        );
    }
}

fn print_matrix(engine: &ConversionEngine) {
    println!("Supported conversions (source → target):");
    for source in Format::KNOWN {
        let targets: Vec<String> = engine
            .capabilities()
            .supported_targets(source)
            .into_iter()
            .map(|target| {
                match engine.capabilities().support(source, target) {
                    Support::Degraded => format!("{target} (degraded)"),
                    _ => target.to_string(),
                }
            })
            .collect();
        println!("  {source:<5} → {}", targets.join(", "));
    }
}
