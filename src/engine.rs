//! The batch conversion engine: grouping, dispatch, and accounting.
//!
//! The engine is deliberately synchronous — one batch runs one group at a
//! time, one file at a time, so memory stays bounded and progress is
//! monotone. Callers that need concurrency run whole batches on blocking
//! threads (see [`crate::task::TaskRegistry`]).

use crate::batch;
use crate::capability::CapabilityTable;
use crate::config::EngineConfig;
use crate::descriptor::FileDescriptor;
use crate::error::{ConvertError, Failure};
use crate::format::Format;
use crate::handlers::{ConvertContext, Support};
use crate::outcome::ConversionOutcome;
use crate::progress::{CancelToken, ProgressSink};
use pdfium_render::prelude::Pdfium;
use std::path::Path;
use tracing::{debug, warn};

pub struct ConversionEngine {
    table: CapabilityTable,
    config: EngineConfig,
}

impl ConversionEngine {
    /// Construct with the default configuration.
    ///
    /// Fails fast if the pdfium system library cannot be bound: PDF pairs
    /// would otherwise error lazily on first use, long after startup.
    pub fn new() -> Result<Self, ConvertError> {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Result<Self, ConvertError> {
        bind_pdfium().map_err(|e| ConvertError::PdfiumUnavailable(e.to_string()))?;
        Ok(Self {
            table: CapabilityTable::new(),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn capabilities(&self) -> &CapabilityTable {
        &self.table
    }

    /// Convert a batch of files to `target`, writing into `output_dir`.
    ///
    /// Infallible at the batch level: every source file is accounted for in
    /// the returned outcome as either a success, a failure, or (when
    /// cancelled before its unit started) nothing at all. Files are grouped
    /// by source format and each group dispatches to its pair handler;
    /// groups with no handler surface one failure per file rather than
    /// being dropped silently.
    pub fn convert(
        &self,
        files: &[FileDescriptor],
        target: Format,
        output_dir: &Path,
        dpi: u32,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> ConversionOutcome {
        let mut outcome = ConversionOutcome::default();
        if files.is_empty() {
            return outcome;
        }

        let dpi = EngineConfig::clamp_dpi(dpi);
        let groups = batch::group_by_format(files);
        debug!(
            files = files.len(),
            groups = groups.len(),
            %target,
            dpi,
            "dispatching batch"
        );

        let ctx = ConvertContext {
            output_dir,
            dpi,
            config: &self.config,
            progress,
            cancel,
        };

        for (source, group) in &groups {
            if cancel.is_cancelled() {
                break;
            }
            match self.table.resolve(*source, target) {
                Some(handler) => {
                    let degraded = handler.support() == Support::Degraded;
                    let result = handler.convert(group, &ctx);
                    if degraded {
                        outcome
                            .degraded_paths
                            .extend(result.success_paths.iter().cloned());
                    }
                    outcome.success_paths.extend(result.success_paths);
                    outcome.failures.extend(result.failures);
                }
                None => {
                    warn!(%source, %target, files = group.len(), "unsupported pair in batch");
                    for file in group {
                        outcome.push_failure(Failure::unsupported_pair(
                            file.path(),
                            *source,
                            target,
                        ));
                    }
                }
            }
        }

        debug!(
            succeeded = outcome.success_paths.len(),
            failed = outcome.failures.len(),
            degraded = outcome.degraded_paths.len(),
            "batch finished"
        );
        outcome
    }
}

/// Bind pdfium, preferring an explicit `PDFIUM_DYNAMIC_LIB_PATH` directory
/// over the system library path.
pub(crate) fn bind_pdfium() -> Result<Box<dyn pdfium_render::prelude::PdfiumLibraryBindings>, pdfium_render::prelude::PdfiumError>
{
    if let Ok(dir) = std::env::var("PDFIUM_DYNAMIC_LIB_PATH") {
        return Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&dir));
    }
    Pdfium::bind_to_system_library()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoopProgress;

    // Engine construction binds pdfium, which not every development machine
    // has installed. Tests that need an engine skip instead of failing.
    fn engine() -> Option<ConversionEngine> {
        match ConversionEngine::new() {
            Ok(engine) => Some(engine),
            Err(e) => {
                eprintln!("SKIP: pdfium unavailable ({e})");
                None
            }
        }
    }

    #[test]
    fn empty_batch_yields_empty_outcome() {
        let Some(engine) = engine() else { return };
        let cancel = CancelToken::new();
        let outcome = engine.convert(
            &[],
            Format::Png,
            Path::new("/nonexistent"),
            300,
            &NoopProgress,
            &cancel,
        );
        assert!(outcome.is_empty());
    }

    #[test]
    fn unsupported_group_surfaces_as_failures() {
        let Some(engine) = engine() else { return };
        let files = vec![
            FileDescriptor::new("/in/a.xyz"),
            FileDescriptor::new("/in/b.jpg"),
        ];
        let cancel = CancelToken::new();
        let dir = tempfile::tempdir().unwrap();
        let outcome = engine.convert(
            &files,
            Format::Jpg,
            dir.path(),
            300,
            &NoopProgress,
            &cancel,
        );
        // a.xyz is an unknown source; b.jpg is an identity pair. Neither
        // resolves, both must be reported, nothing silently dropped.
        assert!(outcome.success_paths.is_empty());
        assert_eq!(outcome.failures.len(), 2);
    }

    #[test]
    fn pre_cancelled_batch_does_nothing() {
        let Some(engine) = engine() else { return };
        let files = vec![FileDescriptor::new("/in/a.jpg")];
        let cancel = CancelToken::new();
        cancel.cancel();
        let outcome = engine.convert(
            &files,
            Format::Png,
            Path::new("/nonexistent"),
            300,
            &NoopProgress,
            &cancel,
        );
        assert!(outcome.is_empty());
    }
}
