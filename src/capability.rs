//! The format-pair capability table.
//!
//! The 5×5 conversion matrix is data, not control flow: every supported
//! ordered pair maps to the handler that implements it, so the engine's
//! orchestration never branches on formats. Looking up an unsupported pair
//! (identity pairs, pdf → svg, anything involving `Unknown`) yields no
//! handler rather than a fallback conversion.

use crate::format::Format;
use crate::handlers::merge_pdf::MergePdfHandler;
use crate::handlers::pdf_raster::PdfRasterHandler;
use crate::handlers::raster::RasterHandler;
use crate::handlers::svg::{RasterToSvgHandler, SvgRasterHandler};
use crate::handlers::{PairHandler, Support};
use std::collections::HashMap;

/// Immutable pair → handler mapping, built once at engine construction.
pub struct CapabilityTable {
    handlers: HashMap<(Format, Format), Box<dyn PairHandler>>,
}

impl CapabilityTable {
    /// Build the full supported matrix (19 pairs).
    pub fn new() -> Self {
        use Format::{Jpg, Pdf, Png, Svg, Tiff};

        let mut handlers: HashMap<(Format, Format), Box<dyn PairHandler>> = HashMap::new();

        // PDF sources rasterise per page. pdf -> svg has no handler: a
        // degraded wrapper of a rasterised page would masquerade as a
        // vector conversion of vector source material.
        for target in [Jpg, Png, Tiff] {
            handlers.insert((Pdf, target), Box::new(PdfRasterHandler::new(target)));
        }

        // Flat raster pairs.
        for source in [Jpg, Png, Tiff] {
            for target in [Jpg, Png, Tiff] {
                if source != target {
                    handlers.insert(
                        (source, target),
                        Box::new(RasterHandler::new(source, target)),
                    );
                }
            }
        }

        // Everything -> PDF merges the group into one document.
        for source in [Jpg, Png, Tiff, Svg] {
            handlers.insert((source, Pdf), Box::new(MergePdfHandler::new(source)));
        }

        // SVG sources rasterise; raster -> SVG is the degraded wrapper.
        for target in [Jpg, Png, Tiff] {
            handlers.insert((Svg, target), Box::new(SvgRasterHandler::new(target)));
        }
        for source in [Jpg, Png, Tiff] {
            handlers.insert((source, Svg), Box::new(RasterToSvgHandler::new(source)));
        }

        Self { handlers }
    }

    /// Look up the handler for an ordered pair.
    ///
    /// Pure and total over the format set: identity pairs and pairs
    /// involving [`Format::Unknown`] return `None`.
    pub fn resolve(&self, source: Format, target: Format) -> Option<&dyn PairHandler> {
        if source == target {
            return None;
        }
        self.handlers.get(&(source, target)).map(Box::as_ref)
    }

    /// Fidelity classification for an ordered pair.
    pub fn support(&self, source: Format, target: Format) -> Support {
        match self.resolve(source, target) {
            Some(handler) => handler.support(),
            None => Support::NotSupported,
        }
    }

    /// Target formats reachable from `source`, in matrix order. Used by
    /// front ends to populate target pickers.
    pub fn supported_targets(&self, source: Format) -> Vec<Format> {
        Format::KNOWN
            .iter()
            .copied()
            .filter(|&target| self.resolve(source, target).is_some())
            .collect()
    }

    /// Every supported ordered pair with its fidelity, in matrix order.
    pub fn pairs(&self) -> Vec<(Format, Format, Support)> {
        let mut out = Vec::new();
        for &source in &Format::KNOWN {
            for &target in &Format::KNOWN {
                let support = self.support(source, target);
                if support != Support::NotSupported {
                    out.push((source, target, support));
                }
            }
        }
        out
    }
}

impl Default for CapabilityTable {
    fn default() -> Self {
        Self::new()
    }
}
