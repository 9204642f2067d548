//! Engine configuration.
//!
//! Every conversion knob lives in [`EngineConfig`], built via its
//! [`EngineConfigBuilder`]. Keeping the knobs in one struct makes it trivial
//! to share a config across worker threads and to log the exact settings a
//! batch ran with.

use crate::error::ConvertError;
use serde::{Deserialize, Serialize};

/// Lowest DPI accepted for rasterisation. Values below are clamped up.
pub const MIN_DPI: u32 = 300;

/// Highest DPI accepted for rasterisation. Values above are clamped down.
pub const MAX_DPI: u32 = 600;

/// DPI used when the caller does not specify one.
pub const DEFAULT_DPI: u32 = 300;

/// Upper bound on a single input file, enforced by the validation helpers.
pub const MAX_FILE_SIZE_MB: u64 = 500;

/// Configuration for a [`crate::engine::ConversionEngine`].
///
/// # Example
/// ```rust
/// use imgconv::EngineConfig;
///
/// let config = EngineConfig::builder()
///     .jpeg_quality(90)
///     .max_render_edge(8000)
///     .build()
///     .unwrap();
/// assert_eq!(config.jpeg_quality, 90);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// JPEG encoder quality, 1–100. Default: 95.
    ///
    /// 95 keeps rendered text legible while staying well under the size of a
    /// lossless encoding; it is also the quality merged-PDF page staging uses,
    /// so the same knob governs both direct JPEG outputs and merge staging.
    pub jpeg_quality: u8,

    /// Maximum rendered edge (width or height) in pixels. Default: 12000.
    ///
    /// A safety cap independent of DPI: a 600-DPI render of an A0 poster
    /// would otherwise allocate tens of thousands of pixels per edge. The
    /// longest edge is capped and the other scales proportionally.
    pub max_render_edge: u32,

    /// Pixels-per-inch an SVG's intrinsic size is defined at. Default: 96.
    ///
    /// CSS defines 1in = 96px, so rasterising an SVG at `dpi` means scaling
    /// by `dpi / 96`.
    pub svg_base_ppi: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 95,
            max_render_edge: 12_000,
            svg_base_ppi: 96,
        }
    }
}

impl EngineConfig {
    /// Create a new builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Clamp a requested DPI into the supported [`MIN_DPI`]–[`MAX_DPI`] range.
    pub fn clamp_dpi(dpi: u32) -> u32 {
        dpi.clamp(MIN_DPI, MAX_DPI)
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn max_render_edge(mut self, px: u32) -> Self {
        self.config.max_render_edge = px.max(100);
        self
    }

    pub fn svg_base_ppi(mut self, ppi: u32) -> Self {
        self.config.svg_base_ppi = ppi.max(1);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<EngineConfig, ConvertError> {
        let c = &self.config;
        if c.jpeg_quality == 0 || c.jpeg_quality > 100 {
            return Err(ConvertError::InvalidConfig(format!(
                "JPEG quality must be 1–100, got {}",
                c.jpeg_quality
            )));
        }
        if c.max_render_edge < 100 {
            return Err(ConvertError::InvalidConfig(
                "max_render_edge must be ≥ 100 px".into(),
            ));
        }
        Ok(self.config)
    }
}
