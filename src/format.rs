//! The five recognised file formats and their extension mapping.
//!
//! `Format` is derived purely from the (lower-cased) file extension and is
//! never re-detected afterwards; a `FileDescriptor`'s format is fixed at
//! construction time. There is no content sniffing: a mislabeled file fails
//! in its codec, as a per-file failure.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the five recognised file kinds, or `Unknown`.
///
/// `Unknown` exists so that a descriptor for an unrecognised extension can
/// still be represented; the capability table treats any pair involving
/// `Unknown` as unsupported, so such files surface as failures rather than
/// being silently dropped.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Pdf,
    Jpg,
    Png,
    Tiff,
    Svg,
    Unknown,
}

impl Format {
    /// The five formats the conversion matrix is defined over.
    pub const KNOWN: [Format; 5] = [
        Format::Pdf,
        Format::Jpg,
        Format::Png,
        Format::Tiff,
        Format::Svg,
    ];

    /// Derive the format from a file extension.
    ///
    /// Accepts the extension with or without a leading dot, in any case.
    /// `.jpeg` maps to [`Format::Jpg`] and `.tif` to [`Format::Tiff`].
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Format::Pdf,
            "jpg" | "jpeg" => Format::Jpg,
            "png" => Format::Png,
            "tif" | "tiff" => Format::Tiff,
            "svg" => Format::Svg,
            _ => Format::Unknown,
        }
    }

    /// The extension used for *output* files of this format (no dot).
    ///
    /// TIFF outputs use the short `tif` form, matching the historical
    /// on-disk naming contract.
    pub fn target_extension(&self) -> &'static str {
        match self {
            Format::Pdf => "pdf",
            Format::Jpg => "jpg",
            Format::Png => "png",
            Format::Tiff => "tif",
            Format::Svg => "svg",
            Format::Unknown => "",
        }
    }

    /// Whether this is one of the five formats the matrix covers.
    pub fn is_known(&self) -> bool {
        !matches!(self, Format::Unknown)
    }

    /// Whether a single source file of this format can expand into
    /// multiple output pages (PDF documents, multi-frame TIFFs).
    pub fn is_multi_page(&self) -> bool {
        matches!(self, Format::Pdf | Format::Tiff)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Pdf => "pdf",
            Format::Jpg => "jpg",
            Format::Png => "png",
            Format::Tiff => "tiff",
            Format::Svg => "svg",
            Format::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Format::from_extension(s) {
            Format::Unknown => Err(format!(
                "unrecognised format '{s}' (expected one of: pdf, jpg, png, tiff, svg)"
            )),
            f => Ok(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_mapping_is_case_insensitive() {
        assert_eq!(Format::from_extension(".PDF"), Format::Pdf);
        assert_eq!(Format::from_extension("Jpeg"), Format::Jpg);
        assert_eq!(Format::from_extension(".TIF"), Format::Tiff);
        assert_eq!(Format::from_extension("tiff"), Format::Tiff);
        assert_eq!(Format::from_extension(".svg"), Format::Svg);
    }

    #[test]
    fn unrecognised_extension_is_unknown() {
        assert_eq!(Format::from_extension(".bmp"), Format::Unknown);
        assert_eq!(Format::from_extension(""), Format::Unknown);
        assert!(!Format::from_extension(".webp").is_known());
    }

    #[test]
    fn tiff_output_extension_is_short_form() {
        assert_eq!(Format::Tiff.target_extension(), "tif");
        assert_eq!(Format::Jpg.target_extension(), "jpg");
    }

    #[test]
    fn parse_rejects_unknown() {
        assert_eq!("jpeg".parse::<Format>(), Ok(Format::Jpg));
        assert!("bmp".parse::<Format>().is_err());
    }
}
