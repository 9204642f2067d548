//! Source-file metadata and validation helpers.
//!
//! A [`FileDescriptor`] is an immutable snapshot of everything the engine
//! needs to know about one source file: path, display name, lower-cased
//! extension, and the [`Format`] derived from it. The byte size is computed
//! lazily and cached, since descriptors are often created for listings that
//! never read the files.
//!
//! The engine itself trusts descriptors — validation (existence, supported
//! extension, size ceiling) is the caller's job via [`validate_file`] and
//! [`validate_output_dir`], performed at upload/selection time.

use crate::config::MAX_FILE_SIZE_MB;
use crate::error::ConvertError;
use crate::format::Format;
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Immutable metadata for one source file.
///
/// The `format` field is a pure function of the extension and is never
/// re-derived or mutated after construction.
#[derive(Debug, Clone, Serialize)]
pub struct FileDescriptor {
    path: PathBuf,
    name: String,
    extension: String,
    format: Format,
    #[serde(skip)]
    size: OnceCell<u64>,
}

impl FileDescriptor {
    /// Build a descriptor from a path. Does not touch the filesystem.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        let format = Format::from_extension(&extension);
        Self {
            path,
            name,
            extension,
            format,
            size: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name including extension.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File name without the extension; used to derive output names.
    pub fn base_name(&self) -> &str {
        match self.name.rfind('.') {
            Some(idx) => &self.name[..idx],
            None => &self.name,
        }
    }

    /// Lower-cased extension without the dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// File size in bytes, read from the filesystem on first access and
    /// cached. Unreadable files report 0 rather than erroring, matching the
    /// listing use case; real errors surface later when the file is opened.
    pub fn size_bytes(&self) -> u64 {
        *self
            .size
            .get_or_init(|| std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0))
    }

    /// Human-readable size, e.g. `3.42 MB`.
    pub fn human_size(&self) -> String {
        let mut size = self.size_bytes() as f64;
        for unit in ["B", "KB", "MB", "GB"] {
            if size < 1024.0 {
                return format!("{size:.2} {unit}");
            }
            size /= 1024.0;
        }
        format!("{size:.2} TB")
    }
}

/// Validate a path for conversion and return its descriptor.
///
/// Checks existence, that it is a regular file, that the extension is one of
/// the recognised input formats, and that the size is within
/// [`MAX_FILE_SIZE_MB`].
pub fn validate_file(path: impl Into<PathBuf>) -> Result<FileDescriptor, ConvertError> {
    let path = path.into();
    let meta = std::fs::metadata(&path).map_err(|_| ConvertError::FileNotFound {
        path: path.clone(),
    })?;
    if !meta.is_file() {
        return Err(ConvertError::NotAFile { path });
    }

    let desc = FileDescriptor::new(&path);
    if !desc.format().is_known() {
        return Err(ConvertError::UnsupportedExtension {
            extension: desc.extension().to_string(),
            path,
        });
    }

    let size_mb = meta.len() / (1024 * 1024);
    if size_mb > MAX_FILE_SIZE_MB {
        return Err(ConvertError::FileTooLarge {
            path,
            size_mb,
            limit_mb: MAX_FILE_SIZE_MB,
        });
    }

    Ok(desc)
}

/// Validate an output directory, creating it if missing.
///
/// The writability probe creates and removes a marker file, which is the
/// only reliable cross-platform check.
pub fn validate_output_dir(path: impl AsRef<Path>) -> Result<(), ConvertError> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Err(ConvertError::OutputDirUnavailable {
            path: path.to_path_buf(),
            reason: "empty path".into(),
        });
    }

    std::fs::create_dir_all(path).map_err(|e| ConvertError::OutputDirUnavailable {
        path: path.to_path_buf(),
        reason: format!("cannot create: {e}"),
    })?;

    let probe = path.join(".imgconv_write_probe");
    std::fs::write(&probe, b"").map_err(|e| ConvertError::OutputDirUnavailable {
        path: path.to_path_buf(),
        reason: format!("not writable: {e}"),
    })?;
    let _ = std::fs::remove_file(&probe);
    Ok(())
}

/// Return `dir/base.ext`, appending `_1`, `_2`, … until the name is free.
///
/// Collaborator-layer helper. Note that the per-file pair handlers do *not*
/// apply this: their output names come from the base name alone, so distinct
/// inputs with colliding base names in the same output directory will
/// overwrite each other. That naming contract is preserved for
/// compatibility; callers needing collision avoidance must route output
/// names through this helper themselves.
pub fn unique_output_path(dir: &Path, base: &str, ext: &str) -> PathBuf {
    let candidate = dir.join(format!("{base}.{ext}"));
    if !candidate.exists() {
        return candidate;
    }
    let mut counter = 1u32;
    loop {
        let candidate = dir.join(format!("{base}_{counter}.{ext}"));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_derives_name_extension_format() {
        let d = FileDescriptor::new("/data/Scan Page.TIFF");
        assert_eq!(d.name(), "Scan Page.TIFF");
        assert_eq!(d.base_name(), "Scan Page");
        assert_eq!(d.extension(), "tiff");
        assert_eq!(d.format(), Format::Tiff);
    }

    #[test]
    fn descriptor_without_extension_is_unknown() {
        let d = FileDescriptor::new("/data/README");
        assert_eq!(d.extension(), "");
        assert_eq!(d.format(), Format::Unknown);
        assert_eq!(d.base_name(), "README");
    }

    #[test]
    fn missing_file_size_is_zero() {
        let d = FileDescriptor::new("/definitely/not/here.png");
        assert_eq!(d.size_bytes(), 0);
        assert_eq!(d.human_size(), "0.00 B");
    }

    #[test]
    fn validate_rejects_missing_and_unknown() {
        assert!(matches!(
            validate_file("/definitely/not/here.png"),
            Err(ConvertError::FileNotFound { .. })
        ));

        let dir = tempfile::tempdir().unwrap();
        let bmp = dir.path().join("image.bmp");
        std::fs::write(&bmp, b"BM").unwrap();
        assert!(matches!(
            validate_file(&bmp),
            Err(ConvertError::UnsupportedExtension { .. })
        ));
    }

    #[test]
    fn validate_accepts_supported_file() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("ok.png");
        std::fs::write(&png, b"\x89PNG").unwrap();
        let d = validate_file(&png).unwrap();
        assert_eq!(d.format(), Format::Png);
        assert_eq!(d.size_bytes(), 4);
    }

    #[test]
    fn output_dir_is_created_on_demand() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/out");
        validate_output_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn unique_path_appends_counter() {
        let dir = tempfile::tempdir().unwrap();
        let first = unique_output_path(dir.path(), "page", "jpg");
        assert_eq!(first.file_name().unwrap(), "page.jpg");
        std::fs::write(&first, b"x").unwrap();
        let second = unique_output_path(dir.path(), "page", "jpg");
        assert_eq!(second.file_name().unwrap(), "page_1.jpg");
    }
}
