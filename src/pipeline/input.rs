//! Scratch files: give the codecs a real path to read from.
//!
//! pdfium opens documents from the file system, so every request materialises
//! its input inside a fresh [`TempDir`]. The directory is owned by
//! [`ScratchFile`]; dropping it removes the file on every exit path, success,
//! error or panic alike.

use crate::error::ConvertError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// A per-request local file inside its own temporary directory.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    // Kept alive until processing completes; removed on drop.
    _dir: TempDir,
}

impl ScratchFile {
    /// Reserve `file_name` inside a new temp directory under `base`
    /// (or the OS temp dir). The file itself is not created.
    pub fn reserve(base: Option<&Path>, file_name: &str) -> Result<Self, ConvertError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("docconv-");
        let dir = match base {
            Some(base) => builder.tempdir_in(base),
            None => builder.tempdir(),
        }
        .map_err(|e| ConvertError::Scratch {
            path: base.map(Path::to_path_buf).unwrap_or_else(std::env::temp_dir),
            source: e,
        })?;

        let path = dir.path().join(file_name);
        debug!("Reserved scratch file {}", path.display());
        Ok(Self { path, _dir: dir })
    }

    /// Create a scratch file holding `bytes`.
    pub async fn with_contents(
        base: Option<&Path>,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<Self, ConvertError> {
        let scratch = Self::reserve(base, file_name)?;
        tokio::fs::write(&scratch.path, bytes)
            .await
            .map_err(|e| ConvertError::Scratch {
                path: scratch.path.clone(),
                source: e,
            })?;
        Ok(scratch)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_removed_on_drop() {
        let base = tempfile::tempdir().unwrap();
        let scratch = ScratchFile::with_contents(Some(base.path()), "in.png", b"abc")
            .await
            .unwrap();
        let path = scratch.path().to_path_buf();
        assert!(path.starts_with(base.path()));
        assert_eq!(std::fs::read(&path).unwrap(), b"abc");

        drop(scratch);
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(base.path()).unwrap().count(), 0);
    }

    #[test]
    fn reserve_does_not_create_file() {
        let scratch = ScratchFile::reserve(None, "x.pdf").unwrap();
        assert!(!scratch.path().exists());
        assert!(scratch.path().parent().unwrap().exists());
    }

    #[test]
    fn concurrent_reservations_never_collide() {
        let a = ScratchFile::reserve(None, "same.pdf").unwrap();
        let b = ScratchFile::reserve(None, "same.pdf").unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn missing_base_dir_is_a_scratch_error() {
        let err = ScratchFile::reserve(Some(Path::new("/definitely/not/here")), "x").unwrap_err();
        assert!(matches!(err, ConvertError::Scratch { .. }));
    }
}
