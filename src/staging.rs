//! Staged upload handling.
//!
//! Uploads the surrounding application has already spooled to disk reach
//! the pipeline as a [`StagedUpload`]. The backing temp file is removed
//! when the value drops, which is how the pipeline guarantees no orphaned
//! file survives any exit path, early failures included.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{DedupError, Result};

/// An upload staged in a temporary file, deleted on drop.
#[derive(Debug)]
pub struct StagedUpload {
    file: NamedTempFile,
}

impl StagedUpload {
    /// Stage bytes into a fresh temporary file.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut file = NamedTempFile::new()
            .map_err(|e| DedupError::Internal(format!("failed to stage upload: {e}")))?;
        file.write_all(bytes)
            .and_then(|_| file.flush())
            .map_err(|e| DedupError::Internal(format!("failed to stage upload: {e}")))?;

        Ok(Self { file })
    }

    /// Adopt a temp file the caller already wrote.
    pub fn from_file(file: NamedTempFile) -> Self {
        Self { file }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Read the staged bytes back into memory.
    pub(crate) async fn read(&self) -> Result<Vec<u8>> {
        tokio::fs::read(self.path())
            .await
            .map_err(|e| DedupError::Internal(format!("staged upload unreadable: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_staged_bytes_round_trip() {
        let staged = StagedUpload::from_bytes(b"image bytes").unwrap();
        assert_eq!(staged.read().await.unwrap(), b"image bytes");
    }

    #[tokio::test]
    async fn test_adopted_spool_file_reads_and_cleans_up() {
        // A web layer hands over a multipart body it already spooled
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"spooled upload").unwrap();

        let staged = StagedUpload::from_file(file);
        let path = staged.path().to_path_buf();
        assert_eq!(staged.read().await.unwrap(), b"spooled upload");

        drop(staged);
        assert!(!path.exists());
    }

    #[test]
    fn test_file_is_removed_on_drop() {
        let staged = StagedUpload::from_bytes(b"ephemeral").unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());

        drop(staged);
        assert!(!path.exists());
    }
}
