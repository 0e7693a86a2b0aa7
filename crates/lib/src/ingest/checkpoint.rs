//! # Upload Checkpoint
//!
//! A text file holding the index of the next chunk to upload. It exists only while
//! an upload is incomplete.

use super::IngestError;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct FileCheckpoint {
    path: PathBuf,
}

impl FileCheckpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored index, or 0 if no checkpoint exists.
    ///
    /// A file that does not hold a non-negative integer is an error rather than a
    /// silent restart from zero.
    pub async fn load(&self) -> Result<usize, IngestError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        let index = content
            .trim()
            .parse::<usize>()
            .map_err(|e| IngestError::Checkpoint {
                path: self.path.display().to_string(),
                reason: format!("{e} (content: {:?})", content.trim()),
            })?;
        info!("Resuming from checkpoint at chunk {index}");
        Ok(index)
    }

    /// Writes `index` through a temporary file so a crash never leaves a torn value.
    pub async fn save(&self, index: usize) -> Result<(), IngestError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, index.to_string()).await?;
        fs::rename(&tmp_path, &self.path).await?;
        debug!("Checkpoint saved at chunk {index}");
        Ok(())
    }

    /// Removes the checkpoint. A missing file is not an error.
    pub async fn clear(&self) -> Result<(), IngestError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn exists(&self) -> bool {
        fs::try_exists(&self.path).await.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_checkpoint_starts_at_zero() {
        let dir = tempdir().unwrap();
        let checkpoint = FileCheckpoint::new(dir.path().join("chroma_upload_checkpoint.txt"));
        assert_eq!(checkpoint.load().await.unwrap(), 0);
        assert!(!checkpoint.exists().await);
    }

    #[tokio::test]
    async fn test_save_load_clear() {
        let dir = tempdir().unwrap();
        let checkpoint = FileCheckpoint::new(dir.path().join("nested/checkpoint.txt"));

        checkpoint.save(50).await.unwrap();
        checkpoint.save(100).await.unwrap();
        assert_eq!(checkpoint.load().await.unwrap(), 100);
        assert_eq!(
            std::fs::read_to_string(checkpoint.path()).unwrap(),
            "100"
        );

        checkpoint.clear().await.unwrap();
        assert!(!checkpoint.exists().await);
        checkpoint.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_tolerates_trailing_newline() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("checkpoint.txt");
        std::fs::write(&path, "130\n").unwrap();
        assert_eq!(FileCheckpoint::new(path).load().await.unwrap(), 130);
    }

    #[tokio::test]
    async fn test_corrupt_checkpoint_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("checkpoint.txt");
        std::fs::write(&path, "fifty").unwrap();
        let err = FileCheckpoint::new(path).load().await.unwrap_err();
        assert!(matches!(err, IngestError::Checkpoint { .. }));
    }
}
