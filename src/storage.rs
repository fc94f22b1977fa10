//! On-disk upload directory.
//!
//! Files are stored flat, under the filename the client uploaded them with.

use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Why a filename was refused.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FilenameError {
    #[error("filename is empty")]
    Empty,
    #[error("filename {0:?} is reserved")]
    Reserved(String),
    #[error("filename {0:?} contains a path separator, URL delimiter or NUL byte")]
    IllegalCharacter(String),
}

/// Accept a client-supplied filename only if it names a plain file inside
/// the upload directory and survives as the last segment of a file URL.
pub fn validate_filename(name: &str) -> Result<&str, FilenameError> {
    if name.is_empty() {
        return Err(FilenameError::Empty);
    }
    if name == "." || name == ".." {
        return Err(FilenameError::Reserved(name.to_string()));
    }
    // `?` and `#` would end the URL path returned for the file.
    if name.contains(['/', '\\', '\0', '?', '#']) {
        return Err(FilenameError::IllegalCharacter(name.to_string()));
    }
    Ok(name)
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    /// Open the upload directory, creating it if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create upload directory {:?}", root))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    /// Write `data` under `filename`, replacing any previous file.
    pub async fn save(&self, filename: &str, data: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(filename);
        tokio::fs::write(&path, data)
            .await
            .with_context(|| format!("Failed to write {:?}", path))?;
        Ok(path)
    }

    /// Read a stored file; `None` if it does not exist.
    pub async fn read(&self, filename: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(filename);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {:?}", path)),
        }
    }

    /// Current size of a stored file; `None` if it does not exist.
    pub async fn size(&self, filename: &str) -> Result<Option<u64>> {
        let path = self.path_for(filename);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(Some(meta.len())),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to stat {:?}", path)),
        }
    }
}
