//! Local on-disk copy of the index document.
//!
//! Serves as the fallback read source when the blob backend is down and
//! as the authoritative backend for single-host deployments. Writes land
//! in a temp sibling first and are renamed into place, so readers never
//! observe a half-written document.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::application::stores::StoreError;

pub struct LocalIndexFile {
    path: PathBuf,
}

impl LocalIndexFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored document; `None` when it has never been written.
    pub async fn read(&self) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Replace the stored document atomically.
    pub async fn write(&self, bytes: &[u8]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let staging = self.path.with_extension("tmp");
        fs::write(&staging, bytes).await?;
        fs::rename(&staging, &self.path).await?;
        Ok(())
    }
}
