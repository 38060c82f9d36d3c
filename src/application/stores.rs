//! Store traits describing the persistence collaborators.
//!
//! The content repository (versioned markdown documents) and the blob
//! backend (the persisted index document) are consumed through these
//! seams so tests and deployments can swap implementations explicitly.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("resource not found")]
    NotFound,
    #[error("version conflict: {message}")]
    Conflict { message: String },
    #[error("backend unavailable: {message}")]
    Unavailable { message: String },
    #[error("protocol error: {message}")]
    Protocol { message: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Opaque optimistic-concurrency token issued by the content store (the
/// blob SHA for the GitHub backend).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct FileHandle {
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub content: String,
    pub version: VersionToken,
}

/// Version-controlled document store. Paths are relative to the posts
/// directory the implementation is rooted at.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn list_files(&self) -> Result<Vec<FileHandle>, StoreError>;

    async fn read_file(&self, path: &str) -> Result<StoredDocument, StoreError>;

    /// Write a document. `expected` carries the version read earlier; a
    /// stale token fails with [`StoreError::Conflict`], as does `None`
    /// when the path already exists (create semantics).
    async fn write_file(
        &self,
        path: &str,
        content: &str,
        expected: Option<&VersionToken>,
    ) -> Result<VersionToken, StoreError>;

    async fn delete_file(&self, path: &str, version: &VersionToken) -> Result<(), StoreError>;
}

/// Flat key-value object storage for the persisted index document.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError>;

    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), StoreError>;
}

/// Repository path of the document backing `slug`.
pub fn document_path(slug: &str) -> String {
    format!("{slug}.md")
}

/// Inverse of [`document_path`]; `None` for paths that are not markdown
/// documents.
pub fn slug_for_path(path: &str) -> Option<&str> {
    path.strip_suffix(".md").filter(|slug| !slug.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_path_round_trips() {
        let path = document_path("first-post");
        assert_eq!(path, "first-post.md");
        assert_eq!(slug_for_path(&path), Some("first-post"));
    }

    #[test]
    fn slug_for_path_skips_other_files() {
        assert_eq!(slug_for_path("notes.txt"), None);
        assert_eq!(slug_for_path(".md"), None);
    }
}
