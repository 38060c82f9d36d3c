//! Index store adapter: persistence plus the process-lifetime memo.
//!
//! `load` walks the fallback chain (memo → blob backend → local copy →
//! empty) and never fails. `save` replaces the memo first, so the rest of
//! the process observes the new index even when persistence fails, then
//! writes the whole document to the authoritative backend — blob when one
//! is configured, the local file otherwise. Saves are whole-document
//! replacements; the persisted copy is always self-consistent.

use std::sync::{Arc, RwLock};

use bytes::Bytes;
use metrics::counter;
use thiserror::Error;
use tracing::{debug, warn};

use crate::application::stores::{BlobStore, StoreError};
use crate::domain::index::PostIndex;
use crate::infra::local::LocalIndexFile;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

pub const INDEX_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Error)]
pub enum IndexPersistError {
    #[error("failed to encode index document: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to persist index document: {0}")]
    Backend(#[from] StoreError),
}

pub struct IndexStore {
    blob: Option<Arc<dyn BlobStore>>,
    local: LocalIndexFile,
    index_key: String,
    memo: RwLock<Option<Arc<PostIndex>>>,
}

impl IndexStore {
    /// Backend selection is explicit: pass a blob store to make it the
    /// authoritative backend, or `None` for local-only deployments.
    pub fn new(
        blob: Option<Arc<dyn BlobStore>>,
        local: LocalIndexFile,
        index_key: impl Into<String>,
    ) -> Self {
        Self {
            blob,
            local,
            index_key: index_key.into(),
            memo: RwLock::new(None),
        }
    }

    /// Load the index, memoized for the lifetime of the process. Never
    /// fails: an unreachable backend degrades to the local copy, and a
    /// missing local copy degrades to an empty index.
    pub async fn load(&self) -> Arc<PostIndex> {
        if let Some(cached) = rw_read(&self.memo, SOURCE, "load").clone() {
            counter!("quaderno_index_memo_hit_total").increment(1);
            return cached;
        }
        counter!("quaderno_index_memo_miss_total").increment(1);

        let loaded = Arc::new(self.load_uncached().await);
        *rw_write(&self.memo, SOURCE, "load.fill") = Some(loaded.clone());
        loaded
    }

    async fn load_uncached(&self) -> PostIndex {
        if let Some(blob) = &self.blob {
            match blob.get(&self.index_key).await {
                Ok(Some(bytes)) => match serde_json::from_slice::<PostIndex>(&bytes) {
                    Ok(index) => return index,
                    Err(error) => {
                        counter!("quaderno_index_fallback_total").increment(1);
                        warn!(
                            key = %self.index_key,
                            error = %error,
                            "index document in blob storage is corrupt; falling back"
                        );
                    }
                },
                Ok(None) => {
                    counter!("quaderno_index_fallback_total").increment(1);
                    debug!(key = %self.index_key, "no index document in blob storage; falling back");
                }
                Err(error) => {
                    counter!("quaderno_index_fallback_total").increment(1);
                    warn!(
                        key = %self.index_key,
                        error = %error,
                        "blob storage unreachable; falling back to local index"
                    );
                }
            }
        }

        match self.local.read().await {
            Ok(Some(bytes)) => match serde_json::from_slice::<PostIndex>(&bytes) {
                Ok(index) => return index,
                Err(error) => warn!(
                    path = %self.local.path().display(),
                    error = %error,
                    "local index document is corrupt"
                ),
            },
            Ok(None) => {}
            Err(error) => warn!(
                path = %self.local.path().display(),
                error = %error,
                "failed to read local index document"
            ),
        }

        warn!("no persisted index available; serving an empty index");
        PostIndex::empty()
    }

    /// Persist a new index. The memo is replaced before persistence, so
    /// in-process reads see the change even when the backend write
    /// fails; the error still surfaces so the triggering mutation can be
    /// reported as not fully durable.
    pub async fn save(&self, index: PostIndex) -> Result<Arc<PostIndex>, IndexPersistError> {
        let shared = Arc::new(index);
        *rw_write(&self.memo, SOURCE, "save") = Some(shared.clone());

        let result = self.persist(shared.as_ref()).await;
        if result.is_err() {
            counter!("quaderno_index_persist_failure_total").increment(1);
        }
        result?;
        Ok(shared)
    }

    async fn persist(&self, index: &PostIndex) -> Result<(), IndexPersistError> {
        let encoded = serde_json::to_vec_pretty(index)?;

        match &self.blob {
            Some(blob) => {
                blob.put(&self.index_key, Bytes::from(encoded), INDEX_CONTENT_TYPE)
                    .await?
            }
            None => self.local.write(&encoded).await?,
        }
        Ok(())
    }

    /// Drop the memo so the next `load` refetches from storage.
    pub fn invalidate(&self) {
        *rw_write(&self.memo, SOURCE, "invalidate") = None;
    }
}
