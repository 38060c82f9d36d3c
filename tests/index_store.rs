//! Behavior of the persisted index document across process boundaries,
//! including tolerated drift between the lookup maps and the summaries.

use std::sync::Arc;

use async_trait::async_trait;
use time::macros::date;

use quaderno::application::catalog::CatalogService;
use quaderno::application::stores::{
    ContentStore, FileHandle, StoreError, StoredDocument, VersionToken,
};
use quaderno::cache::IndexStore;
use quaderno::domain::index::PostIndex;
use quaderno::domain::posts::{Category, PostSummary};
use quaderno::infra::local::LocalIndexFile;

struct EmptyContentStore;

#[async_trait]
impl ContentStore for EmptyContentStore {
    async fn list_files(&self) -> Result<Vec<FileHandle>, StoreError> {
        Ok(Vec::new())
    }

    async fn read_file(&self, _path: &str) -> Result<StoredDocument, StoreError> {
        Err(StoreError::NotFound)
    }

    async fn write_file(
        &self,
        _path: &str,
        _content: &str,
        _expected: Option<&VersionToken>,
    ) -> Result<VersionToken, StoreError> {
        Err(StoreError::unavailable("read-only fixture"))
    }

    async fn delete_file(&self, _path: &str, _version: &VersionToken) -> Result<(), StoreError> {
        Err(StoreError::unavailable("read-only fixture"))
    }
}

fn summary(slug: &str, published: time::Date, tags: &[&str]) -> PostSummary {
    PostSummary {
        slug: slug.to_string(),
        title: slug.to_uppercase(),
        excerpt: format!("about {slug}"),
        published_at: published,
        updated_at: None,
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
        category: Category::Dev,
        reading_time: 1,
    }
}

#[tokio::test]
async fn persisted_index_round_trips_across_instances() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("posts-index.json");

    let index = PostIndex::from_summaries(vec![
        summary("a", date!(2024 - 01 - 01), &["go"]),
        summary("b", date!(2024 - 02 - 01), &["go", "rust"]),
    ]);

    let first = IndexStore::new(None, LocalIndexFile::new(path.clone()), "posts-index.json");
    let saved = first.save(index).await.expect("save");

    // A second store over the same path models a restarted process.
    let second = IndexStore::new(None, LocalIndexFile::new(path), "posts-index.json");
    let loaded = second.load().await;

    assert_eq!(*loaded, *saved);
}

#[tokio::test]
async fn drifted_tag_entries_are_skipped_not_fatal() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("posts-index.json");

    let mut index = PostIndex::from_summaries(vec![summary("a", date!(2024 - 01 - 01), &["go"])]);
    // Simulate a stale persisted document whose map still references a
    // deleted post.
    index
        .by_tag
        .get_mut("go")
        .expect("tag entry")
        .push("ghost".to_string());

    let local = LocalIndexFile::new(path);
    local
        .write(&serde_json::to_vec_pretty(&index).expect("encode"))
        .await
        .expect("write");

    let store = Arc::new(IndexStore::new(None, local, "posts-index.json"));
    let catalog = CatalogService::new(Arc::new(EmptyContentStore), store, Category::Dev);

    let matches: Vec<String> = catalog
        .list_by_tag("go")
        .await
        .into_iter()
        .map(|post| post.slug)
        .collect();
    assert_eq!(matches, ["a"]);
}

#[tokio::test]
async fn absent_document_serves_an_empty_listing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(IndexStore::new(
        None,
        LocalIndexFile::new(dir.path().join("posts-index.json")),
        "posts-index.json",
    ));
    let catalog = CatalogService::new(Arc::new(EmptyContentStore), store, Category::Dev);

    assert!(catalog.list_summaries().await.is_empty());
    assert!(catalog.list_tags().await.is_empty());
    assert!(catalog.list_categories().await.is_empty());
}
