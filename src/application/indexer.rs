//! Full index rebuilds from a complete repository scan.
//!
//! This is the expensive path: it reads every document in the content
//! repository. Routine writes go through the incremental
//! [`PostIndex::upsert`]/[`PostIndex::remove`] operations instead; the
//! builder exists for bulk regeneration and the validation sweep.

use std::sync::Arc;

use futures::{StreamExt, stream};
use tracing::{error, warn};

use crate::application::frontmatter::{self, FieldError, FrontmatterOutcome};
use crate::application::stores::{ContentStore, FileHandle, StoreError, slug_for_path};
use crate::domain::index::PostIndex;
use crate::domain::posts::{Category, PostSummary};

const SCAN_CONCURRENCY: usize = 8;

pub struct IndexBuilder {
    store: Arc<dyn ContentStore>,
    default_category: Category,
}

impl IndexBuilder {
    pub fn new(store: Arc<dyn ContentStore>, default_category: Category) -> Self {
        Self {
            store,
            default_category,
        }
    }

    /// Build a fresh index from every document in the repository.
    /// Unreadable or unparseable documents are logged and skipped;
    /// documents with recoverable validation problems are kept.
    pub async fn build(&self) -> Result<PostIndex, StoreError> {
        let files = self.store.list_files().await?;

        let summaries: Vec<PostSummary> = stream::iter(files)
            .map(|handle| self.load_summary(handle))
            .buffer_unordered(SCAN_CONCURRENCY)
            .filter_map(futures::future::ready)
            .collect()
            .await;

        Ok(PostIndex::from_summaries(summaries))
    }

    async fn load_summary(&self, handle: FileHandle) -> Option<PostSummary> {
        let slug = slug_for_path(&handle.path)?;

        let document = match self.store.read_file(&handle.path).await {
            Ok(document) => document,
            Err(err) => {
                error!(path = %handle.path, error = %err, "skipping unreadable document");
                return None;
            }
        };

        match frontmatter::parse_document(&document.content, self.default_category) {
            FrontmatterOutcome::Valid { frontmatter, body } => {
                Some(frontmatter.into_post(slug, body).summary())
            }
            FrontmatterOutcome::Recovered {
                frontmatter,
                body,
                errors,
            } => {
                warn!(
                    path = %handle.path,
                    errors = %format_errors(&errors),
                    "document metadata recovered with defaults"
                );
                Some(frontmatter.into_post(slug, body).summary())
            }
            FrontmatterOutcome::Unparseable(err) => {
                error!(path = %handle.path, error = %err, "skipping unparseable document");
                None
            }
        }
    }

    /// Validation sweep over the whole repository, one report per file.
    pub async fn scan_reports(&self) -> Result<Vec<ValidationReport>, StoreError> {
        let files = self.store.list_files().await?;

        let reports = stream::iter(files)
            .map(|handle| self.validate_file(handle))
            .buffer_unordered(SCAN_CONCURRENCY)
            .collect()
            .await;

        Ok(reports)
    }

    async fn validate_file(&self, handle: FileHandle) -> ValidationReport {
        let document = match self.store.read_file(&handle.path).await {
            Ok(document) => document,
            Err(err) => {
                return ValidationReport {
                    path: handle.path,
                    outcome: ReportOutcome::Unreadable(err.to_string()),
                };
            }
        };

        let outcome = match frontmatter::parse_document(&document.content, self.default_category) {
            FrontmatterOutcome::Valid { .. } => ReportOutcome::Valid,
            FrontmatterOutcome::Recovered { errors, .. } => ReportOutcome::Recovered(errors),
            FrontmatterOutcome::Unparseable(err) => ReportOutcome::Unparseable(err.to_string()),
        };

        ValidationReport {
            path: handle.path,
            outcome,
        }
    }
}

#[derive(Debug)]
pub struct ValidationReport {
    pub path: String,
    pub outcome: ReportOutcome,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        matches!(self.outcome, ReportOutcome::Valid)
    }
}

#[derive(Debug)]
pub enum ReportOutcome {
    Valid,
    Recovered(Vec<FieldError>),
    Unparseable(String),
    Unreadable(String),
}

pub fn format_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(FieldError::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use async_trait::async_trait;

    use super::*;
    use crate::application::stores::{StoredDocument, VersionToken};

    struct FixtureStore {
        files: BTreeMap<String, String>,
    }

    impl FixtureStore {
        fn new(files: &[(&str, &str)]) -> Arc<Self> {
            Arc::new(Self {
                files: files
                    .iter()
                    .map(|(path, content)| (path.to_string(), content.to_string()))
                    .collect(),
            })
        }
    }

    #[async_trait]
    impl ContentStore for FixtureStore {
        async fn list_files(&self) -> Result<Vec<FileHandle>, StoreError> {
            Ok(self
                .files
                .keys()
                .map(|path| FileHandle { path: path.clone() })
                .collect())
        }

        async fn read_file(&self, path: &str) -> Result<StoredDocument, StoreError> {
            if path == "broken.md" {
                return Err(StoreError::unavailable("simulated read failure"));
            }
            self.files
                .get(path)
                .map(|content| StoredDocument {
                    content: content.clone(),
                    version: VersionToken::new("v1"),
                })
                .ok_or(StoreError::NotFound)
        }

        async fn write_file(
            &self,
            _path: &str,
            _content: &str,
            _expected: Option<&VersionToken>,
        ) -> Result<VersionToken, StoreError> {
            unimplemented!("read-only fixture")
        }

        async fn delete_file(&self, _path: &str, _version: &VersionToken) -> Result<(), StoreError> {
            unimplemented!("read-only fixture")
        }
    }

    fn doc(title: &str, published: &str, tags: &str, category: &str) -> String {
        format!(
            "---\ntitle: {title}\nexcerpt: about {title}\npublishedAt: {published}\ntags: \"{tags}\"\ncategory: {category}\n---\n\nBody of {title}.\n"
        )
    }

    #[tokio::test]
    async fn build_indexes_every_parseable_document() {
        let store = FixtureStore::new(&[
            ("a.md", &doc("A", "2024-01-01", "go", "dev")),
            ("b.md", &doc("B", "2024-02-01", "go, rust", "dev")),
            ("notes.txt", "not a post"),
        ]);

        let builder = IndexBuilder::new(store, Category::Dev);
        let index = builder.build().await.expect("build");

        assert_eq!(index.total_count, 2);
        let slugs: Vec<&str> = index.posts.iter().map(|post| post.slug.as_str()).collect();
        assert_eq!(slugs, ["b", "a"]);
        assert_eq!(index.by_tag["go"], ["b", "a"]);
        assert_eq!(index.by_tag["rust"], ["b"]);
    }

    #[tokio::test]
    async fn build_skips_corrupt_documents_and_continues() {
        let store = FixtureStore::new(&[
            ("a.md", &doc("A", "2024-01-01", "go", "dev")),
            ("broken.md", "unused"),
            ("empty.md", "no frontmatter here"),
        ]);

        let builder = IndexBuilder::new(store, Category::Dev);
        let index = builder.build().await.expect("build");

        assert_eq!(index.total_count, 1);
        assert!(index.contains("a"));
    }

    #[tokio::test]
    async fn build_keeps_recovered_documents() {
        let store = FixtureStore::new(&[(
            "odd.md",
            "---\ntitle: Odd\nexcerpt: E\npublishedAt: 2024-01-01\ncategory: misc\n---\nx",
        )]);

        let builder = IndexBuilder::new(store, Category::Life);
        let index = builder.build().await.expect("build");

        assert_eq!(index.total_count, 1);
        assert_eq!(index.posts[0].category, Category::Life);
    }

    #[tokio::test]
    async fn scan_reports_classifies_outcomes() {
        let store = FixtureStore::new(&[
            ("good.md", &doc("Good", "2024-01-01", "go", "dev")),
            (
                "odd.md",
                "---\ntitle: Odd\nexcerpt: E\npublishedAt: 2024-01-01\ncategory: misc\n---\nx",
            ),
            ("plain.md", "no frontmatter"),
            ("broken.md", "unused"),
        ]);

        let builder = IndexBuilder::new(store, Category::Dev);
        let mut reports = builder.scan_reports().await.expect("scan");
        reports.sort_by(|a, b| a.path.cmp(&b.path));

        assert!(matches!(reports[0].outcome, ReportOutcome::Unreadable(_)));
        assert!(matches!(reports[1].outcome, ReportOutcome::Valid));
        assert!(matches!(reports[2].outcome, ReportOutcome::Recovered(_)));
        assert!(matches!(reports[3].outcome, ReportOutcome::Unparseable(_)));
    }
}
