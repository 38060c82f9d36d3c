//! Read API over the cached index.
//!
//! Every listing operation is answered from the (possibly memoized)
//! index; only [`CatalogService::get_post`] touches the content
//! repository, because post bodies are never carried by the index.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::application::frontmatter::{self, FrontmatterOutcome};
use crate::application::indexer::format_errors;
use crate::application::stores::{ContentStore, StoreError, document_path};
use crate::cache::IndexStore;
use crate::domain::posts::{Category, Post, PostSummary};
use crate::domain::slug::validate_slug;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("post `{slug}` not found")]
    NotFound { slug: String },
    #[error("stored document for `{slug}` could not be parsed")]
    CorruptDocument { slug: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn ContentStore>,
    index: Arc<IndexStore>,
    default_category: Category,
}

impl CatalogService {
    pub fn new(
        store: Arc<dyn ContentStore>,
        index: Arc<IndexStore>,
        default_category: Category,
    ) -> Self {
        Self {
            store,
            index,
            default_category,
        }
    }

    /// All summaries, newest first. Never fails; an unavailable index
    /// degrades to an empty listing at the store layer.
    pub async fn list_summaries(&self) -> Vec<PostSummary> {
        self.index.load().await.posts.clone()
    }

    /// One full post, read from the content repository.
    pub async fn get_post(&self, slug: &str) -> Result<Post, CatalogError> {
        if validate_slug(slug).is_err() {
            return Err(CatalogError::NotFound {
                slug: slug.to_string(),
            });
        }

        let document = self
            .store
            .read_file(&document_path(slug))
            .await
            .map_err(|err| match err {
                StoreError::NotFound => CatalogError::NotFound {
                    slug: slug.to_string(),
                },
                other => CatalogError::Store(other),
            })?;

        match frontmatter::parse_document(&document.content, self.default_category) {
            FrontmatterOutcome::Valid { frontmatter, body } => Ok(frontmatter.into_post(slug, body)),
            FrontmatterOutcome::Recovered {
                frontmatter,
                body,
                errors,
            } => {
                warn!(slug, errors = %format_errors(&errors), "serving post with recovered metadata");
                Ok(frontmatter.into_post(slug, body))
            }
            FrontmatterOutcome::Unparseable(_) => Err(CatalogError::CorruptDocument {
                slug: slug.to_string(),
            }),
        }
    }

    /// Summaries carrying `tag`, matched case-insensitively, newest
    /// first.
    pub async fn list_by_tag(&self, tag: &str) -> Vec<PostSummary> {
        let index = self.index.load().await;
        let Some(slugs) = index.by_tag.get(&tag.to_lowercase()) else {
            return Vec::new();
        };
        resolve_slugs(&index, slugs)
    }

    pub async fn list_by_category(&self, category: Category) -> Vec<PostSummary> {
        let index = self.index.load().await;
        let Some(slugs) = index.by_category.get(&category) else {
            return Vec::new();
        };
        resolve_slugs(&index, slugs)
    }

    /// Combined filter. The category list is the smaller candidate set in
    /// this domain, so it is fetched first and the tag is applied in
    /// memory.
    pub async fn list_by_category_and_tag(&self, category: Category, tag: &str) -> Vec<PostSummary> {
        let wanted = tag.to_lowercase();
        self.list_by_category(category)
            .await
            .into_iter()
            .filter(|summary| {
                summary
                    .tags
                    .iter()
                    .any(|candidate| candidate.to_lowercase() == wanted)
            })
            .collect()
    }

    /// Every known tag, lowercased and sorted.
    pub async fn list_tags(&self) -> Vec<String> {
        self.index.load().await.by_tag.keys().cloned().collect()
    }

    /// Categories with at least one post, in taxonomy order.
    pub async fn list_categories(&self) -> Vec<Category> {
        let index = self.index.load().await;
        Category::ALL
            .into_iter()
            .filter(|category| {
                index
                    .by_category
                    .get(category)
                    .is_some_and(|slugs| !slugs.is_empty())
            })
            .collect()
    }

    /// Posts sharing tags with `slug`, scored by how many tags they
    /// share, newest first within a score. Empty when the post is
    /// unknown or has no tags.
    pub async fn related_posts(&self, slug: &str, limit: usize) -> Vec<PostSummary> {
        let index = self.index.load().await;
        let Some(current) = index.summary(slug) else {
            return Vec::new();
        };
        if current.tags.is_empty() {
            return Vec::new();
        }

        let current_tags: Vec<String> = current
            .tags
            .iter()
            .map(|tag| tag.to_lowercase())
            .collect();

        let mut scored: Vec<(usize, &PostSummary)> = index
            .posts
            .iter()
            .filter(|candidate| candidate.slug != slug)
            .filter_map(|candidate| {
                let shared = candidate
                    .tags
                    .iter()
                    .filter(|tag| current_tags.contains(&tag.to_lowercase()))
                    .count();
                (shared > 0).then_some((shared, candidate))
            })
            .collect();

        // `posts` is already in feed order, so a stable sort on the score
        // keeps newest-first within equal scores.
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        scored
            .into_iter()
            .take(limit)
            .map(|(_, summary)| summary.clone())
            .collect()
    }
}

/// Map index slugs back to summaries, preserving order. A slug with no
/// matching summary is index drift, tolerated and logged rather than
/// surfaced.
fn resolve_slugs(
    index: &crate::domain::index::PostIndex,
    slugs: &[String],
) -> Vec<PostSummary> {
    slugs
        .iter()
        .filter_map(|slug| {
            let summary = index.summary(slug);
            if summary.is_none() {
                debug!(slug, "index references a missing summary; skipping");
            }
            summary.cloned()
        })
        .collect()
}
