//! Authoring operations: create, update, and delete posts.
//!
//! Each mutation writes the document to the content repository first,
//! then patches the cached index incrementally and persists it. The two
//! steps are not transactional: when the index persist fails after a
//! successful repository write, the caller gets
//! [`ContentError::IndexPersist`] so the operation can be reported as not
//! fully durable (and retried or followed by a full rebuild).

use std::sync::Arc;

use thiserror::Error;
use time::{Date, OffsetDateTime};
use tracing::{info, warn};

use crate::application::frontmatter::{self, ComposeError, FrontmatterOutcome};
use crate::application::indexer::format_errors;
use crate::application::stores::{ContentStore, StoreError, document_path};
use crate::cache::{IndexPersistError, IndexStore};
use crate::domain::error::DomainError;
use crate::domain::posts::{Category, Post};
use crate::domain::slug::validate_slug;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("post `{slug}` not found")]
    NotFound { slug: String },
    #[error("post `{slug}` was modified concurrently: {message}")]
    Conflict { slug: String, message: String },
    #[error("stored document for `{slug}` could not be parsed")]
    CorruptDocument { slug: String },
    #[error("failed to compose document: {0}")]
    Compose(#[from] ComposeError),
    #[error(transparent)]
    Store(StoreError),
    #[error("post `{slug}` was written but the index could not be persisted")]
    IndexPersist {
        slug: String,
        #[source]
        source: IndexPersistError,
    },
}

#[derive(Debug, Clone)]
pub struct CreatePostCommand {
    pub slug: String,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub tags: Vec<String>,
    pub category: Category,
    /// Defaults to the current date when absent.
    pub published_at: Option<Date>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdatePostCommand {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub tags: Option<Vec<String>>,
    pub category: Option<Category>,
}

#[derive(Clone)]
pub struct ContentService {
    store: Arc<dyn ContentStore>,
    index: Arc<IndexStore>,
    default_category: Category,
}

impl ContentService {
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

    pub async fn create_post(&self, command: CreatePostCommand) -> Result<Post, ContentError> {
        validate_slug(&command.slug).map_err(|err| DomainError::validation(err.to_string()))?;
        ensure_non_empty(&command.title, "title")?;
        ensure_non_empty(&command.excerpt, "excerpt")?;
        ensure_non_empty(&command.content, "content")?;

        let post = Post {
            slug: command.slug,
            title: command.title,
            content: command.content,
            excerpt: command.excerpt,
            published_at: command
                .published_at
                .unwrap_or_else(|| OffsetDateTime::now_utc().date()),
            updated_at: None,
            tags: command.tags,
            category: command.category,
        };

        let document = frontmatter::compose_document(&post)?;
        self.store
            .write_file(&document_path(&post.slug), &document, None)
            .await
            .map_err(|err| map_store_error(&post.slug, err))?;

        info!(slug = %post.slug, "post created");
        self.apply_upsert(&post).await?;
        Ok(post)
    }

    pub async fn update_post(
        &self,
        slug: &str,
        command: UpdatePostCommand,
    ) -> Result<Post, ContentError> {
        validate_slug(slug).map_err(|err| DomainError::validation(err.to_string()))?;

        let path = document_path(slug);
        let existing = self
            .store
            .read_file(&path)
            .await
            .map_err(|err| map_store_error(slug, err))?;

        let current = match frontmatter::parse_document(&existing.content, self.default_category) {
            FrontmatterOutcome::Valid { frontmatter, body } => frontmatter.into_post(slug, body),
            FrontmatterOutcome::Recovered {
                frontmatter,
                body,
                errors,
            } => {
                warn!(
                    slug,
                    errors = %format_errors(&errors),
                    "updating a document with recovered metadata"
                );
                frontmatter.into_post(slug, body)
            }
            FrontmatterOutcome::Unparseable(_) => {
                return Err(ContentError::CorruptDocument {
                    slug: slug.to_string(),
                });
            }
        };

        let post = Post {
            slug: current.slug,
            title: command.title.unwrap_or(current.title),
            content: command.content.unwrap_or(current.content),
            excerpt: command.excerpt.unwrap_or(current.excerpt),
            published_at: current.published_at,
            updated_at: Some(OffsetDateTime::now_utc().date()),
            tags: command.tags.unwrap_or(current.tags),
            category: command.category.unwrap_or(current.category),
        };
        ensure_non_empty(&post.title, "title")?;
        ensure_non_empty(&post.excerpt, "excerpt")?;
        ensure_non_empty(&post.content, "content")?;

        let document = frontmatter::compose_document(&post)?;
        self.store
            .write_file(&path, &document, Some(&existing.version))
            .await
            .map_err(|err| map_store_error(slug, err))?;

        info!(slug, "post updated");
        self.apply_upsert(&post).await?;
        Ok(post)
    }

    pub async fn delete_post(&self, slug: &str) -> Result<(), ContentError> {
        validate_slug(slug).map_err(|err| DomainError::validation(err.to_string()))?;

        let path = document_path(slug);
        let existing = self
            .store
            .read_file(&path)
            .await
            .map_err(|err| map_store_error(slug, err))?;

        self.store
            .delete_file(&path, &existing.version)
            .await
            .map_err(|err| map_store_error(slug, err))?;

        info!(slug, "post deleted");

        let mut next = (*self.index.load().await).clone();
        next.remove(slug);
        self.index
            .save(next)
            .await
            .map_err(|source| ContentError::IndexPersist {
                slug: slug.to_string(),
                source,
            })?;
        Ok(())
    }

    async fn apply_upsert(&self, post: &Post) -> Result<(), ContentError> {
        let mut next = (*self.index.load().await).clone();
        next.upsert(post.summary());
        self.index
            .save(next)
            .await
            .map_err(|source| ContentError::IndexPersist {
                slug: post.slug.clone(),
                source,
            })?;
        Ok(())
    }
}

fn ensure_non_empty(value: &str, field: &'static str) -> Result<(), ContentError> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} must not be empty")).into());
    }
    Ok(())
}

fn map_store_error(slug: &str, err: StoreError) -> ContentError {
    match err {
        StoreError::NotFound => ContentError::NotFound {
            slug: slug.to_string(),
        },
        StoreError::Conflict { message } => ContentError::Conflict {
            slug: slug.to_string(),
            message,
        },
        other => ContentError::Store(other),
    }
}
