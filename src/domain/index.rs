//! The derived post index: every summary in feed order plus tag and
//! category lookup maps.
//!
//! The index is a projection of the content repository, not a primary
//! store. `posts` is kept sorted newest-first at all times; `by_tag` and
//! `by_category` are rebuilt from `posts` on every mutation and hold slugs
//! in the same relative order. Mutations never leave the maps referencing
//! a slug that is absent from `posts`.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::posts::{Category, PostSummary};

/// Persisted and in-memory shape of the index document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostIndex {
    pub posts: Vec<PostSummary>,
    pub by_tag: BTreeMap<String, Vec<String>>,
    pub by_category: BTreeMap<Category, Vec<String>>,
    pub total_count: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl PostIndex {
    /// An index that has never seen a post. `updated_at` stays at the
    /// epoch until the first mutation.
    pub fn empty() -> Self {
        Self {
            posts: Vec::new(),
            by_tag: BTreeMap::new(),
            by_category: BTreeMap::new(),
            total_count: 0,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    /// Assemble a fresh index from an unordered set of summaries.
    pub fn from_summaries(summaries: Vec<PostSummary>) -> Self {
        let mut index = Self::empty();
        index.posts = summaries;
        index.finalize();
        index
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.summary(slug).is_some()
    }

    pub fn summary(&self, slug: &str) -> Option<&PostSummary> {
        self.posts.iter().find(|post| post.slug == slug)
    }

    /// Insert or replace one summary. Replacement is keyed by slug, so
    /// repeated upserts of the same post never duplicate it.
    pub fn upsert(&mut self, summary: PostSummary) {
        self.posts.retain(|post| post.slug != summary.slug);
        self.posts.push(summary);
        self.finalize();
    }

    /// Drop one post by slug. Returns whether anything was removed; the
    /// counters and maps are refreshed either way.
    pub fn remove(&mut self, slug: &str) -> bool {
        let before = self.posts.len();
        self.posts.retain(|post| post.slug != slug);
        let removed = self.posts.len() != before;
        self.finalize();
        removed
    }

    /// Restore the ordering invariant and rebuild the derived maps. The
    /// dataset is a personal blog; a full re-sort per write is cheaper
    /// than it sounds and far cheaper than any repository rescan.
    fn finalize(&mut self) {
        self.posts.sort_by(feed_order);

        self.by_tag.clear();
        self.by_category.clear();
        for post in &self.posts {
            for tag in &post.tags {
                self.by_tag
                    .entry(tag.to_lowercase())
                    .or_default()
                    .push(post.slug.clone());
            }
            self.by_category
                .entry(post.category)
                .or_default()
                .push(post.slug.clone());
        }

        self.total_count = self.posts.len();
        self.updated_at = OffsetDateTime::now_utc();
    }
}

/// Feed order: newest first, ties broken by slug so the order is
/// deterministic across rebuilds.
fn feed_order(a: &PostSummary, b: &PostSummary) -> Ordering {
    b.published_at
        .cmp(&a.published_at)
        .then_with(|| a.slug.cmp(&b.slug))
}
