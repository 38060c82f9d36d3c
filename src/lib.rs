//! Quaderno: content core for a markdown-backed blog.
//!
//! Posts are frontmatter + markdown documents in a version-controlled
//! content repository. A derived index (summaries plus tag and category
//! lookup maps) is cached in blob storage with a local fallback and an
//! in-process memo, rebuilt incrementally on every write. The serving
//! layer consumes [`application::catalog::CatalogService`] for reads and
//! [`application::content::ContentService`] for writes.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
