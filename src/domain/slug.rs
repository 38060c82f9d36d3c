//! Slug rules for post identifiers.
//!
//! A slug doubles as the post's content-repository key (`<slug>.md`), so
//! the accepted alphabet is strict: lowercase ASCII letters, digits, and
//! hyphens. Authors usually supply slugs directly; [`derive_slug`] exists
//! for callers that want one generated from a title.

use slug::slugify;
use thiserror::Error;

/// Errors that can occur while validating or deriving a slug.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug is empty")]
    Empty,
    #[error("slug `{slug}` contains characters outside [a-z0-9-]")]
    InvalidCharacters { slug: String },
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
}

/// Check that `candidate` is a well-formed slug.
pub fn validate_slug(candidate: &str) -> Result<(), SlugError> {
    if candidate.is_empty() {
        return Err(SlugError::Empty);
    }

    if candidate
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-')
    {
        Ok(())
    } else {
        Err(SlugError::InvalidCharacters {
            slug: candidate.to_string(),
        })
    }
}

/// Derive a slug from human-readable text.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::Empty);
    }

    let candidate = slugify(input);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_the_slug_alphabet() {
        assert_eq!(validate_slug("rust-in-2024"), Ok(()));
        assert_eq!(validate_slug("a"), Ok(()));
    }

    #[test]
    fn validate_rejects_uppercase_and_spaces() {
        assert!(matches!(
            validate_slug("Rust-Post"),
            Err(SlugError::InvalidCharacters { .. })
        ));
        assert!(matches!(
            validate_slug("two words"),
            Err(SlugError::InvalidCharacters { .. })
        ));
        assert_eq!(validate_slug(""), Err(SlugError::Empty));
    }

    #[test]
    fn derive_slug_normalizes_titles() {
        let slug = derive_slug("Pattern Library, Revisited").expect("slug");
        assert_eq!(slug, "pattern-library-revisited");
        assert_eq!(validate_slug(&slug), Ok(()));
    }

    #[test]
    fn derive_slug_rejects_empty_input() {
        assert_eq!(derive_slug("   "), Err(SlugError::Empty));
    }
}
