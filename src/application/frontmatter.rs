//! Frontmatter parsing, validation, and document composition.
//!
//! Content documents are a YAML metadata block between `---` delimiters
//! followed by a markdown body. Parsing is deliberately tolerant: a
//! document whose metadata fails validation still yields a best-effort
//! record with defaults substituted, so one malformed post degrades
//! instead of breaking every listing. Only a missing delimiter pair or
//! broken YAML is unrecoverable.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_yaml::Value;
use thiserror::Error;
use time::Date;
use time::macros::date;

use crate::domain::posts::{Category, DATE_FORMAT, Post};

type RawMapping = BTreeMap<String, Value>;

/// Typed metadata block of one document. `draft` is carried here but is
/// not part of [`Post`]; the serving layer decides what to do with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frontmatter {
    pub title: String,
    pub excerpt: String,
    pub published_at: Date,
    pub updated_at: Option<Date>,
    pub tags: Vec<String>,
    pub category: Category,
    pub draft: bool,
}

impl Frontmatter {
    pub fn into_post(self, slug: impl Into<String>, body: impl Into<String>) -> Post {
        Post {
            slug: slug.into(),
            title: self.title,
            content: body.into(),
            excerpt: self.excerpt,
            published_at: self.published_at,
            updated_at: self.updated_at,
            tags: self.tags,
            category: self.category,
        }
    }
}

/// One field-level validation failure, kept for logging and reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("document has no frontmatter block")]
    MissingBlock,
    #[error("frontmatter is not a YAML mapping")]
    NotAMapping,
    #[error("frontmatter is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Outcome of parsing one document. Callers must handle the degraded
/// variants explicitly; there is no silent success path.
#[derive(Debug)]
pub enum FrontmatterOutcome {
    Valid {
        frontmatter: Frontmatter,
        body: String,
    },
    Recovered {
        frontmatter: Frontmatter,
        body: String,
        errors: Vec<FieldError>,
    },
    Unparseable(ParseError),
}

impl FrontmatterOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    /// Frontmatter, body, and accumulated field errors; `Err` for
    /// unparseable documents.
    pub fn into_parts(self) -> Result<(Frontmatter, String, Vec<FieldError>), ParseError> {
        match self {
            Self::Valid { frontmatter, body } => Ok((frontmatter, body, Vec::new())),
            Self::Recovered {
                frontmatter,
                body,
                errors,
            } => Ok((frontmatter, body, errors)),
            Self::Unparseable(error) => Err(error),
        }
    }
}

/// Parse a raw document into metadata and body. `default_category` is the
/// configured substitute for a missing or unknown category.
pub fn parse_document(raw: &str, default_category: Category) -> FrontmatterOutcome {
    let (yaml, body) = match split_frontmatter(raw) {
        Ok(parts) => parts,
        Err(error) => return FrontmatterOutcome::Unparseable(error),
    };

    let mapping = if yaml.trim().is_empty() {
        RawMapping::new()
    } else {
        match serde_yaml::from_str::<Value>(yaml) {
            Ok(Value::Mapping(_)) => match serde_yaml::from_str::<RawMapping>(yaml) {
                Ok(mapping) => mapping,
                Err(error) => return FrontmatterOutcome::Unparseable(ParseError::Yaml(error)),
            },
            Ok(Value::Null) => RawMapping::new(),
            Ok(_) => return FrontmatterOutcome::Unparseable(ParseError::NotAMapping),
            Err(error) => return FrontmatterOutcome::Unparseable(ParseError::Yaml(error)),
        }
    };

    let mut errors = Vec::new();
    let frontmatter = validate(&mapping, default_category, &mut errors);
    let body = body.to_string();

    if errors.is_empty() {
        FrontmatterOutcome::Valid { frontmatter, body }
    } else {
        FrontmatterOutcome::Recovered {
            frontmatter,
            body,
            errors,
        }
    }
}

fn validate(
    mapping: &RawMapping,
    default_category: Category,
    errors: &mut Vec<FieldError>,
) -> Frontmatter {
    let title = required_string(mapping, "title", errors);
    let excerpt = required_string(mapping, "excerpt", errors);
    let published_at = match mapping.get("publishedAt") {
        Some(value) => coerce_date(value).unwrap_or_else(|message| {
            errors.push(FieldError::new("publishedAt", message));
            FALLBACK_DATE
        }),
        None => {
            errors.push(FieldError::new("publishedAt", "missing required field"));
            FALLBACK_DATE
        }
    };
    let updated_at = match mapping.get("updatedAt") {
        Some(value) => match coerce_date(value) {
            Ok(date) => Some(date),
            Err(message) => {
                errors.push(FieldError::new("updatedAt", message));
                None
            }
        },
        None => None,
    };
    let tags = coerce_tags(mapping.get("tags"), errors);
    let category = coerce_category(mapping.get("category"), default_category, errors);
    let draft = match mapping.get("draft") {
        Some(Value::Bool(value)) => *value,
        Some(_) => {
            errors.push(FieldError::new("draft", "expected a boolean"));
            false
        }
        None => false,
    };

    Frontmatter {
        title,
        excerpt,
        published_at,
        updated_at,
        tags,
        category,
        draft,
    }
}

/// Substitute for an unusable `publishedAt`; sorts last and is easy to
/// spot in listings.
const FALLBACK_DATE: Date = date!(1970 - 01 - 01);

fn required_string(
    mapping: &RawMapping,
    field: &'static str,
    errors: &mut Vec<FieldError>,
) -> String {
    match mapping.get(field) {
        Some(Value::String(value)) if !value.trim().is_empty() => value.clone(),
        Some(Value::String(_)) => {
            errors.push(FieldError::new(field, "must not be empty"));
            String::new()
        }
        Some(other) => {
            errors.push(FieldError::new(
                field,
                format!("expected a string, got {}", value_kind(other)),
            ));
            String::new()
        }
        None => {
            errors.push(FieldError::new(field, "missing required field"));
            String::new()
        }
    }
}

/// Accept `YYYY-MM-DD`, or a longer timestamp whose first ten characters
/// are a date (authors sometimes paste full ISO timestamps).
fn coerce_date(value: &Value) -> Result<Date, String> {
    let Some(raw) = value.as_str() else {
        return Err(format!("expected a date string, got {}", value_kind(value)));
    };

    if let Ok(date) = Date::parse(raw, DATE_FORMAT) {
        return Ok(date);
    }
    if let Some(prefix) = raw.get(..10) {
        if let Ok(date) = Date::parse(prefix, DATE_FORMAT) {
            return Ok(date);
        }
    }

    Err(format!("`{raw}` is not a YYYY-MM-DD date"))
}

/// Tags accept a string sequence or one comma-separated string; both
/// normalize to a trimmed list with empties dropped.
fn coerce_tags(value: Option<&Value>, errors: &mut Vec<FieldError>) -> Vec<String> {
    match value {
        None => Vec::new(),
        Some(Value::Sequence(items)) => {
            let mut tags = Vec::with_capacity(items.len());
            for item in items {
                match item.as_str() {
                    Some(tag) if !tag.trim().is_empty() => tags.push(tag.trim().to_string()),
                    Some(_) => {}
                    None => errors.push(FieldError::new(
                        "tags",
                        format!("expected a string entry, got {}", value_kind(item)),
                    )),
                }
            }
            tags
        }
        Some(Value::String(raw)) => raw
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect(),
        Some(other) => {
            errors.push(FieldError::new(
                "tags",
                format!("expected a sequence or string, got {}", value_kind(other)),
            ));
            Vec::new()
        }
    }
}

fn coerce_category(
    value: Option<&Value>,
    default_category: Category,
    errors: &mut Vec<FieldError>,
) -> Category {
    match value {
        // Absent is fine: the category is optional and defaults.
        None => default_category,
        Some(Value::String(raw)) => match Category::parse(raw) {
            Some(category) => category,
            None => {
                errors.push(FieldError::new(
                    "category",
                    format!("unknown category `{raw}`, defaulting to `{default_category}`"),
                ));
                default_category
            }
        },
        Some(other) => {
            errors.push(FieldError::new(
                "category",
                format!("expected a string, got {}", value_kind(other)),
            ));
            default_category
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

fn split_frontmatter(raw: &str) -> Result<(&str, &str), ParseError> {
    let after = raw.strip_prefix("---").ok_or(ParseError::MissingBlock)?;
    let after = after
        .strip_prefix("\r\n")
        .or_else(|| after.strip_prefix('\n'))
        .ok_or(ParseError::MissingBlock)?;

    let mut offset = 0;
    while offset <= after.len() {
        let line_end = after[offset..].find('\n').map(|at| offset + at);
        let line = match line_end {
            Some(end) => &after[offset..end],
            None => &after[offset..],
        };

        if line.trim_end_matches('\r') == "---" {
            let yaml = &after[..offset];
            let body = match line_end {
                Some(end) => &after[end + 1..],
                None => "",
            };
            let body = body
                .strip_prefix("\r\n")
                .or_else(|| body.strip_prefix('\n'))
                .unwrap_or(body);
            return Ok((yaml, body));
        }

        match line_end {
            Some(end) => offset = end + 1,
            None => break,
        }
    }

    Err(ParseError::MissingBlock)
}

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("failed to encode frontmatter: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("failed to format date: {0}")]
    Date(#[from] time::error::Format),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FrontmatterDoc<'a> {
    title: &'a str,
    excerpt: &'a str,
    published_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<String>,
    tags: &'a [String],
    category: Category,
}

/// Render a post back into its stored document form.
pub fn compose_document(post: &Post) -> Result<String, ComposeError> {
    let doc = FrontmatterDoc {
        title: &post.title,
        excerpt: &post.excerpt,
        published_at: post.published_at.format(DATE_FORMAT)?,
        updated_at: post
            .updated_at
            .map(|date| date.format(DATE_FORMAT))
            .transpose()?,
        tags: &post.tags,
        category: post.category,
    };

    let yaml = serde_yaml::to_string(&doc)?;
    Ok(format!("---\n{yaml}---\n\n{}", post.content))
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    fn parse(raw: &str) -> FrontmatterOutcome {
        parse_document(raw, Category::Dev)
    }

    #[test]
    fn complete_frontmatter_is_valid() {
        let raw = "---\ntitle: First Post\nexcerpt: A beginning\npublishedAt: \"2024-01-05\"\ntags:\n  - Go\n  - Rust\ncategory: dev\n---\n\nBody text.\n";

        let FrontmatterOutcome::Valid { frontmatter, body } = parse(raw) else {
            panic!("expected valid outcome");
        };
        assert_eq!(frontmatter.title, "First Post");
        assert_eq!(frontmatter.published_at, date!(2024 - 01 - 05));
        assert_eq!(frontmatter.tags, ["Go", "Rust"]);
        assert_eq!(frontmatter.category, Category::Dev);
        assert!(!frontmatter.draft);
        assert_eq!(body, "Body text.\n");
    }

    #[test]
    fn unquoted_dates_parse_as_strings() {
        let raw = "---\ntitle: T\nexcerpt: E\npublishedAt: 2024-01-05\n---\nx";
        let FrontmatterOutcome::Valid { frontmatter, .. } = parse(raw) else {
            panic!("expected valid outcome");
        };
        assert_eq!(frontmatter.published_at, date!(2024 - 01 - 05));
    }

    #[test]
    fn timestamp_dates_are_truncated_to_the_day() {
        let raw = "---\ntitle: T\nexcerpt: E\npublishedAt: \"2024-01-05T09:30:00Z\"\n---\nx";
        let FrontmatterOutcome::Valid { frontmatter, .. } = parse(raw) else {
            panic!("expected valid outcome");
        };
        assert_eq!(frontmatter.published_at, date!(2024 - 01 - 05));
    }

    #[test]
    fn comma_separated_tags_normalize_to_a_list() {
        let raw = "---\ntitle: T\nexcerpt: E\npublishedAt: 2024-01-05\ntags: \"go, rust , ,wasm\"\n---\nx";
        let FrontmatterOutcome::Valid { frontmatter, .. } = parse(raw) else {
            panic!("expected valid outcome");
        };
        assert_eq!(frontmatter.tags, ["go", "rust", "wasm"]);
    }

    #[test]
    fn missing_tags_default_to_empty_without_error() {
        let raw = "---\ntitle: T\nexcerpt: E\npublishedAt: 2024-01-05\n---\nx";
        let FrontmatterOutcome::Valid { frontmatter, .. } = parse(raw) else {
            panic!("expected valid outcome");
        };
        assert!(frontmatter.tags.is_empty());
    }

    #[test]
    fn missing_category_defaults_without_error() {
        let raw = "---\ntitle: T\nexcerpt: E\npublishedAt: 2024-01-05\n---\nx";
        let outcome = parse_document(raw, Category::Life);
        let FrontmatterOutcome::Valid { frontmatter, .. } = outcome else {
            panic!("expected valid outcome");
        };
        assert_eq!(frontmatter.category, Category::Life);
    }

    #[test]
    fn unknown_category_recovers_with_the_default() {
        let raw = "---\ntitle: T\nexcerpt: E\npublishedAt: 2024-01-05\ncategory: misc\n---\nx";
        let FrontmatterOutcome::Recovered {
            frontmatter,
            errors,
            ..
        } = parse(raw)
        else {
            panic!("expected recovered outcome");
        };
        assert_eq!(frontmatter.category, Category::Dev);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "category");
    }

    #[test]
    fn missing_title_recovers_with_an_empty_string() {
        let raw = "---\nexcerpt: E\npublishedAt: 2024-01-05\n---\nx";
        let FrontmatterOutcome::Recovered {
            frontmatter,
            errors,
            ..
        } = parse(raw)
        else {
            panic!("expected recovered outcome");
        };
        assert_eq!(frontmatter.title, "");
        assert!(errors.iter().any(|error| error.field == "title"));
    }

    #[test]
    fn bad_published_at_falls_back_to_the_epoch() {
        let raw = "---\ntitle: T\nexcerpt: E\npublishedAt: someday\n---\nx";
        let FrontmatterOutcome::Recovered { frontmatter, .. } = parse(raw) else {
            panic!("expected recovered outcome");
        };
        assert_eq!(frontmatter.published_at, date!(1970 - 01 - 01));
    }

    #[test]
    fn document_without_delimiters_is_unparseable() {
        let outcome = parse("just a markdown body\n");
        assert!(matches!(
            outcome,
            FrontmatterOutcome::Unparseable(ParseError::MissingBlock)
        ));
    }

    #[test]
    fn unterminated_block_is_unparseable() {
        let outcome = parse("---\ntitle: T\nno closing delimiter\n");
        assert!(matches!(
            outcome,
            FrontmatterOutcome::Unparseable(ParseError::MissingBlock)
        ));
    }

    #[test]
    fn broken_yaml_is_unparseable() {
        let outcome = parse("---\ntitle: [unclosed\n---\nx");
        assert!(matches!(
            outcome,
            FrontmatterOutcome::Unparseable(ParseError::Yaml(_))
        ));
    }

    #[test]
    fn compose_then_parse_round_trips() {
        let post = Post {
            slug: "first".to_string(),
            title: "First Post".to_string(),
            content: "Hello, world.\n".to_string(),
            excerpt: "A beginning".to_string(),
            published_at: date!(2024 - 01 - 05),
            updated_at: Some(date!(2024 - 02 - 01)),
            tags: vec!["Go".to_string(), "Rust".to_string()],
            category: Category::Review,
        };

        let raw = compose_document(&post).expect("compose");
        let FrontmatterOutcome::Valid { frontmatter, body } = parse(&raw) else {
            panic!("expected valid outcome");
        };

        assert_eq!(frontmatter.title, post.title);
        assert_eq!(frontmatter.updated_at, post.updated_at);
        assert_eq!(frontmatter.tags, post.tags);
        assert_eq!(frontmatter.category, post.category);
        assert_eq!(body, post.content);
    }
}
