//! Post records and the category taxonomy.
//!
//! A [`Post`] is the canonical in-memory form of one content document; a
//! [`PostSummary`] is its metadata-only projection carried by the index.
//! Dates are calendar dates serialized as `YYYY-MM-DD`, matching the
//! frontmatter convention of the content repository.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::{Date, format_description::FormatItem, macros::format_description};

use super::reading_time;

pub const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Closed category taxonomy. The declaration order is the display order
/// returned by category listings.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Dev,
    Life,
    Review,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Dev, Category::Life, Category::Review];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Dev => "dev",
            Category::Life => "life",
            Category::Review => "review",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Dev => "Dev",
            Category::Life => "Life",
            Category::Review => "Review",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "dev" => Some(Category::Dev),
            "life" => Some(Category::Life),
            "review" => Some(Category::Review),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A full post: frontmatter fields plus the markdown body. The body lives
/// only in the content repository and is never carried by the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub slug: String,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    #[serde(with = "iso_date")]
    pub published_at: Date,
    #[serde(
        default,
        with = "iso_date::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<Date>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub category: Category,
}

impl Post {
    /// Project the metadata-only summary, computing the reading time once
    /// so list reads never touch the body again.
    pub fn summary(&self) -> PostSummary {
        PostSummary {
            slug: self.slug.clone(),
            title: self.title.clone(),
            excerpt: self.excerpt.clone(),
            published_at: self.published_at,
            updated_at: self.updated_at,
            tags: self.tags.clone(),
            category: self.category,
            reading_time: reading_time::estimate_minutes(&self.content),
        }
    }
}

/// Metadata-only projection of a [`Post`], as stored in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    #[serde(with = "iso_date")]
    pub published_at: Date,
    #[serde(
        default,
        with = "iso_date::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<Date>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub category: Category,
    pub reading_time: u32,
}

/// Serde adapter for `YYYY-MM-DD` calendar dates.
pub mod iso_date {
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _, ser::Error as _};
    use time::Date;

    use super::DATE_FORMAT;

    pub fn serialize<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = date.format(DATE_FORMAT).map_err(S::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Date, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Date::parse(&raw, DATE_FORMAT).map_err(D::Error::custom)
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer, de::Error as _, ser::Error as _};
        use time::Date;

        use super::super::DATE_FORMAT;

        pub fn serialize<S>(date: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match date {
                Some(date) => {
                    let formatted = date.format(DATE_FORMAT).map_err(S::Error::custom)?;
                    serializer.serialize_some(&formatted)
                }
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Date>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let raw = Option::<String>::deserialize(deserializer)?;
            raw.map(|value| Date::parse(&value, DATE_FORMAT).map_err(D::Error::custom))
                .transpose()
        }
    }
}
