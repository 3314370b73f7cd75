//! Post documents: validated metadata plus a Markdown body.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::frontmatter::{extract_frontmatter, Fields, FrontmatterError};

/// Errors that can occur when parsing a post document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Frontmatter error: {0}")]
    Frontmatter(#[from] FrontmatterError),

    #[error("Missing required `date` field")]
    MissingDate,

    #[error("Unparsable `date` field: {0}")]
    InvalidDate(String),

    #[error("Field `{field}` must be {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },
}

/// Publication date of a post.
///
/// Compares by the normalized point in time; keeps the text the author wrote
/// for display.
#[derive(Debug, Clone)]
pub struct PostDate {
    value: NaiveDateTime,
    raw: String,
}

impl PostDate {
    /// Parse a date in one of the accepted forms.
    ///
    /// - `2023-06-15` (midnight)
    /// - `2023-06-15T10:30:00` or `2023-06-15 10:30:00`, optional fraction
    /// - `2023-06-15T10:30:00+02:00` (normalized to UTC)
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();

        let value = if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            dt.naive_utc()
        } else if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            date.and_hms_opt(0, 0, 0)?
        } else {
            [
                "%Y-%m-%dT%H:%M:%S",
                "%Y-%m-%dT%H:%M:%S%.f",
                "%Y-%m-%d %H:%M:%S",
                "%Y-%m-%d %H:%M:%S%.f",
            ]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())?
        };

        Some(Self {
            value,
            raw: trimmed.to_string(),
        })
    }

    /// The date as written in the frontmatter.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The normalized point in time used for ordering.
    pub fn datetime(&self) -> NaiveDateTime {
        self.value
    }
}

impl PartialEq for PostDate {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for PostDate {}

impl PartialOrd for PostDate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PostDate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

impl fmt::Display for PostDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for PostDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

/// Validated post metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct PostMeta {
    /// Publication date (required)
    pub date: PostDate,

    /// Post title
    pub title: Option<String>,

    /// Every other frontmatter field, untyped
    pub extra: Fields,
}

impl PostMeta {
    /// Validate raw frontmatter fields against the post schema.
    pub fn from_fields(mut fields: Fields) -> Result<Self, DocumentError> {
        let date = match fields.remove("date") {
            Some(serde_yaml::Value::String(s)) => {
                PostDate::parse(&s).ok_or(DocumentError::InvalidDate(s))?
            }
            Some(serde_yaml::Value::Null) | None => return Err(DocumentError::MissingDate),
            Some(other) => return Err(DocumentError::InvalidDate(describe(&other))),
        };

        let title = match fields.remove("title") {
            Some(serde_yaml::Value::String(s)) => Some(s),
            None => None,
            Some(_) => {
                return Err(DocumentError::InvalidField {
                    field: "title",
                    expected: "a string",
                })
            }
        };

        Ok(Self {
            date,
            title,
            extra: fields,
        })
    }
}

/// Templates see the metadata as one flat mapping.
impl Serialize for PostMeta {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = 1 + usize::from(self.title.is_some()) + self.extra.len();
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("date", &self.date)?;
        if let Some(title) = &self.title {
            map.serialize_entry("title", title)?;
        }
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

fn describe(value: &serde_yaml::Value) -> String {
    serde_yaml::to_string(value)
        .map(|s| s.trim_end().to_string())
        .unwrap_or_else(|_| format!("{:?}", value))
}

/// A parsed post: metadata plus raw Markdown body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    /// Validated frontmatter
    pub metadata: PostMeta,

    /// Markdown content (without frontmatter)
    pub content: String,
}

/// Parse a post document.
///
/// Fails unless the frontmatter carries an orderable `date`.
pub fn parse_document(source: &str) -> Result<Document, DocumentError> {
    let (fields, content) = extract_frontmatter(source)?;
    let metadata = PostMeta::from_fields(fields)?;

    Ok(Document {
        metadata,
        content: content.to_string(),
    })
}
