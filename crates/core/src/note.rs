//! Note data model: validation and markdown (de)serialization.
//!
//! A note is stored as a YAML header block followed by the raw markdown body:
//!
//! ```markdown
//! ---
//! title: My Note
//! created: 2024-06-15T12:00:00Z
//! updated: 2024-06-15T12:00:00Z
//! tags:
//! - reading
//! ---
//! body text
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum allowed title length, in characters.
pub const MAX_TITLE_LEN: usize = 200;

/// Errors raised when note fields fail validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NoteValidationError {
    #[error("path cannot be empty")]
    EmptyPath,

    #[error("path can only contain letters, digits, '-', '_' and '/': {0}")]
    InvalidPathChars(String),

    #[error("title cannot be empty")]
    EmptyTitle,

    #[error("title cannot exceed {MAX_TITLE_LEN} characters")]
    TitleTooLong,
}

/// A note with content and metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    /// `/`-delimited identifier, relative, no `..`.
    pub path: String,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Header block serialized above the note body.
///
/// Every field is optional on the way in so a hand-edited header with missing
/// entries still loads; writing always emits title and both timestamps.
#[derive(Debug, Serialize, Deserialize)]
struct NoteHeader {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    created: Option<DateTime<Utc>>,
    #[serde(default)]
    updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
}

impl Note {
    /// Build a validated note with fresh timestamps.
    ///
    /// The path and title are validated strictly; invalid tags are silently
    /// dropped rather than rejected.
    pub fn new(
        path: &str,
        title: &str,
        content: &str,
        tags: Vec<String>,
    ) -> Result<Self, NoteValidationError> {
        let now = Utc::now();
        Ok(Self {
            path: validate_path(path)?,
            title: validate_title(title)?,
            content: content.to_string(),
            tags: filter_tags(tags),
            created_at: now,
            updated_at: now,
        })
    }

    /// Serialize to markdown with the YAML header block.
    pub fn to_markdown(&self) -> String {
        let header = NoteHeader {
            title: Some(self.title.clone()),
            created: Some(self.created_at),
            updated: Some(self.updated_at),
            tags: self.tags.clone(),
        };
        let yaml = serde_yaml::to_string(&header).unwrap_or_default();
        format!("---\n{}---\n{}", yaml, self.content)
    }

    /// Parse a note from markdown with a YAML header block.
    ///
    /// Parsing is lenient: a missing or malformed header falls back to the
    /// last path segment as title, empty tags, and the current time.
    pub fn from_markdown(path: &str, content: &str) -> Self {
        let now = Utc::now();
        let fallback_title =
            path.rsplit('/').next().unwrap_or(path).to_string();

        let (header, body) = split_header(content);
        match header {
            Some(h) => {
                let parsed = serde_yaml::from_str::<NoteHeader>(h).unwrap_or(NoteHeader {
                    title: None,
                    created: None,
                    updated: None,
                    tags: Vec::new(),
                });
                Self {
                    path: path.to_string(),
                    title: parsed.title.unwrap_or(fallback_title),
                    content: body.to_string(),
                    tags: parsed.tags,
                    created_at: parsed.created.unwrap_or(now),
                    updated_at: parsed.updated.unwrap_or(now),
                }
            }
            None => Self {
                path: path.to_string(),
                title: fallback_title,
                content: content.to_string(),
                tags: Vec::new(),
                created_at: now,
                updated_at: now,
            },
        }
    }
}

/// Split content into `(header_yaml, body)` if a `---` block is present.
///
/// Exactly one newline after the closing delimiter is consumed, so the body
/// round-trips byte for byte (link line numbers depend on it).
fn split_header(content: &str) -> (Option<&str>, &str) {
    let Some(rest) = content.strip_prefix("---\n") else {
        return (None, content);
    };
    let mut pos = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim() == "---" {
            let yaml = &rest[..pos];
            let body = &rest[pos + line.len()..];
            return (Some(yaml), body);
        }
        pos += line.len();
    }
    (None, content)
}

/// Validate and normalize a note path.
pub fn validate_path(path: &str) -> Result<String, NoteValidationError> {
    let trimmed = path.trim();
    let clean = trimmed.strip_prefix('/').unwrap_or(trimmed);
    if clean.is_empty() {
        return Err(NoteValidationError::EmptyPath);
    }
    let ok = clean
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/'));
    if !ok {
        return Err(NoteValidationError::InvalidPathChars(clean.to_string()));
    }
    Ok(clean.to_string())
}

/// Validate and trim a note title.
pub fn validate_title(title: &str) -> Result<String, NoteValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(NoteValidationError::EmptyTitle);
    }
    if trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(NoteValidationError::TitleTooLong);
    }
    Ok(trimmed.to_string())
}

/// Trim tags and silently drop any outside `[A-Za-z0-9_-]`.
pub fn filter_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| {
            !t.is_empty()
                && t.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        })
        .collect()
}
