//! Transient book candidates produced while processing a single image.

use serde::{Deserialize, Serialize};

/// A provisional (title, author) pair read off a photo.
///
/// `author` is empty when the extraction source could not attribute the title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCandidate {
    pub title: String,
    #[serde(default)]
    pub author: String,
}

impl RawCandidate {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
        }
    }

    /// A candidate is usable when it still has a title after trimming.
    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

/// A candidate after catalog lookup.
///
/// When the catalog had no match this is the raw candidate with empty
/// categories and no identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedCandidate {
    pub title: String,
    pub author: String,
    pub categories: Vec<String>,
    pub isbn: Option<String>,
}

impl EnrichedCandidate {
    /// Whether this candidate carries catalog metadata.
    pub fn is_enriched(&self) -> bool {
        !self.categories.is_empty() || self.isbn.is_some()
    }
}

impl From<RawCandidate> for EnrichedCandidate {
    fn from(raw: RawCandidate) -> Self {
        Self {
            title: raw.title.trim().to_string(),
            author: raw.author.trim().to_string(),
            categories: Vec::new(),
            isbn: None,
        }
    }
}
