//! Persisted book records and the inputs used to create or change them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::genre::Genre;

/// Author stored when neither the photo nor the catalog named one.
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// A book in an owner's library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: String,
    pub owner_key: String,
    pub title: String,
    pub author: String,
    pub genre: Genre,
    pub image_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for a record that does not exist yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub owner_key: String,
    pub title: String,
    pub author: String,
    pub genre: Genre,
    pub image_ref: Option<String>,
}

impl NewBook {
    /// Build a new record, trimming fields and substituting [`UNKNOWN_AUTHOR`]
    /// for a blank author.
    pub fn new(
        owner_key: impl Into<String>,
        title: impl Into<String>,
        author: impl Into<String>,
        genre: Genre,
    ) -> Self {
        let title = title.into().trim().to_string();
        let author = author.into().trim().to_string();
        Self {
            owner_key: owner_key.into(),
            title,
            author: if author.is_empty() {
                UNKNOWN_AUTHOR.to_string()
            } else {
                author
            },
            genre,
            image_ref: None,
        }
    }

    pub fn with_image_ref(mut self, image_ref: Option<String>) -> Self {
        self.image_ref = image_ref;
        self
    }
}

/// Partial update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookUpdate {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<Genre>,
}

impl BookUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.author.is_none() && self.genre.is_none()
    }
}

/// Normalized form of a title or author for case-insensitive comparison.
pub fn dedup_key(value: &str) -> String {
    value.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_book_defaults_blank_author() {
        let book = NewBook::new("owner", "  Dune ", "   ", Genre::Fiction);
        assert_eq!(book.title, "Dune");
        assert_eq!(book.author, UNKNOWN_AUTHOR);
        assert!(book.image_ref.is_none());
    }

    #[test]
    fn test_dedup_key_ignores_case_and_padding() {
        assert_eq!(dedup_key(" DUNE "), dedup_key("dune"));
        assert_ne!(dedup_key("Dune"), dedup_key("Dune Messiah"));
    }
}
