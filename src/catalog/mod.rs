//! Bibliographic catalog lookup and candidate enrichment.

mod enrich;
mod google_books;

pub use enrich::Enricher;
pub use google_books::GoogleBooksClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{RawCandidate, UNKNOWN_AUTHOR};

/// Errors from a catalog lookup. Always recovered by the [`Enricher`].
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog request failed: {0}")]
    Request(String),

    #[error("Catalog returned HTTP {0}")]
    Status(u16),

    #[error("Catalog rate limited")]
    RateLimited,

    #[error("Malformed catalog response: {0}")]
    Malformed(String),
}

/// A title/author lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub title: String,
    pub author: Option<String>,
}

impl CatalogQuery {
    /// Build a query from a candidate. Placeholder authors are not searched on.
    pub fn from_candidate(candidate: &RawCandidate) -> Self {
        let author = candidate.author.trim();
        let author = (!author.is_empty() && !author.eq_ignore_ascii_case(UNKNOWN_AUTHOR))
            .then(|| author.to_string());
        Self {
            title: candidate.title.trim().to_string(),
            author,
        }
    }

    /// Field-qualified search string, e.g. `intitle:Dune inauthor:Frank Herbert`.
    pub fn to_search_string(&self) -> String {
        match &self.author {
            Some(author) => format!("intitle:{} inauthor:{}", self.title, author),
            None => format!("intitle:{}", self.title),
        }
    }
}

/// The catalog's best match for a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogMatch {
    pub title: String,
    pub author: String,
    pub categories: Vec<String>,
    pub identifier: Option<String>,
}

/// A bibliographic catalog.
#[async_trait]
pub trait CatalogService: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, query: &CatalogQuery) -> Result<Option<CatalogMatch>, CatalogError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_with_author() {
        let query = CatalogQuery::from_candidate(&RawCandidate::new(" Dune ", "Frank Herbert"));
        assert_eq!(query.to_search_string(), "intitle:Dune inauthor:Frank Herbert");
    }

    #[test]
    fn test_query_skips_blank_and_placeholder_authors() {
        let blank = CatalogQuery::from_candidate(&RawCandidate::new("Dune", ""));
        assert_eq!(blank.author, None);
        assert_eq!(blank.to_search_string(), "intitle:Dune");

        let unknown = CatalogQuery::from_candidate(&RawCandidate::new("Dune", "unknown author"));
        assert_eq!(unknown.author, None);
    }
}
