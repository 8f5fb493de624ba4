//! Google Books volumes search.
//!
//! Works without a key at a low quota; set GOOGLE_BOOKS_API_KEY for more.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{CatalogError, CatalogMatch, CatalogQuery, CatalogService};
use crate::config::CatalogConfig;

pub struct GoogleBooksClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    volume_info: Option<VolumeInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    industry_identifiers: Vec<IndustryIdentifier>,
}

#[derive(Debug, Deserialize)]
struct IndustryIdentifier {
    #[serde(rename = "type")]
    kind: String,
    identifier: String,
}

impl GoogleBooksClient {
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| CatalogError::Request(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

/// Best match from a volumes search body.
///
/// Only the first volume counts, and it must carry a title and at least one author.
pub(crate) fn parse_volumes(body: &str) -> Result<Option<CatalogMatch>, CatalogError> {
    let response: VolumesResponse =
        serde_json::from_str(body).map_err(|e| CatalogError::Malformed(e.to_string()))?;

    let Some(info) = response.items.into_iter().next().and_then(|v| v.volume_info) else {
        return Ok(None);
    };

    let title = match info.title.as_deref().map(str::trim) {
        Some(title) if !title.is_empty() => title.to_string(),
        _ => return Ok(None),
    };

    let authors: Vec<&str> = info
        .authors
        .iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .collect();
    if authors.is_empty() {
        return Ok(None);
    }

    let identifier = info
        .industry_identifiers
        .iter()
        .find(|id| id.kind == "ISBN_13")
        .or_else(|| info.industry_identifiers.first())
        .map(|id| id.identifier.clone());

    Ok(Some(CatalogMatch {
        title,
        author: authors.join(", "),
        categories: info.categories,
        identifier,
    }))
}

#[async_trait]
impl CatalogService for GoogleBooksClient {
    fn name(&self) -> &str {
        "google-books"
    }

    async fn search(&self, query: &CatalogQuery) -> Result<Option<CatalogMatch>, CatalogError> {
        let q = query.to_search_string();
        let mut params = vec![("q", q.as_str()), ("maxResults", "1")];
        if let Some(key) = self.api_key.as_deref() {
            params.push(("key", key));
        }

        let response = self
            .client
            .get(&self.endpoint)
            .query(&params)
            .send()
            .await
            .map_err(|e| CatalogError::Request(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(CatalogError::RateLimited);
        }
        if !status.is_success() {
            return Err(CatalogError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CatalogError::Request(e.to_string()))?;

        let result = parse_volumes(&body)?;
        debug!("Google Books '{}': {}", q, if result.is_some() { "match" } else { "no match" });
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_volume() {
        let body = r#"{
            "kind": "books#volumes",
            "totalItems": 1,
            "items": [{
                "volumeInfo": {
                    "title": "Good Omens",
                    "authors": ["Terry Pratchett", "Neil Gaiman"],
                    "categories": ["Fiction"],
                    "industryIdentifiers": [
                        {"type": "ISBN_10", "identifier": "0060853980"},
                        {"type": "ISBN_13", "identifier": "9780060853983"}
                    ]
                }
            }]
        }"#;

        let found = parse_volumes(body).unwrap().unwrap();
        assert_eq!(found.title, "Good Omens");
        assert_eq!(found.author, "Terry Pratchett, Neil Gaiman");
        assert_eq!(found.categories, vec!["Fiction"]);
        assert_eq!(found.identifier.as_deref(), Some("9780060853983"));
    }

    #[test]
    fn test_identifier_falls_back_to_first() {
        let body = r#"{"items": [{"volumeInfo": {
            "title": "Dune", "authors": ["Frank Herbert"],
            "industryIdentifiers": [{"type": "OTHER", "identifier": "UOM:39015"}]
        }}]}"#;
        let found = parse_volumes(body).unwrap().unwrap();
        assert_eq!(found.identifier.as_deref(), Some("UOM:39015"));
        assert!(found.categories.is_empty());
    }

    #[test]
    fn test_no_items_or_missing_author_is_no_match() {
        assert_eq!(parse_volumes(r#"{"totalItems": 0}"#).unwrap(), None);
        let no_author = r#"{"items": [{"volumeInfo": {"title": "Dune"}}]}"#;
        assert_eq!(parse_volumes(no_author).unwrap(), None);
    }

    #[test]
    fn test_malformed_body() {
        assert!(matches!(
            parse_volumes("not json"),
            Err(CatalogError::Malformed(_))
        ));
    }
}
