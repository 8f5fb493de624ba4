//! Catalog enrichment of raw candidates.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::{CatalogMatch, CatalogQuery, CatalogService};
use crate::config::CatalogConfig;
use crate::models::{EnrichedCandidate, RawCandidate};
use crate::rate_limit::RateLimiter;

/// Looks candidates up in the catalog, one at a time, behind a shared limiter.
///
/// Clones share the limiter, so the inter-call delay holds across every file
/// processed concurrently.
#[derive(Clone)]
pub struct Enricher {
    catalog: Arc<dyn CatalogService>,
    limiter: RateLimiter,
    max_queries: usize,
    timeout: Duration,
}

impl Enricher {
    pub fn new(catalog: Arc<dyn CatalogService>, config: &CatalogConfig) -> Self {
        Self {
            catalog,
            limiter: RateLimiter::new("catalog", config.delay()),
            max_queries: config.max_queries,
            timeout: config.timeout(),
        }
    }

    /// Enrich candidates in order.
    ///
    /// Candidates without a title are dropped. Only the first `max_queries`
    /// are looked up; the rest, and any whose lookup fails, pass through
    /// with empty categories.
    pub async fn enrich(&self, candidates: Vec<RawCandidate>) -> Vec<EnrichedCandidate> {
        let mut enriched = Vec::with_capacity(candidates.len());

        for (index, raw) in candidates
            .into_iter()
            .filter(RawCandidate::has_title)
            .enumerate()
        {
            if index < self.max_queries {
                enriched.push(self.enrich_one(raw).await);
            } else {
                enriched.push(EnrichedCandidate::from(raw));
            }
        }

        debug!(
            "Enriched {} of {} candidate(s) from {}",
            enriched.iter().filter(|c| c.is_enriched()).count(),
            enriched.len(),
            self.catalog.name()
        );
        enriched
    }

    async fn enrich_one(&self, raw: RawCandidate) -> EnrichedCandidate {
        let query = CatalogQuery::from_candidate(&raw);
        self.limiter.acquire().await;

        match tokio::time::timeout(self.timeout, self.catalog.search(&query)).await {
            Ok(Ok(Some(found))) => merge(raw, found),
            Ok(Ok(None)) => {
                debug!("No catalog match for '{}'", query.title);
                EnrichedCandidate::from(raw)
            }
            Ok(Err(e)) => {
                warn!("Catalog lookup for '{}' failed: {}", query.title, e);
                EnrichedCandidate::from(raw)
            }
            Err(_) => {
                warn!(
                    "Catalog lookup for '{}' timed out after {:?}",
                    query.title, self.timeout
                );
                EnrichedCandidate::from(raw)
            }
        }
    }
}

/// Catalog values win when present; the raw candidate fills the gaps.
fn merge(raw: RawCandidate, found: CatalogMatch) -> EnrichedCandidate {
    let raw = EnrichedCandidate::from(raw);
    let title = if found.title.trim().is_empty() {
        raw.title
    } else {
        found.title
    };
    let author = if found.author.trim().is_empty() {
        raw.author
    } else {
        found.author
    };

    EnrichedCandidate {
        title,
        author,
        categories: found.categories,
        isbn: found.identifier,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    enum Behavior {
        Match,
        NoMatch,
        Fail,
        Hang,
    }

    struct FakeCatalog {
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl FakeCatalog {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CatalogService for FakeCatalog {
        fn name(&self) -> &str {
            "fake"
        }

        async fn search(
            &self,
            query: &CatalogQuery,
        ) -> Result<Option<CatalogMatch>, CatalogError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Match => Ok(Some(CatalogMatch {
                    title: format!("{} (Canonical)", query.title),
                    author: "Catalog Author".to_string(),
                    categories: vec!["Fiction".to_string()],
                    identifier: Some("9780000000000".to_string()),
                })),
                Behavior::NoMatch => Ok(None),
                Behavior::Fail => Err(CatalogError::Status(503)),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(None)
                }
            }
        }
    }

    fn config(delay_ms: u64) -> CatalogConfig {
        CatalogConfig {
            delay_ms,
            timeout_ms: 50,
            ..CatalogConfig::default()
        }
    }

    fn candidates(n: usize) -> Vec<RawCandidate> {
        (0..n)
            .map(|i| RawCandidate::new(format!("Title {}", i), format!("Author {}", i)))
            .collect()
    }

    #[tokio::test]
    async fn test_match_prefers_catalog_values() {
        let catalog = FakeCatalog::new(Behavior::Match);
        let enricher = Enricher::new(catalog.clone(), &config(0));

        let out = enricher
            .enrich(vec![RawCandidate::new("Dune", "F. Herbert")])
            .await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "Dune (Canonical)");
        assert_eq!(out[0].author, "Catalog Author");
        assert_eq!(out[0].categories, vec!["Fiction"]);
        assert_eq!(out[0].isbn.as_deref(), Some("9780000000000"));
    }

    #[tokio::test]
    async fn test_query_cap_bounds_calls_not_output() {
        let catalog = FakeCatalog::new(Behavior::Match);
        let enricher = Enricher::new(catalog.clone(), &config(0));

        let out = enricher.enrich(candidates(20)).await;
        assert_eq!(catalog.calls(), 10);
        assert_eq!(out.len(), 20);
        assert!(out[..10].iter().all(EnrichedCandidate::is_enriched));
        assert!(out[10..].iter().all(|c| !c.is_enriched()));
        assert_eq!(out[15].title, "Title 15");
    }

    #[tokio::test]
    async fn test_failures_keep_every_candidate() {
        for behavior in [Behavior::Fail, Behavior::NoMatch] {
            let catalog = FakeCatalog::new(behavior);
            let enricher = Enricher::new(catalog.clone(), &config(0));

            let out = enricher.enrich(candidates(5)).await;
            assert_eq!(out.len(), 5);
            assert!(out.iter().all(|c| c.categories.is_empty()));
            assert_eq!(out[2], EnrichedCandidate::from(RawCandidate::new("Title 2", "Author 2")));
        }
    }

    #[tokio::test]
    async fn test_timeout_falls_back_to_raw() {
        let catalog = FakeCatalog::new(Behavior::Hang);
        let enricher = Enricher::new(catalog.clone(), &config(0));

        let start = Instant::now();
        let out = enricher.enrich(candidates(2)).await;
        assert_eq!(out.len(), 2);
        assert!(!out[0].is_enriched());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_untitled_candidates_are_dropped() {
        let catalog = FakeCatalog::new(Behavior::NoMatch);
        let enricher = Enricher::new(catalog.clone(), &config(0));

        let out = enricher
            .enrich(vec![
                RawCandidate::new("   ", "Someone"),
                RawCandidate::new("Emma", ""),
            ])
            .await;
        assert_eq!(out.len(), 1);
        assert_eq!(catalog.calls(), 1);
    }

    #[tokio::test]
    async fn test_calls_are_spaced_by_delay() {
        let catalog = FakeCatalog::new(Behavior::NoMatch);
        let enricher = Enricher::new(catalog.clone(), &config(30));

        let start = Instant::now();
        enricher.enrich(candidates(3)).await;
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_clones_share_the_delay() {
        let catalog = FakeCatalog::new(Behavior::NoMatch);
        let enricher = Enricher::new(catalog.clone(), &config(30));
        let other = enricher.clone();

        let start = Instant::now();
        tokio::join!(enricher.enrich(candidates(2)), other.enrich(candidates(2)));
        // Four calls through one limiter: three full intervals.
        assert!(start.elapsed() >= Duration::from_millis(90));
        assert_eq!(catalog.calls(), 4);
    }
}
