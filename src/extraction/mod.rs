//! Extraction strategies and the ordered fallback chain between them.
//!
//! Vision yields structured candidates directly; OCR yields a text block that
//! the caller runs through [`parse_candidates`]. The chain tries strategies in
//! order: vision failures and empty vision results fall through to the next
//! strategy, while OCR problems end the attempt for that image.

mod parser;

pub use parser::parse_candidates;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::imaging::NormalizedImage;
use crate::models::RawCandidate;
use crate::ocr::{OcrBackend, OcrError};
use crate::vision::{VisionBackend, VisionError};

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Vision extraction failed: {0}")]
    Vision(#[from] VisionError),

    #[error("OCR failed: {0}")]
    Ocr(#[from] OcrError),

    /// OCR produced too little text to be a readable photo.
    #[error("OCR produced only {chars} characters of text")]
    Unreadable { chars: usize },

    #[error("No extraction strategy produced any books")]
    NothingFound,
}

impl ExtractionError {
    /// Whether the chain should move on to the next strategy.
    fn is_recoverable(&self) -> bool {
        matches!(self, ExtractionError::Vision(_))
    }
}

/// What a strategy produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// Structured candidates, ready for enrichment.
    Candidates(Vec<RawCandidate>),
    /// Unstructured OCR text that still needs parsing.
    Text(String),
}

/// One way of getting books out of an image.
#[derive(Clone)]
pub enum ExtractionStrategy {
    Vision {
        backend: Arc<dyn VisionBackend>,
        timeout: Duration,
    },
    Ocr {
        backend: Arc<dyn OcrBackend>,
        language: String,
        min_text_chars: usize,
    },
}

impl ExtractionStrategy {
    pub fn name(&self) -> String {
        match self {
            ExtractionStrategy::Vision { backend, .. } => format!("vision:{}", backend.name()),
            ExtractionStrategy::Ocr { backend, .. } => format!("ocr:{}", backend.backend_type()),
        }
    }

    pub async fn extract(&self, image: &NormalizedImage) -> Result<Extraction, ExtractionError> {
        match self {
            ExtractionStrategy::Vision { backend, timeout } => {
                let request = backend.extract(&image.vision.bytes, &image.vision.media_type);
                let candidates = tokio::time::timeout(*timeout, request)
                    .await
                    .map_err(|_| {
                        VisionError::ServiceUnavailable(format!("timed out after {:?}", timeout))
                    })??;
                Ok(Extraction::Candidates(candidates))
            }
            ExtractionStrategy::Ocr {
                backend,
                language,
                min_text_chars,
            } => {
                let text = backend.recognize(&image.raster, language).await?;
                let chars = text.trim().chars().count();
                if chars < *min_text_chars {
                    return Err(ExtractionError::Unreadable { chars });
                }
                Ok(Extraction::Text(text))
            }
        }
    }
}

/// Ordered list of strategies; the first one that produces something wins.
#[derive(Clone, Default)]
pub struct ExtractionChain {
    strategies: Vec<ExtractionStrategy>,
}

impl ExtractionChain {
    pub fn new(strategies: Vec<ExtractionStrategy>) -> Self {
        Self { strategies }
    }

    pub fn push(&mut self, strategy: ExtractionStrategy) {
        self.strategies.push(strategy);
    }

    pub fn strategy_names(&self) -> Vec<String> {
        self.strategies.iter().map(ExtractionStrategy::name).collect()
    }

    pub async fn run(&self, image: &NormalizedImage) -> Result<Extraction, ExtractionError> {
        let mut last_error: Option<ExtractionError> = None;

        for strategy in &self.strategies {
            match strategy.extract(image).await {
                Ok(Extraction::Candidates(candidates)) if candidates.is_empty() => {
                    info!("{} found no books, trying next strategy", strategy.name());
                }
                Ok(extraction) => {
                    debug!("Extraction succeeded with {}", strategy.name());
                    return Ok(extraction);
                }
                Err(e) if e.is_recoverable() => {
                    warn!("{} failed, trying next strategy: {}", strategy.name(), e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(ExtractionError::NothingFound))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::EncodedImage;
    use crate::ocr::OcrBackendType;
    use async_trait::async_trait;

    enum VisionBehavior {
        Books(Vec<RawCandidate>),
        Fail,
        Hang,
    }

    struct FakeVision(VisionBehavior);

    #[async_trait]
    impl VisionBackend for FakeVision {
        fn name(&self) -> &str {
            "fake"
        }
        fn is_available(&self) -> bool {
            true
        }
        fn availability_hint(&self) -> String {
            String::new()
        }
        async fn extract(
            &self,
            _image: &[u8],
            _media_type: &str,
        ) -> Result<Vec<RawCandidate>, VisionError> {
            match &self.0 {
                VisionBehavior::Books(books) => Ok(books.clone()),
                VisionBehavior::Fail => Err(VisionError::MalformedResponse("boom".into())),
                VisionBehavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(Vec::new())
                }
            }
        }
    }

    struct FakeOcr(Result<&'static str, &'static str>);

    #[async_trait]
    impl OcrBackend for FakeOcr {
        fn backend_type(&self) -> OcrBackendType {
            OcrBackendType::Tesseract
        }
        fn is_available(&self) -> bool {
            true
        }
        fn availability_hint(&self) -> String {
            String::new()
        }
        async fn recognize(&self, _image: &[u8], _language: &str) -> Result<String, OcrError> {
            self.0
                .map(str::to_string)
                .map_err(|e| OcrError::OcrFailed(e.to_string()))
        }
    }

    fn image() -> NormalizedImage {
        NormalizedImage {
            vision: EncodedImage {
                bytes: vec![1, 2, 3],
                media_type: "image/png".to_string(),
            },
            raster: vec![4, 5, 6],
            width: 1,
            height: 1,
        }
    }

    fn vision(behavior: VisionBehavior) -> ExtractionStrategy {
        ExtractionStrategy::Vision {
            backend: Arc::new(FakeVision(behavior)),
            timeout: Duration::from_millis(50),
        }
    }

    fn ocr(result: Result<&'static str, &'static str>) -> ExtractionStrategy {
        ExtractionStrategy::Ocr {
            backend: Arc::new(FakeOcr(result)),
            language: "eng".to_string(),
            min_text_chars: 10,
        }
    }

    #[tokio::test]
    async fn test_vision_wins_when_it_finds_books() {
        let books = vec![RawCandidate::new("Dune", "Frank Herbert")];
        let chain = ExtractionChain::new(vec![
            vision(VisionBehavior::Books(books.clone())),
            ocr(Ok("should not be used")),
        ]);
        assert_eq!(
            chain.run(&image()).await.unwrap(),
            Extraction::Candidates(books)
        );
    }

    #[tokio::test]
    async fn test_empty_vision_result_falls_back_to_ocr() {
        let chain = ExtractionChain::new(vec![
            vision(VisionBehavior::Books(Vec::new())),
            ocr(Ok("Dune\nFrank Herbert")),
        ]);
        assert_eq!(
            chain.run(&image()).await.unwrap(),
            Extraction::Text("Dune\nFrank Herbert".to_string())
        );
    }

    #[tokio::test]
    async fn test_vision_error_and_timeout_fall_back_to_ocr() {
        for behavior in [VisionBehavior::Fail, VisionBehavior::Hang] {
            let chain =
                ExtractionChain::new(vec![vision(behavior), ocr(Ok("1984 by George Orwell"))]);
            assert!(matches!(
                chain.run(&image()).await.unwrap(),
                Extraction::Text(_)
            ));
        }
    }

    #[tokio::test]
    async fn test_short_ocr_text_is_unreadable() {
        let chain = ExtractionChain::new(vec![ocr(Ok("  ab \n"))]);
        let err = chain.run(&image()).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Unreadable { chars: 2 }));
    }

    #[tokio::test]
    async fn test_ocr_failure_is_fatal() {
        let chain = ExtractionChain::new(vec![
            vision(VisionBehavior::Fail),
            ocr(Err("engine crashed")),
        ]);
        let err = chain.run(&image()).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Ocr(_)));
    }

    #[tokio::test]
    async fn test_vision_only_chain_reports_last_error() {
        let chain = ExtractionChain::new(vec![vision(VisionBehavior::Fail)]);
        assert!(matches!(
            chain.run(&image()).await.unwrap_err(),
            ExtractionError::Vision(_)
        ));

        let empty = ExtractionChain::default();
        assert!(matches!(
            empty.run(&image()).await.unwrap_err(),
            ExtractionError::NothingFound
        ));
    }
}
