//! Batch orchestration: one pipeline run per file, failures kept per file.

use std::sync::Arc;

use futures::{StreamExt, TryStreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::error::{FileError, PipelineError};
use super::types::{BatchEvent, BatchResult, FileOutcome, FileStage, UploadedImage};
use crate::catalog::{Enricher, GoogleBooksClient};
use crate::config::Settings;
use crate::extraction::{parse_candidates, Extraction, ExtractionChain, ExtractionStrategy};
use crate::genre::classify;
use crate::imaging::ImageNormalizer;
use crate::models::NewBook;
use crate::ocr::TesseractBackend;
use crate::repository::{BookStore, FindOrCreate, StoreError};
use crate::vision::ClaudeVisionBackend;

/// Default number of files processed at once.
pub const DEFAULT_WORKERS: usize = 2;

/// Why a file run stopped early.
enum FileFailure {
    File(FileError),
    Store(StoreError),
}

impl From<FileError> for FileFailure {
    fn from(e: FileError) -> Self {
        FileFailure::File(e)
    }
}

impl From<StoreError> for FileFailure {
    fn from(e: StoreError) -> Self {
        FileFailure::Store(e)
    }
}

/// Turns uploaded shelf photos into stored, deduplicated, classified books.
#[derive(Clone)]
pub struct BatchPipeline {
    normalizer: ImageNormalizer,
    extraction: ExtractionChain,
    enricher: Enricher,
    store: Arc<dyn BookStore>,
    workers: usize,
}

impl BatchPipeline {
    pub fn new(
        normalizer: ImageNormalizer,
        extraction: ExtractionChain,
        enricher: Enricher,
        store: Arc<dyn BookStore>,
    ) -> Self {
        Self {
            normalizer,
            extraction,
            enricher,
            store,
            workers: DEFAULT_WORKERS,
        }
    }

    /// Build the production pipeline: Claude vision (when configured), then
    /// Tesseract, with Google Books enrichment.
    pub fn from_settings(
        settings: &Settings,
        store: Arc<dyn BookStore>,
    ) -> Result<Self, PipelineError> {
        let mut extraction = ExtractionChain::default();

        if settings.vision.is_configured() {
            let backend = ClaudeVisionBackend::new(&settings.vision)
                .map_err(|e| PipelineError::Setup(e.to_string()))?;
            extraction.push(ExtractionStrategy::Vision {
                backend: Arc::new(backend),
                timeout: settings.vision.timeout(),
            });
        } else {
            debug!("Vision extraction disabled or no API key; using OCR only");
        }

        extraction.push(ExtractionStrategy::Ocr {
            backend: Arc::new(TesseractBackend::with_config(&settings.ocr)),
            language: settings.ocr.language.clone(),
            min_text_chars: settings.ocr.min_text_chars,
        });

        let catalog = GoogleBooksClient::new(&settings.catalog)
            .map_err(|e| PipelineError::Setup(e.to_string()))?;
        let enricher = Enricher::new(Arc::new(catalog), &settings.catalog);

        Ok(Self::new(
            ImageNormalizer::new(settings.image.clone()),
            extraction,
            enricher,
            store,
        )
        .with_workers(settings.workers))
    }

    /// Set how many files are processed concurrently (at least one).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn extraction(&self) -> &ExtractionChain {
        &self.extraction
    }

    /// Process a batch of uploads for one owner.
    pub async fn process_batch(
        &self,
        owner_key: &str,
        files: Vec<UploadedImage>,
    ) -> Result<BatchResult, PipelineError> {
        self.process_batch_with_events(owner_key, files, None).await
    }

    /// Process a batch, reporting progress on `events`.
    ///
    /// Per-file failures are recorded in the result; only a store failure
    /// aborts the batch.
    pub async fn process_batch_with_events(
        &self,
        owner_key: &str,
        files: Vec<UploadedImage>,
        events: Option<&mpsc::Sender<BatchEvent>>,
    ) -> Result<BatchResult, PipelineError> {
        let total_files = files.len();
        info!(
            "Processing {} image(s) for {} with {} worker(s)",
            total_files, owner_key, self.workers
        );
        emit(events, BatchEvent::BatchStarted { total_files }).await;
        for file in &files {
            stage(events, &file.file_name, FileStage::Pending).await;
        }

        let outcomes: Vec<FileOutcome> = futures::stream::iter(files)
            .map(|file| self.process_file(owner_key, file, events))
            .buffered(self.workers)
            .try_collect()
            .await?;

        let result = BatchResult::from_outcomes(outcomes);
        info!("{} ({} failed)", result.summary(), result.errors.len());
        emit(
            events,
            BatchEvent::BatchFinished {
                processed_files: result.processed_files,
                total_added: result.total_added,
                failed_files: result.errors.len(),
            },
        )
        .await;

        Ok(result)
    }

    async fn process_file(
        &self,
        owner_key: &str,
        file: UploadedImage,
        events: Option<&mpsc::Sender<BatchEvent>>,
    ) -> Result<FileOutcome, PipelineError> {
        let mut outcome = FileOutcome::new(&file.file_name);

        match self.run_file(owner_key, &file, events, &mut outcome).await {
            Ok(()) => {}
            Err(FileFailure::File(e)) => {
                warn!("{}: {}", file.file_name, e);
                outcome.error = Some(e.to_string());
            }
            Err(FileFailure::Store(e)) => return Err(PipelineError::Store(e)),
        }

        stage(events, &file.file_name, outcome.stage()).await;
        emit(
            events,
            BatchEvent::FileFinished {
                file_name: file.file_name.clone(),
                added: outcome.added.len(),
                error: outcome.error.clone(),
            },
        )
        .await;

        Ok(outcome)
    }

    async fn run_file(
        &self,
        owner_key: &str,
        file: &UploadedImage,
        events: Option<&mpsc::Sender<BatchEvent>>,
        outcome: &mut FileOutcome,
    ) -> Result<(), FileFailure> {
        let name = file.file_name.as_str();

        stage(events, name, FileStage::Normalizing).await;
        let image = self
            .normalizer
            .normalize(&file.bytes, file.extension())
            .await
            .map_err(FileError::from)?;

        stage(events, name, FileStage::Extracting).await;
        let candidates = match self.extraction.run(&image).await.map_err(FileError::from)? {
            Extraction::Candidates(candidates) => candidates,
            Extraction::Text(text) => {
                stage(events, name, FileStage::Parsing).await;
                parse_candidates(&text)
            }
        };
        if candidates.is_empty() {
            return Err(FileError::NoCandidates.into());
        }
        debug!("{}: {} candidate(s)", name, candidates.len());

        stage(events, name, FileStage::Enriching).await;
        let enriched = self.enricher.enrich(candidates).await;
        if enriched.is_empty() {
            return Err(FileError::NoCandidates.into());
        }

        stage(events, name, FileStage::Classifying).await;
        for candidate in enriched {
            let genre = classify(&candidate.categories);
            let book = NewBook::new(owner_key, candidate.title, candidate.author, genre)
                .with_image_ref(file.image_ref.clone());

            match self.store.find_or_create(book).await? {
                FindOrCreate::Created(record) => {
                    debug!("{}: added '{}' ({})", name, record.title, record.genre);
                    emit(
                        events,
                        BatchEvent::BookAdded {
                            file_name: name.to_string(),
                            record: record.clone(),
                        },
                    )
                    .await;
                    outcome.added.push(record);
                }
                FindOrCreate::Existing(record) => {
                    debug!("{}: '{}' already in library", name, record.title);
                    outcome.duplicates += 1;
                    emit(
                        events,
                        BatchEvent::DuplicateSkipped {
                            file_name: name.to_string(),
                            title: record.title,
                            author: record.author,
                        },
                    )
                    .await;
                }
            }
        }

        Ok(())
    }
}

async fn emit(events: Option<&mpsc::Sender<BatchEvent>>, event: BatchEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event).await;
    }
}

async fn stage(events: Option<&mpsc::Sender<BatchEvent>>, file_name: &str, stage: FileStage) {
    debug!("{}: {}", file_name, stage);
    emit(
        events,
        BatchEvent::StageChanged {
            file_name: file_name.to_string(),
            stage,
        },
    )
    .await;
}
