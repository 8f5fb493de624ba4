//! Pipeline error types.
//!
//! [`FileError`] ends one file's run and is recorded in its outcome;
//! [`PipelineError`] aborts the whole batch.

use thiserror::Error;

use crate::extraction::ExtractionError;
use crate::imaging::ImageError;
use crate::repository::StoreError;

/// Why a single file produced no books.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("Could not process image: {0}")]
    ImageDecode(String),

    #[error("Could not extract readable text from image. Try a clearer photo with better lighting.")]
    UnreadableContent,

    #[error("No books could be identified in the image. Make sure book spines are clearly visible.")]
    NoCandidates,

    #[error("Text recognition failed: {0}")]
    Ocr(String),

    #[error("Vision extraction failed: {0}")]
    Vision(String),
}

impl From<ImageError> for FileError {
    fn from(e: ImageError) -> Self {
        FileError::ImageDecode(e.to_string())
    }
}

impl From<ExtractionError> for FileError {
    fn from(e: ExtractionError) -> Self {
        match e {
            ExtractionError::Vision(e) => FileError::Vision(e.to_string()),
            ExtractionError::Ocr(e) => FileError::Ocr(e.to_string()),
            ExtractionError::Unreadable { .. } => FileError::UnreadableContent,
            ExtractionError::NothingFound => FileError::NoCandidates,
        }
    }
}

/// Errors that abort a batch.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Record store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("Pipeline setup failed: {0}")]
    Setup(String),
}
