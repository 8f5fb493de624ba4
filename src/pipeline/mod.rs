//! Batch processing pipeline.
//!
//! file → normalize → extract (vision, else OCR + parse) → enrich →
//! classify → find-or-create in the store. Each file runs to its own
//! terminal state; the batch result lists every outcome in input order.

mod error;
mod orchestrator;
mod types;

pub use error::{FileError, PipelineError};
pub use orchestrator::{BatchPipeline, DEFAULT_WORKERS};
pub use types::{BatchEvent, BatchFileError, BatchResult, FileOutcome, FileStage, UploadedImage};
