//! Raster OCR over preprocessed shelf photos.
//!
//! Tesseract is the only backend; it runs as a child process with a timeout
//! so a stuck recognition cannot hold up the batch.

mod backend;
mod tesseract;

pub use backend::{check_binary, OcrBackend, OcrBackendType, OcrError};
pub use tesseract::TesseractBackend;
