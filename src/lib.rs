//! shelfscan - turn bookshelf photos into a personal library.
//!
//! Photos are normalized, read by a vision model (falling back to OCR and a
//! line parser), enriched against a book catalog, classified by genre and
//! stored per owner with case-insensitive deduplication.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod extraction;
pub mod genre;
pub mod imaging;
pub mod models;
pub mod ocr;
pub mod pipeline;
pub mod rate_limit;
pub mod repository;
pub mod schema;
pub mod vision;
