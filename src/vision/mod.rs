//! Vision extraction: ask a multimodal model to read book spines directly.
//!
//! The model is told to answer with a bare JSON array of `{title, author}`
//! objects, but replies are treated as untrusted text: the first valid JSON
//! array anywhere in the reply is used and anything unparseable counts as
//! "no books found" so the caller can fall back to OCR.

mod claude;
mod json;

pub use claude::ClaudeVisionBackend;
pub use json::{candidates_from_text, first_json_array};

use async_trait::async_trait;
use thiserror::Error;

use crate::models::RawCandidate;

/// Instruction sent alongside every shelf photo.
pub const EXTRACTION_PROMPT: &str = "Look at this photo of a bookshelf and identify every book whose spine or cover you can read. \
Return ONLY a JSON array, with no other text, where each element is an object of the form \
{\"title\": \"...\", \"author\": \"...\"}. \
If the author is not legible, use \"Unknown Author\". \
Include only books you can identify with confidence.";

/// Media types the vision service accepts as-is.
pub const SUPPORTED_MEDIA_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Errors from a vision service.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Vision backend not configured: {0}")]
    NotConfigured(String),

    #[error("Vision service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Vision service rate limited (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Malformed vision response: {0}")]
    MalformedResponse(String),
}

/// A service that reads book candidates straight from an image.
#[async_trait]
pub trait VisionBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Whether the backend has what it needs (API key, etc.) to run.
    fn is_available(&self) -> bool;

    /// Human-readable explanation of what is missing, if anything.
    fn availability_hint(&self) -> String;

    /// Extract candidates from encoded image bytes of the given media type.
    async fn extract(
        &self,
        image: &[u8],
        media_type: &str,
    ) -> Result<Vec<RawCandidate>, VisionError>;
}
