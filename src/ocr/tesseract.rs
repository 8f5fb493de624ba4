//! Tesseract OCR backend implementation.
//!
//! Uses Tesseract OCR via command-line for text extraction.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::debug;

use super::backend::{check_binary, OcrBackend, OcrBackendType, OcrError};
use crate::config::OcrConfig;

/// Tesseract OCR backend.
pub struct TesseractBackend {
    binary: String,
    timeout: Duration,
}

impl TesseractBackend {
    /// Create a new Tesseract backend with default configuration.
    pub fn new() -> Self {
        Self::with_config(&OcrConfig::default())
    }

    /// Create a new Tesseract backend with custom configuration.
    pub fn with_config(config: &OcrConfig) -> Self {
        Self {
            binary: "tesseract".to_string(),
            timeout: config.timeout(),
        }
    }

    /// Use a different executable (e.g., an absolute path).
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Run Tesseract on an image file.
    async fn run_tesseract(&self, image_path: &Path, language: &str) -> Result<String, OcrError> {
        let child = Command::new(&self.binary)
            .arg(image_path)
            .arg("stdout")
            .args(["-l", language])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(OcrError::BackendNotAvailable(
                    "tesseract not found (install tesseract-ocr)".to_string(),
                ))
            }
            Err(e) => return Err(OcrError::Io(e)),
        };

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| OcrError::Timeout(self.timeout))??;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("Error in pixReadMem") || stderr.contains("Unsupported image") {
                Err(OcrError::Decode(stderr.trim().to_string()))
            } else {
                Err(OcrError::OcrFailed(format!("tesseract failed: {}", stderr.trim())))
            }
        }
    }
}

impl Default for TesseractBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OcrBackend for TesseractBackend {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::Tesseract
    }

    fn is_available(&self) -> bool {
        check_binary(&self.binary)
    }

    fn availability_hint(&self) -> String {
        if !check_binary(&self.binary) {
            "Tesseract not installed. Install with: apt install tesseract-ocr".to_string()
        } else {
            "Tesseract is available".to_string()
        }
    }

    async fn recognize(&self, image: &[u8], language: &str) -> Result<String, OcrError> {
        let start = Instant::now();

        let temp_dir = TempDir::new()?;
        let image_path = temp_dir.path().join("page.png");
        tokio::fs::write(&image_path, image).await?;

        let text = self.run_tesseract(&image_path, language).await?;
        debug!(
            "tesseract recognized {} chars in {:?}",
            text.len(),
            start.elapsed()
        );
        Ok(text)
    }
}
