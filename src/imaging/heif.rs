//! HEIC/HEIF transcoding via external tools.
//!
//! The `image` crate cannot decode HEIF, so phone photos are converted to
//! JPEG by whichever of `heif-convert`, `magick` or `convert` is installed.

use std::process::Stdio;
use std::time::Duration;

use tempfile::TempDir;
use tokio::process::Command;
use tracing::debug;

use super::ImageError;
use crate::ocr::check_binary;

/// Transcoders in order of preference. All take `<input> <output>`.
pub const HEIF_TOOLS: [&str; 3] = ["heif-convert", "magick", "convert"];

/// Whether an upload is HEIC/HEIF.
///
/// The content decides when it can be identified; the declared extension is
/// only consulted for bytes neither `infer` nor `image` recognise.
pub fn is_heif(bytes: &[u8], extension: Option<&str>) -> bool {
    if infer::image::is_heif(bytes) {
        return true;
    }
    if image::guess_format(bytes).is_ok() {
        return false;
    }
    extension
        .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
        .is_some_and(|ext| ext == "heic" || ext == "heif")
}

/// Converts HEIF images to JPEG.
#[derive(Debug, Clone)]
pub struct HeifTranscoder {
    timeout: Duration,
}

impl HeifTranscoder {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// First installed transcoder, if any.
    pub fn available_tool() -> Option<&'static str> {
        HEIF_TOOLS.iter().copied().find(|tool| check_binary(tool))
    }

    pub async fn transcode(&self, bytes: &[u8]) -> Result<Vec<u8>, ImageError> {
        let tool = Self::available_tool().ok_or_else(|| {
            ImageError::Transcode(
                "no HEIF converter found (install libheif-examples or imagemagick)".to_string(),
            )
        })?;

        let temp_dir = TempDir::new()?;
        let input = temp_dir.path().join("input.heic");
        let output = temp_dir.path().join("output.jpg");
        tokio::fs::write(&input, bytes).await?;

        debug!("Transcoding HEIF image with {}", tool);
        let child = Command::new(tool)
            .arg(&input)
            .arg(&output)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let result = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                ImageError::Transcode(format!("{} timed out after {:?}", tool, self.timeout))
            })??;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(ImageError::Transcode(format!(
                "{} failed: {}",
                tool,
                stderr.trim()
            )));
        }

        Ok(tokio::fs::read(&output).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_heif_by_extension() {
        assert!(is_heif(b"", Some("HEIC")));
        assert!(is_heif(b"", Some(".heif")));
        assert!(!is_heif(b"", Some("jpg")));
        assert!(!is_heif(b"", None));
    }

    #[test]
    fn test_decodable_content_wins_over_extension() {
        let png = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR";
        assert!(!is_heif(png, Some("HEIC")));
        assert!(!is_heif(&[0xFF, 0xD8, 0xFF, 0xE0], Some("heif")));
    }

    #[test]
    fn test_is_heif_by_signature() {
        // ISO-BMFF ftyp box with the heic brand.
        let mut bytes = vec![0x00, 0x00, 0x00, 0x18];
        bytes.extend_from_slice(b"ftypheic");
        bytes.extend_from_slice(&[0x00; 12]);
        assert!(is_heif(&bytes, None));
    }
}
