//! Image normalization ahead of extraction.
//!
//! Every upload is turned into two encodings:
//! - a vision payload: the original bytes when the vision service accepts
//!   the format, otherwise a plain PNG re-encode (no preprocessing)
//! - an OCR raster: resized, grayscale, contrast-stretched PNG

mod heif;

pub use heif::{is_heif, HeifTranscoder, HEIF_TOOLS};

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};
use thiserror::Error;
use tracing::debug;

use crate::config::ImageConfig;
use crate::vision::SUPPORTED_MEDIA_TYPES;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Could not decode image: {0}")]
    Decode(String),

    #[error("HEIF transcoding failed: {0}")]
    Transcode(String),

    #[error("Could not encode image: {0}")]
    Encode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Encoded image bytes with their media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub media_type: String,
}

/// Output of [`ImageNormalizer::normalize`].
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    /// What the vision service receives.
    pub vision: EncodedImage,
    /// Preprocessed PNG for OCR.
    pub raster: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Decodes uploads and prepares them for both extraction strategies.
#[derive(Debug, Clone)]
pub struct ImageNormalizer {
    config: ImageConfig,
    transcoder: HeifTranscoder,
}

impl ImageNormalizer {
    pub fn new(config: ImageConfig) -> Self {
        let transcoder = HeifTranscoder::new(config.transcode_timeout());
        Self { config, transcoder }
    }

    /// Normalize raw upload bytes. `extension` is the declared file extension.
    pub async fn normalize(
        &self,
        bytes: &[u8],
        extension: Option<&str>,
    ) -> Result<NormalizedImage, ImageError> {
        let bytes = if is_heif(bytes, extension) {
            debug!("HEIF upload detected ({} bytes)", bytes.len());
            self.transcoder.transcode(bytes).await?
        } else {
            bytes.to_vec()
        };

        let config = self.config.clone();
        tokio::task::spawn_blocking(move || prepare(bytes, &config))
            .await
            .map_err(|e| ImageError::Decode(format!("image task failed: {}", e)))?
    }
}

fn prepare(bytes: Vec<u8>, config: &ImageConfig) -> Result<NormalizedImage, ImageError> {
    let format = image::guess_format(&bytes).ok();
    let decoded = image::load_from_memory(&bytes).map_err(|e| ImageError::Decode(e.to_string()))?;

    let media_type = format.map(|f| f.to_mime_type());
    let vision = match media_type {
        Some(media_type) if SUPPORTED_MEDIA_TYPES.contains(&media_type) => EncodedImage {
            bytes,
            media_type: media_type.to_string(),
        },
        _ => EncodedImage {
            bytes: encode_png(&DynamicImage::ImageRgba8(decoded.to_rgba8()))?,
            media_type: "image/png".to_string(),
        },
    };

    let processed = preprocess(decoded, config);
    let (width, height) = processed.dimensions();
    let raster = encode_png(&processed)?;

    Ok(NormalizedImage {
        vision,
        raster,
        width,
        height,
    })
}

/// Apply the configured OCR preprocessing steps.
pub fn preprocess(img: DynamicImage, config: &ImageConfig) -> DynamicImage {
    let mut img = img;

    let (width, height) = img.dimensions();
    if config.max_dimension > 0 && width.max(height) > config.max_dimension {
        img = img.resize(
            config.max_dimension,
            config.max_dimension,
            FilterType::Lanczos3,
        );
    }

    if config.convert_grayscale {
        img = DynamicImage::ImageLuma8(img.to_luma8());
    }

    if config.normalize_contrast {
        img = stretch_contrast(img);
    }

    if config.sharpen {
        img = img.unsharpen(1.0, 1);
    }

    match img {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => img,
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

/// Linearly remap intensities so the darkest luma becomes 0 and the brightest 255.
fn stretch_contrast(img: DynamicImage) -> DynamicImage {
    let luma = img.to_luma8();
    let (min, max) = luma
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));
    if max <= min {
        return img;
    }

    let scale = 255.0 / f32::from(max - min);
    let remap = |v: u8| (f32::from(v.saturating_sub(min)) * scale).round().min(255.0) as u8;

    match img {
        DynamicImage::ImageLuma8(mut buf) => {
            for p in buf.pixels_mut() {
                p[0] = remap(p[0]);
            }
            DynamicImage::ImageLuma8(buf)
        }
        other => {
            let mut buf = other.to_rgb8();
            for p in buf.pixels_mut() {
                for channel in p.0.iter_mut() {
                    *channel = remap(*channel);
                }
            }
            DynamicImage::ImageRgb8(buf)
        }
    }
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, ImageError> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .map_err(|e| ImageError::Encode(e.to_string()))?;
    Ok(out.into_inner())
}
