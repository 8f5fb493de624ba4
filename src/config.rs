//! Configuration management for shelfscan.
//!
//! Two tiers:
//! - `Config`: the TOML file (`shelfscan.toml`), tuning knobs safe to share.
//! - Device secrets: API keys, read only from the environment
//!   (`ANTHROPIC_API_KEY` or `CLAUDE_API_KEY`, `GOOGLE_BOOKS_API_KEY`) and
//!   never serialized.
//!
//! `Settings` is the resolved runtime view: paths made absolute, env
//! overrides applied.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default database filename.
pub const DEFAULT_DATABASE_FILENAME: &str = "shelfscan.db";

/// Config file name looked up in the working directory.
pub const CONFIG_FILENAME: &str = "shelfscan.toml";

const VISION_API_KEY_VARS: [&str; 2] = ["ANTHROPIC_API_KEY", "CLAUDE_API_KEY"];
const CATALOG_API_KEY_VAR: &str = "GOOGLE_BOOKS_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Image preprocessing applied before OCR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Longest edge after resizing. Smaller images are never upscaled.
    pub max_dimension: u32,
    pub convert_grayscale: bool,
    pub normalize_contrast: bool,
    pub sharpen: bool,
    /// Timeout for the external HEIC/HEIF transcoder.
    pub transcode_timeout_secs: u64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_dimension: 2000,
            convert_grayscale: true,
            normalize_contrast: true,
            sharpen: false,
            transcode_timeout_secs: 60,
        }
    }
}

impl ImageConfig {
    pub fn transcode_timeout(&self) -> Duration {
        Duration::from_secs(self.transcode_timeout_secs)
    }
}

/// Vision model settings. The API key comes from the environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://api.anthropic.com".to_string(),
            model: "claude-3-haiku-20240307".to_string(),
            max_tokens: 1024,
            timeout_secs: 60,
            api_key: VISION_API_KEY_VARS
                .iter()
                .find_map(|var| std::env::var(var).ok())
                .filter(|key| !key.trim().is_empty()),
        }
    }
}

impl VisionConfig {
    /// Vision extraction runs only when enabled and a key is present.
    pub fn is_configured(&self) -> bool {
        self.enabled && self.api_key.is_some()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// OCR settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Tesseract language code (e.g., "eng", "deu").
    pub language: String,
    /// OCR output shorter than this (after trimming) means the photo is unreadable.
    pub min_text_chars: usize,
    pub timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            min_text_chars: 10,
            timeout_secs: 120,
        }
    }
}

impl OcrConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Bibliographic catalog settings. The API key comes from the environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub endpoint: String,
    /// Maximum catalog lookups per file.
    pub max_queries: usize,
    pub timeout_ms: u64,
    /// Minimum spacing between any two catalog calls.
    pub delay_ms: u64,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://www.googleapis.com/books/v1/volumes".to_string(),
            max_queries: 10,
            timeout_ms: 5000,
            delay_ms: 200,
            api_key: std::env::var(CATALOG_API_KEY_VAR)
                .ok()
                .filter(|key| !key.trim().is_empty()),
        }
    }
}

impl CatalogConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data directory path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Database filename (joined with data_dir) or a `sqlite:` URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Number of files processed concurrently.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    pub image: ImageConfig,
    pub vision: VisionConfig,
    pub ocr: OcrConfig,
    pub catalog: CatalogConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from an explicit path, or discover one.
    ///
    /// Discovery order: `./shelfscan.toml`, then
    /// `<config_dir>/shelfscan/config.toml`. No file means defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }

        match Self::discover() {
            Some(path) => Self::load_from_path(&path),
            None => {
                tracing::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    fn discover() -> Option<PathBuf> {
        let candidates = [
            Some(PathBuf::from(CONFIG_FILENAME)),
            dirs::config_dir().map(|d| d.join("shelfscan").join("config.toml")),
        ];
        candidates.into_iter().flatten().find(|p| p.is_file())
    }

    /// Load configuration from a specific TOML file.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("Loaded config from {}", path.display());
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Resolve into runtime settings, applying environment overrides.
    pub fn resolve(&self) -> Settings {
        let base_dir = self
            .source_path
            .as_ref()
            .and_then(|p| p.parent())
            .map(Path::to_path_buf);

        let data_dir = std::env::var("SHELFSCAN_DATA_DIR")
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| self.data_dir.clone())
            .map(|dir| resolve_relative(&dir, base_dir.as_deref()))
            .unwrap_or_else(default_data_dir);

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| {
                self.database
                    .as_ref()
                    .filter(|db| db.starts_with("sqlite:"))
                    .cloned()
            });

        let database_filename = self
            .database
            .clone()
            .filter(|db| !db.starts_with("sqlite:"))
            .unwrap_or_else(|| DEFAULT_DATABASE_FILENAME.to_string());

        let workers = std::env::var("SHELFSCAN_WORKERS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .or(self.workers)
            .unwrap_or(2)
            .max(1);

        Settings {
            data_dir,
            database_filename,
            database_url,
            workers,
            image: self.image.clone(),
            vision: self.vision.clone(),
            ocr: self.ocr.clone(),
            catalog: self.catalog.clone(),
        }
    }
}

fn resolve_relative(path: &str, base: Option<&Path>) -> PathBuf {
    let path = PathBuf::from(path);
    if path.is_absolute() {
        return path;
    }
    match base {
        Some(base) => base.join(path),
        None => std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path),
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shelfscan")
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database filename.
    pub database_filename: String,
    /// Database URL (overrides data_dir/database_filename if set).
    pub database_url: Option<String>,
    /// Files processed concurrently per batch.
    pub workers: usize,
    pub image: ImageConfig,
    pub vision: VisionConfig,
    pub ocr: OcrConfig,
    pub catalog: CatalogConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Config::default().resolve()
    }
}

impl Settings {
    /// Get the database URL, constructing from path if not explicitly set.
    pub fn database_url(&self) -> String {
        match self.database_url {
            Some(ref url) => url.clone(),
            None => format!("sqlite:{}", self.database_path().display()),
        }
    }

    /// Get the full path to the database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    /// Ensure the data directory exists.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
    }
}
