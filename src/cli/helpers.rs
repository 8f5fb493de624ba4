//! Shared helper functions for CLI commands.

use std::path::PathBuf;

use console::style;
use tracing::warn;

use crate::config::Settings;
use crate::genre::Genre;
use crate::models::BookRecord;
use crate::pipeline::UploadedImage;
use crate::repository::DieselBookRepository;

/// Open the configured library database, creating it if needed.
pub async fn open_store(settings: &Settings) -> anyhow::Result<DieselBookRepository> {
    settings.ensure_directories()?;
    Ok(DieselBookRepository::open(&settings.database_url()).await?)
}

/// Read image files from disk. Unreadable paths are reported and skipped.
pub fn read_uploads(paths: &[PathBuf]) -> Vec<UploadedImage> {
    let mut uploads = Vec::with_capacity(paths.len());
    for path in paths {
        match std::fs::read(path) {
            Ok(bytes) => {
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                let image_ref = std::fs::canonicalize(path)
                    .unwrap_or_else(|_| path.clone())
                    .display()
                    .to_string();
                uploads.push(UploadedImage::new(file_name, bytes).with_image_ref(image_ref));
            }
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                eprintln!(
                    "{} Skipping {}: {}",
                    style("!").yellow(),
                    path.display(),
                    e
                );
            }
        }
    }
    uploads
}

/// Count books per genre, in display order, including empty genres.
pub fn genre_counts(books: &[BookRecord]) -> Vec<(Genre, usize)> {
    Genre::ALL
        .iter()
        .map(|genre| (*genre, books.iter().filter(|b| b.genre == *genre).count()))
        .collect()
}

/// Truncate a string for table display.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
