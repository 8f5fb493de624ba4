//! Environment check: external tools and API keys.

use console::style;

use crate::config::Settings;
use crate::imaging::HEIF_TOOLS;
use crate::ocr::{check_binary, OcrBackend, TesseractBackend};
use crate::vision::{ClaudeVisionBackend, VisionBackend};

/// Report which extraction tools and services are usable.
pub async fn cmd_check(settings: &Settings) -> anyhow::Result<()> {
    println!("\n{}", style("Extraction Status").bold());
    println!("{}", "-".repeat(50));

    println!("\n{}", style("OCR:").cyan());
    let tesseract = TesseractBackend::with_config(&settings.ocr);
    let tesseract_status = if tesseract.is_available() {
        style("✓ available").green()
    } else {
        style("✗ not available").red()
    };
    println!("  {:<15} {}", "Tesseract", tesseract_status);
    if !tesseract.is_available() {
        println!("  {:<15} {}", "", style(tesseract.availability_hint()).dim());
    }
    println!(
        "  {:<15} {}",
        "Language",
        style(&settings.ocr.language).dim()
    );

    println!("\n{}", style("HEIC/HEIF Transcoding:").cyan());
    for tool in HEIF_TOOLS {
        let status = if check_binary(tool) {
            style("✓ found").green()
        } else {
            style("✗ not found").red()
        };
        println!("  {:<15} {}", tool, status);
    }

    println!("\n{}", style("Services:").cyan());
    let vision = ClaudeVisionBackend::new(&settings.vision)?;
    let vision_status = if !settings.vision.enabled {
        style("○ disabled").yellow()
    } else if vision.is_available() {
        style("✓ configured").green()
    } else {
        style("✗ no API key").red()
    };
    println!("  {:<15} {}", "Claude vision", vision_status);
    if settings.vision.enabled && !vision.is_available() {
        println!("  {:<15} {}", "", style(vision.availability_hint()).dim());
    }

    let catalog_status = if settings.catalog.api_key.is_some() {
        style("✓ API key set").green()
    } else {
        style("○ anonymous quota").yellow()
    };
    println!("  {:<15} {}", "Google Books", catalog_status);

    println!("\n{}", style("Library:").cyan());
    println!("  {:<15} {}", "Database", settings.database_url());
    println!("  {:<15} {}", "Workers", settings.workers);

    if !tesseract.is_available() && !settings.vision.is_configured() {
        println!(
            "\n{} No extraction method is available; scans will fail.",
            style("!").yellow()
        );
    }

    Ok(())
}
