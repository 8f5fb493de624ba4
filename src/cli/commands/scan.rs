//! Scan shelf photos into a library.

use std::path::PathBuf;
use std::sync::Arc;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use crate::cli::helpers::{open_store, read_uploads, truncate};
use crate::config::Settings;
use crate::pipeline::{BatchEvent, BatchPipeline, BatchResult, FileStage};

pub async fn cmd_scan(
    settings: &Settings,
    owner: &str,
    files: &[PathBuf],
    json: bool,
) -> anyhow::Result<()> {
    let uploads = read_uploads(files);
    if uploads.is_empty() {
        anyhow::bail!("No readable image files given");
    }

    let store = open_store(settings).await?;
    let pipeline = BatchPipeline::from_settings(settings, Arc::new(store))?;

    if json {
        let result = pipeline.process_batch(owner, uploads).await?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!(
        "{} Scanning {} image(s) using {}",
        style("→").cyan(),
        uploads.len(),
        pipeline.extraction().strategy_names().join(", ")
    );

    let (event_tx, mut event_rx) = mpsc::channel::<BatchEvent>(100);

    let event_handler = tokio::spawn(async move {
        let mut pb: Option<ProgressBar> = None;
        while let Some(event) = event_rx.recv().await {
            match event {
                BatchEvent::BatchStarted { total_files } => {
                    let progress = ProgressBar::new(total_files as u64);
                    if let Ok(bar_style) = ProgressStyle::default_bar()
                        .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
                    {
                        progress.set_style(bar_style.progress_chars("█▓░"));
                    }
                    progress.set_message("Reading shelves...");
                    pb = Some(progress);
                }
                BatchEvent::StageChanged { file_name, stage } => {
                    if let Some(ref progress) = pb {
                        if !stage.is_terminal() {
                            progress.set_message(format!("{} ({})", truncate(&file_name, 30), stage));
                        }
                    }
                }
                BatchEvent::BookAdded { record, .. } => {
                    if let Some(ref progress) = pb {
                        progress.println(format!(
                            "  {} {} by {} [{}]",
                            style("+").green(),
                            record.title,
                            record.author,
                            record.genre
                        ));
                    }
                }
                BatchEvent::DuplicateSkipped { title, author, .. } => {
                    if let Some(ref progress) = pb {
                        progress.println(format!(
                            "  {} {} by {} (already in library)",
                            style("=").dim(),
                            title,
                            author
                        ));
                    }
                }
                BatchEvent::FileFinished {
                    file_name, error, ..
                } => {
                    if let Some(ref progress) = pb {
                        if let Some(error) = error {
                            progress.println(format!(
                                "{} {}: {}",
                                style("✗").red(),
                                file_name,
                                error
                            ));
                        }
                        progress.inc(1);
                    }
                }
                BatchEvent::BatchFinished { .. } => {
                    if let Some(progress) = pb.take() {
                        progress.finish_and_clear();
                    }
                }
            }
        }
    });

    let result = pipeline
        .process_batch_with_events(owner, uploads, Some(&event_tx))
        .await;
    drop(event_tx);
    let _ = event_handler.await;

    print_result(&result?);
    Ok(())
}

fn print_result(result: &BatchResult) {
    let marker = if result.errors.is_empty() {
        style("✓").green()
    } else {
        style("!").yellow()
    };
    println!("{} {}", marker, result.summary());

    let duplicates: usize = result.outcomes.iter().map(|o| o.duplicates).sum();
    if duplicates > 0 {
        println!(
            "  {} {} book(s) were already in the library",
            style("→").dim(),
            duplicates
        );
    }

    for outcome in &result.outcomes {
        if outcome.stage() == FileStage::Failed {
            if let Some(ref error) = outcome.error {
                println!("  {} {}: {}", style("✗").red(), outcome.file_name, error);
            }
        }
    }
}
