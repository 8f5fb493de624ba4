//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod books;
mod check;
mod scan;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::genre::Genre;

#[derive(Parser)]
#[command(name = "shelfscan")]
#[command(about = "Turn bookshelf photos into a deduplicated, genre-classified library")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database URL or file (overrides config file)
    #[arg(long, global = true, env = "DATABASE_URL")]
    database: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Extract books from shelf photos and add them to a library
    Scan {
        /// Library owner key
        #[arg(short, long)]
        owner: String,
        /// Image files to process
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Number of images processed at once (default: from config, else 2)
        #[arg(short, long)]
        workers: Option<usize>,
        /// Skip vision extraction and use OCR only
        #[arg(long)]
        no_vision: bool,
        /// Output the batch result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List books in a library
    List {
        /// Library owner key
        #[arg(short, long)]
        owner: String,
        /// Only show books of this genre
        #[arg(short, long, value_enum)]
        genre: Option<Genre>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a book by hand
    Add {
        /// Library owner key
        #[arg(short, long)]
        owner: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        author: String,
        #[arg(short, long, value_enum, default_value = "uncategorized")]
        genre: Genre,
    },

    /// Edit a book's title, author or genre
    Edit {
        /// Book ID
        id: String,
        /// Library owner key
        #[arg(short, long)]
        owner: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(short, long, value_enum)]
        genre: Option<Genre>,
    },

    /// Remove a book
    Remove {
        /// Book ID
        id: String,
        /// Library owner key
        #[arg(short, long)]
        owner: String,
    },

    /// Check if OCR, transcoding tools and API keys are available
    Check,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    let mut settings = config.resolve();
    if let Some(database) = cli.database {
        settings.database_url = Some(database);
    }

    match cli.command {
        Commands::Scan {
            owner,
            files,
            workers,
            no_vision,
            json,
        } => {
            if let Some(workers) = workers {
                settings.workers = workers.max(1);
            }
            if no_vision {
                settings.vision.enabled = false;
            }
            scan::cmd_scan(&settings, &owner, &files, json).await
        }
        Commands::List { owner, genre, json } => {
            books::cmd_list(&settings, &owner, genre, json).await
        }
        Commands::Add {
            owner,
            title,
            author,
            genre,
        } => books::cmd_add(&settings, &owner, &title, &author, genre).await,
        Commands::Edit {
            id,
            owner,
            title,
            author,
            genre,
        } => books::cmd_edit(&settings, &id, &owner, title, author, genre).await,
        Commands::Remove { id, owner } => books::cmd_remove(&settings, &id, &owner).await,
        Commands::Check => check::cmd_check(&settings).await,
    }
}
