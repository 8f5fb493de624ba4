//! Manual library management: list, add, edit, remove.

use console::style;

use crate::cli::helpers::{genre_counts, open_store, truncate};
use crate::config::Settings;
use crate::genre::Genre;
use crate::models::{BookUpdate, NewBook};
use crate::repository::BookStore;

pub async fn cmd_list(
    settings: &Settings,
    owner: &str,
    genre: Option<Genre>,
    json: bool,
) -> anyhow::Result<()> {
    let store = open_store(settings).await?;
    let books = store.list_by_owner(owner).await?;
    let shown: Vec<_> = books
        .iter()
        .filter(|b| genre.map_or(true, |g| b.genre == g))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&shown)?);
        return Ok(());
    }

    if books.is_empty() {
        println!("{} No books in {}'s library yet", style("!").yellow(), owner);
        return Ok(());
    }

    println!(
        "\n{:<38} {:<40} {:<25} {}",
        style("ID").bold(),
        style("Title").bold(),
        style("Author").bold(),
        style("Genre").bold()
    );
    println!("{}", "-".repeat(118));
    for book in &shown {
        println!(
            "{:<38} {:<40} {:<25} {}",
            book.id,
            truncate(&book.title, 40),
            truncate(&book.author, 25),
            book.genre
        );
    }

    println!("\n{}", style("By genre:").cyan());
    for (genre, count) in genre_counts(&books) {
        println!("  {:<15} {}", genre.as_str(), count);
    }
    println!("  {:<15} {}", "Total", books.len());

    Ok(())
}

pub async fn cmd_add(
    settings: &Settings,
    owner: &str,
    title: &str,
    author: &str,
    genre: Genre,
) -> anyhow::Result<()> {
    if title.trim().is_empty() {
        anyhow::bail!("Title must not be empty");
    }

    let store = open_store(settings).await?;
    let record = store.insert(NewBook::new(owner, title, author, genre)).await?;
    println!(
        "{} Added {} by {} [{}] ({})",
        style("✓").green(),
        record.title,
        record.author,
        record.genre,
        record.id
    );
    Ok(())
}

pub async fn cmd_edit(
    settings: &Settings,
    id: &str,
    owner: &str,
    title: Option<String>,
    author: Option<String>,
    genre: Option<Genre>,
) -> anyhow::Result<()> {
    let update = BookUpdate {
        title,
        author,
        genre,
    };
    if update.is_empty() {
        anyhow::bail!("Nothing to change: pass --title, --author or --genre");
    }

    let store = open_store(settings).await?;
    let record = store.update(id, owner, update).await?;
    println!(
        "{} Updated {}: {} by {} [{}]",
        style("✓").green(),
        record.id,
        record.title,
        record.author,
        record.genre
    );
    Ok(())
}

pub async fn cmd_remove(settings: &Settings, id: &str, owner: &str) -> anyhow::Result<()> {
    let store = open_store(settings).await?;
    store.delete(id, owner).await?;
    println!("{} Removed {}", style("✓").green(), id);
    Ok(())
}
