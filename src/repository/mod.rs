//! Repository layer for database persistence.
//!
//! All database access uses Diesel ORM over SQLite with compile-time query
//! checking.

pub mod book;
pub mod migrations;
pub mod models;
pub mod pool;

use chrono::{DateTime, Utc};

pub use book::{BookStore, DieselBookRepository, FindOrCreate, StoreError};
pub use pool::{AsyncSqlitePool, DieselError};

/// Parse a datetime string from the database.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}
