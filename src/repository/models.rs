//! Diesel ORM models for the books table.

use diesel::prelude::*;

use crate::genre::Genre;
use crate::models::BookRecord;
use crate::schema;

use super::parse_datetime;

/// Book row from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::books)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BookRow {
    pub id: String,
    pub owner_key: String,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub image_ref: Option<String>,
    pub title_key: String,
    pub author_key: String,
    pub created_at: String,
}

/// New book for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::books)]
pub struct NewBookRow<'a> {
    pub id: &'a str,
    pub owner_key: &'a str,
    pub title: &'a str,
    pub author: &'a str,
    pub genre: &'a str,
    pub image_ref: Option<&'a str>,
    pub title_key: &'a str,
    pub author_key: &'a str,
    pub created_at: &'a str,
}

impl From<BookRow> for BookRecord {
    fn from(row: BookRow) -> Self {
        BookRecord {
            id: row.id,
            owner_key: row.owner_key,
            title: row.title,
            author: row.author,
            genre: Genre::from_str(&row.genre).unwrap_or_default(),
            image_ref: row.image_ref,
            created_at: parse_datetime(&row.created_at),
        }
    }
}
