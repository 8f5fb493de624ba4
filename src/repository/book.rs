//! Book store: the record store contract and its Diesel/SQLite implementation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use diesel_async::RunQueryDsl;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use super::models::{BookRow, NewBookRow};
use super::pool::{AsyncSqlitePool, DieselError};
use crate::models::{dedup_key, BookRecord, BookUpdate, NewBook, UNKNOWN_AUTHOR};
use crate::schema::books;

/// Errors from the record store. Fatal to a batch.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DieselError),

    #[error("Book {id} not found")]
    NotFound { id: String },

    #[error("Book already exists in your library: {title} by {author}")]
    Duplicate { title: String, author: String },
}

/// Result of [`BookStore::find_or_create`].
#[derive(Debug, Clone, PartialEq)]
pub enum FindOrCreate {
    Created(BookRecord),
    Existing(BookRecord),
}

impl FindOrCreate {
    pub fn record(&self) -> &BookRecord {
        match self {
            FindOrCreate::Created(record) | FindOrCreate::Existing(record) => record,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, FindOrCreate::Created(_))
    }
}

/// Persistent book records, partitioned by owner key.
///
/// Identity within an owner is the case-insensitive (title, author) pair.
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn find_duplicate(
        &self,
        owner_key: &str,
        title: &str,
        author: &str,
    ) -> Result<Option<BookRecord>, StoreError>;

    /// Insert a book, failing with [`StoreError::Duplicate`] if it already exists.
    async fn insert(&self, book: NewBook) -> Result<BookRecord, StoreError>;

    /// Atomically return the existing record for this identity or create it.
    async fn find_or_create(&self, book: NewBook) -> Result<FindOrCreate, StoreError>;

    async fn get(&self, id: &str, owner_key: &str) -> Result<Option<BookRecord>, StoreError>;

    /// All of an owner's books, newest first.
    async fn list_by_owner(&self, owner_key: &str) -> Result<Vec<BookRecord>, StoreError>;

    async fn update(
        &self,
        id: &str,
        owner_key: &str,
        update: BookUpdate,
    ) -> Result<BookRecord, StoreError>;

    async fn delete(&self, id: &str, owner_key: &str) -> Result<(), StoreError>;
}

/// SQLite-backed [`BookStore`].
///
/// Writes are serialized through an in-process lock; the unique index on
/// `(owner_key, title_key, author_key)` guards against other processes.
#[derive(Clone)]
pub struct DieselBookRepository {
    pool: AsyncSqlitePool,
    write_lock: Arc<Mutex<()>>,
}

impl DieselBookRepository {
    /// Create a new Diesel book repository with an existing pool.
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Open the database at `database_url`, applying the schema.
    pub async fn open(database_url: &str) -> Result<Self, StoreError> {
        let pool = AsyncSqlitePool::new(database_url);
        super::migrations::run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }

    async fn find_by_keys(
        &self,
        owner_key: &str,
        title_key: &str,
        author_key: &str,
    ) -> Result<Option<BookRecord>, StoreError> {
        let mut conn = self.pool.get().await?;

        let row = books::table
            .filter(books::owner_key.eq(owner_key))
            .filter(books::title_key.eq(title_key))
            .filter(books::author_key.eq(author_key))
            .select(BookRow::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        Ok(row.map(BookRecord::from))
    }

    /// Insert without checking for duplicates. Returns `None` if the row was ignored.
    async fn insert_or_ignore(&self, book: &NewBook) -> Result<Option<BookRecord>, StoreError> {
        let mut conn = self.pool.get().await?;

        let id = uuid::Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let created_at_str = created_at.to_rfc3339_opts(SecondsFormat::Micros, true);
        let title_key = dedup_key(&book.title);
        let author_key = dedup_key(&book.author);

        let row = NewBookRow {
            id: &id,
            owner_key: &book.owner_key,
            title: &book.title,
            author: &book.author,
            genre: book.genre.as_str(),
            image_ref: book.image_ref.as_deref(),
            title_key: &title_key,
            author_key: &author_key,
            created_at: &created_at_str,
        };

        let rows = diesel::insert_or_ignore_into(books::table)
            .values(&row)
            .execute(&mut conn)
            .await?;

        if rows == 0 {
            return Ok(None);
        }

        Ok(Some(BookRecord {
            id,
            owner_key: book.owner_key.clone(),
            title: book.title.clone(),
            author: book.author.clone(),
            genre: book.genre,
            image_ref: book.image_ref.clone(),
            created_at: super::parse_datetime(&created_at_str),
        }))
    }
}

#[async_trait]
impl BookStore for DieselBookRepository {
    async fn find_duplicate(
        &self,
        owner_key: &str,
        title: &str,
        author: &str,
    ) -> Result<Option<BookRecord>, StoreError> {
        self.find_by_keys(owner_key, &dedup_key(title), &dedup_key(author))
            .await
    }

    async fn insert(&self, book: NewBook) -> Result<BookRecord, StoreError> {
        let _guard = self.write_lock.lock().await;

        match self.insert_or_ignore(&book).await? {
            Some(record) => Ok(record),
            None => Err(StoreError::Duplicate {
                title: book.title,
                author: book.author,
            }),
        }
    }

    async fn find_or_create(&self, book: NewBook) -> Result<FindOrCreate, StoreError> {
        let _guard = self.write_lock.lock().await;

        if let Some(record) = self.insert_or_ignore(&book).await? {
            debug!("Created book '{}' for {}", record.title, record.owner_key);
            return Ok(FindOrCreate::Created(record));
        }

        self.find_duplicate(&book.owner_key, &book.title, &book.author)
            .await?
            .map(FindOrCreate::Existing)
            .ok_or(StoreError::Database(DieselError::NotFound))
    }

    async fn get(&self, id: &str, owner_key: &str) -> Result<Option<BookRecord>, StoreError> {
        let mut conn = self.pool.get().await?;

        let row = books::table
            .find(id)
            .filter(books::owner_key.eq(owner_key))
            .select(BookRow::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        Ok(row.map(BookRecord::from))
    }

    async fn list_by_owner(&self, owner_key: &str) -> Result<Vec<BookRecord>, StoreError> {
        let mut conn = self.pool.get().await?;

        let rows = books::table
            .filter(books::owner_key.eq(owner_key))
            .order((books::created_at.desc(), books::id.desc()))
            .select(BookRow::as_select())
            .load(&mut conn)
            .await?;

        Ok(rows.into_iter().map(BookRecord::from).collect())
    }

    async fn update(
        &self,
        id: &str,
        owner_key: &str,
        update: BookUpdate,
    ) -> Result<BookRecord, StoreError> {
        let _guard = self.write_lock.lock().await;

        let current = self
            .get(id, owner_key)
            .await?
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;

        let title = update
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or(current.title);
        let author = update
            .author
            .map(|a| a.trim().to_string())
            .map(|a| if a.is_empty() { UNKNOWN_AUTHOR.to_string() } else { a })
            .unwrap_or(current.author);
        let genre = update.genre.unwrap_or(current.genre);
        let title_key = dedup_key(&title);
        let author_key = dedup_key(&author);

        if let Some(existing) = self.find_by_keys(owner_key, &title_key, &author_key).await? {
            if existing.id != id {
                return Err(StoreError::Duplicate { title, author });
            }
        }

        let mut conn = self.pool.get().await?;
        let result = diesel::update(books::table.find(id))
            .set((
                books::title.eq(&title),
                books::author.eq(&author),
                books::genre.eq(genre.as_str()),
                books::title_key.eq(&title_key),
                books::author_key.eq(&author_key),
            ))
            .execute(&mut conn)
            .await;

        match result {
            Ok(_) => Ok(BookRecord {
                title,
                author,
                genre,
                ..current
            }),
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                Err(StoreError::Duplicate { title, author })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, id: &str, owner_key: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut conn = self.pool.get().await?;

        let rows = diesel::delete(
            books::table
                .find(id)
                .filter(books::owner_key.eq(owner_key)),
        )
        .execute(&mut conn)
        .await?;

        if rows == 0 {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genre::Genre;
    use tempfile::tempdir;

    async fn setup_test_db() -> (DieselBookRepository, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_url = dir.path().join("test.db").display().to_string();
        let repo = DieselBookRepository::open(&db_url).await.unwrap();
        (repo, dir)
    }

    fn book(owner: &str, title: &str, author: &str) -> NewBook {
        NewBook::new(owner, title, author, Genre::Fiction)
    }

    #[tokio::test]
    async fn test_insert_and_find_duplicate_case_insensitive() {
        let (repo, _dir) = setup_test_db().await;

        let created = repo
            .insert(book("alice", "Dune", "Frank Herbert"))
            .await
            .unwrap();
        assert_eq!(created.genre, Genre::Fiction);

        let found = repo
            .find_duplicate("alice", "DUNE", "frank herbert")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, created.id);

        assert!(repo
            .find_duplicate("bob", "Dune", "Frank Herbert")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate() {
        let (repo, _dir) = setup_test_db().await;

        repo.insert(book("alice", "Dune", "Frank Herbert"))
            .await
            .unwrap();
        let err = repo
            .insert(book("alice", "  dune", "FRANK HERBERT "))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));
        assert_eq!(repo.list_by_owner("alice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_find_or_create_reports_existing() {
        let (repo, _dir) = setup_test_db().await;

        let first = repo
            .find_or_create(book("alice", "Dune", "Frank Herbert"))
            .await
            .unwrap();
        assert!(first.is_created());

        let second = repo
            .find_or_create(book("alice", "DUNE", "Frank Herbert"))
            .await
            .unwrap();
        assert!(!second.is_created());
        assert_eq!(second.record().id, first.record().id);
        assert_eq!(second.record().title, "Dune");
    }

    #[tokio::test]
    async fn test_concurrent_find_or_create_creates_once() {
        let (repo, _dir) = setup_test_db().await;

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let repo = repo.clone();
                let title = if i % 2 == 0 { "Dune" } else { "dune" };
                tokio::spawn(async move {
                    repo.find_or_create(book("alice", title, "Frank Herbert"))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_created() {
                created += 1;
            }
        }

        assert_eq!(created, 1);
        assert_eq!(repo.list_by_owner("alice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_is_per_owner_newest_first() {
        let (repo, _dir) = setup_test_db().await;

        repo.insert(book("alice", "First", "A")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        repo.insert(book("alice", "Second", "B")).await.unwrap();
        repo.insert(book("bob", "Other", "C")).await.unwrap();

        let titles: Vec<String> = repo
            .list_by_owner("alice")
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.title)
            .collect();
        assert_eq!(titles, vec!["Second", "First"]);
    }

    #[tokio::test]
    async fn test_update_fields_and_conflicts() {
        let (repo, _dir) = setup_test_db().await;

        let dune = repo.insert(book("alice", "Dune", "Frank Herbert")).await.unwrap();
        repo.insert(book("alice", "Emma", "Jane Austen")).await.unwrap();

        let updated = repo
            .update(
                &dune.id,
                "alice",
                BookUpdate {
                    title: Some("Dune Messiah".to_string()),
                    genre: Some(Genre::History),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Dune Messiah");
        assert_eq!(updated.author, "Frank Herbert");
        assert_eq!(updated.genre, Genre::History);

        let stored = repo.get(&dune.id, "alice").await.unwrap().unwrap();
        assert_eq!(stored.title, "Dune Messiah");

        let conflict = repo
            .update(
                &dune.id,
                "alice",
                BookUpdate {
                    title: Some("EMMA".to_string()),
                    author: Some("jane austen".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(conflict, StoreError::Duplicate { .. }));

        // Changing only case of the book's own identity is allowed.
        repo.update(
            &dune.id,
            "alice",
            BookUpdate {
                title: Some("DUNE MESSIAH".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_update_and_delete_require_owner() {
        let (repo, _dir) = setup_test_db().await;
        let dune = repo.insert(book("alice", "Dune", "Frank Herbert")).await.unwrap();

        let err = repo
            .update(&dune.id, "bob", BookUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));

        let err = repo.delete(&dune.id, "bob").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));

        repo.delete(&dune.id, "alice").await.unwrap();
        assert!(repo.get(&dune.id, "alice").await.unwrap().is_none());
        let err = repo.delete(&dune.id, "alice").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_blank_author_is_stored_as_unknown() {
        let (repo, _dir) = setup_test_db().await;
        let record = repo.insert(book("alice", "Anonymous Poems", "")).await.unwrap();
        assert_eq!(record.author, UNKNOWN_AUTHOR);
    }
}
