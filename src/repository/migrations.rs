//! Database migrations using diesel_migrations.
//!
//! Embeds migrations at compile time and runs them via a blocking task
//! to work with async connections.

use diesel::connection::SimpleConnection;
use diesel::Connection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::info;

use super::pool::{to_diesel_error, AsyncSqlitePool, DieselError};

pub const SQLITE_MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/sqlite");

/// Run pending migrations against the database behind `pool`.
///
/// WAL mode is set outside the migrations since it cannot change inside a
/// transaction.
pub async fn run_migrations(pool: &AsyncSqlitePool) -> Result<(), DieselError> {
    let url = pool.database_url().to_string();

    tokio::task::spawn_blocking(move || {
        let mut conn = diesel::SqliteConnection::establish(&url).map_err(to_diesel_error)?;
        conn.batch_execute("PRAGMA journal_mode = WAL;")?;

        let migrations = conn
            .run_pending_migrations(SQLITE_MIGRATIONS)
            .map_err(DieselError::QueryBuilderError)?;

        for migration in &migrations {
            info!("Applied migration: {}", migration);
        }
        if migrations.is_empty() {
            info!("No pending migrations");
        }

        Ok(())
    })
    .await
    .map_err(|e| DieselError::QueryBuilderError(Box::new(e)))?
}
