//! Database initialization
//!
//! Opens (or creates) the SQLite database, applies connection pragmas and
//! brings the schema up to the catalog: `CREATE TABLE IF NOT EXISTS` for every
//! table, then automatic column sync.

use crate::db::catalog::Table;
use crate::db::schema_sync::SchemaSync;
use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Busy timeout applied to every connection
const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Pragmas go through connect options so every pooled connection gets them
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// In-memory database with the full schema
///
/// Limited to one connection: every `sqlite::memory:` connection is a
/// separate database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every catalog table (idempotent) and sync missing columns
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    for table in Table::ALL {
        sqlx::query(&table.create_table_sql()).execute(pool).await?;
    }

    SchemaSync::sync_all(pool).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_database_has_every_table() {
        let pool = init_memory_database().await.unwrap();

        for table in Table::ALL {
            let exists: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)",
            )
            .bind(table.name())
            .fetch_one(&pool)
            .await
            .unwrap();
            assert!(exists, "table {} missing", table);
        }
    }

    #[tokio::test]
    async fn test_foreign_keys_enforced() {
        let pool = init_memory_database().await.unwrap();

        let result = sqlx::query("INSERT INTO setlist_songs (setlist_id, order_index) VALUES (999, 0)")
            .execute(&pool)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_create_schema_idempotent() {
        let pool = init_memory_database().await.unwrap();
        create_schema(&pool).await.unwrap();
        create_schema(&pool).await.unwrap();
    }
}
