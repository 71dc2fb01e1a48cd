//! Automatic Schema Synchronization
//!
//! The catalog in [`crate::db::catalog`] is the single source of truth for the
//! dashboard schema. After `CREATE TABLE IF NOT EXISTS` has run, this module
//! compares each table against the catalog and adds missing columns via
//! `ALTER TABLE ADD COLUMN`. Type and constraint drift is reported, never fixed.

use crate::db::catalog::{ColumnDefinition, Table};
use crate::Result;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};

/// Actual column from database introspection (PRAGMA table_info result)
#[derive(Debug, Clone)]
pub struct ActualColumn {
    /// Column ID (position in table)
    pub cid: i32,
    /// Column name
    pub name: String,
    /// SQL type from PRAGMA table_info
    pub type_name: String,
    /// NOT NULL constraint
    pub not_null: bool,
    /// DEFAULT value
    pub default_value: Option<String>,
    /// PRIMARY KEY flag
    pub pk: bool,
}

/// Schema drift detected between catalog and database
#[derive(Debug, Clone)]
pub enum SchemaDrift {
    /// Column missing from database
    MissingColumn {
        table: Table,
        column: ColumnDefinition,
    },
    /// Column type mismatch (requires manual migration)
    TypeMismatch {
        table: Table,
        column: String,
        expected: String,
        actual: String,
    },
    /// NOT NULL expected but absent (requires table recreation)
    NullabilityMismatch { table: Table, column: String },
}

/// Schema introspection via `PRAGMA table_info`
pub struct SchemaIntrospector;

impl SchemaIntrospector {
    /// Read actual columns of a table, ordered by cid
    pub async fn introspect_table(pool: &SqlitePool, table: Table) -> Result<Vec<ActualColumn>> {
        let query = format!("PRAGMA table_info({})", table.name());
        let rows = sqlx::query(&query).fetch_all(pool).await?;

        let mut columns: Vec<ActualColumn> = rows
            .iter()
            .map(|row| ActualColumn {
                cid: row.get("cid"),
                name: row.get("name"),
                type_name: row.get("type"),
                not_null: row.get::<i32, _>("notnull") != 0,
                default_value: row.get("dflt_value"),
                pk: row.get::<i32, _>("pk") != 0,
            })
            .collect();

        columns.sort_by_key(|c| c.cid);
        Ok(columns)
    }

    /// Check if table exists
    pub async fn table_exists(pool: &SqlitePool, table: Table) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)",
        )
        .bind(table.name())
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }
}

/// Catalog-vs-database comparison
pub struct SchemaDiff;

impl SchemaDiff {
    /// Compare catalog columns with introspected columns
    pub fn compare(table: Table, actual: &[ActualColumn]) -> Vec<SchemaDrift> {
        let mut drift = Vec::new();

        for expected in table.columns() {
            match actual.iter().find(|c| c.name == expected.name) {
                Some(found) => {
                    let expected_type = expected.kind.sql_type();
                    if !Self::types_compatible(expected_type, &found.type_name) {
                        drift.push(SchemaDrift::TypeMismatch {
                            table,
                            column: expected.name.to_string(),
                            expected: expected_type.to_string(),
                            actual: found.type_name.clone(),
                        });
                    }
                    if expected.not_null && !found.not_null {
                        drift.push(SchemaDrift::NullabilityMismatch {
                            table,
                            column: expected.name.to_string(),
                        });
                    }
                }
                None => drift.push(SchemaDrift::MissingColumn {
                    table,
                    column: expected,
                }),
            }
        }

        drift
    }

    /// SQLite type affinity comparison
    fn types_compatible(expected: &str, actual: &str) -> bool {
        let exp = expected.to_uppercase();
        let act = actual.to_uppercase();

        if exp == act {
            return true;
        }

        // BOOLEAN and TIMESTAMP have NUMERIC affinity; accept either spelling
        let numeric = |t: &str| t.contains("BOOL") || t.contains("TIMESTAMP") || t.contains("DATE");
        let integer = |t: &str| t.contains("INT");
        let text = |t: &str| t.contains("TEXT") || t.contains("CHAR") || t.contains("CLOB");
        let real = |t: &str| t.contains("REAL") || t.contains("FLOA") || t.contains("DOUB");

        (integer(&exp) && integer(&act))
            || (text(&exp) && text(&act))
            || (real(&exp) && real(&act))
            || (numeric(&exp) && numeric(&act))
    }
}

/// Applies catalog drift fixes
pub struct SchemaSync;

impl SchemaSync {
    /// Synchronize every catalog table
    pub async fn sync_all(pool: &SqlitePool) -> Result<()> {
        for table in Table::ALL {
            Self::sync_table(pool, table).await?;
        }
        Ok(())
    }

    /// Detect drift on one table and add missing columns
    pub async fn sync_table(pool: &SqlitePool, table: Table) -> Result<()> {
        if !SchemaIntrospector::table_exists(pool, table).await? {
            warn!("Schema sync: table '{}' does not exist", table);
            return Ok(());
        }

        let actual = SchemaIntrospector::introspect_table(pool, table).await?;
        let drift = SchemaDiff::compare(table, &actual);

        if drift.is_empty() {
            debug!("Schema sync: '{}' up to date", table);
            return Ok(());
        }

        for change in drift {
            match change {
                SchemaDrift::MissingColumn { table, column } => {
                    Self::add_column(pool, table, &column).await?;
                }
                SchemaDrift::TypeMismatch {
                    table,
                    column,
                    expected,
                    actual,
                } => {
                    warn!(
                        "Type mismatch in {}.{}: expected '{}', found '{}'",
                        table, column, expected, actual
                    );
                }
                SchemaDrift::NullabilityMismatch { table, column } => {
                    warn!("Constraint mismatch in {}.{}: missing NOT NULL", table, column);
                }
            }
        }

        Ok(())
    }

    /// Add missing column via `ALTER TABLE ADD COLUMN`
    ///
    /// SQLite cannot add a NOT NULL column without a constant default, nor a
    /// foreign key with a non-null default; such columns are added nullable.
    async fn add_column(pool: &SqlitePool, table: Table, column: &ColumnDefinition) -> Result<()> {
        let mut sql = format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            table.name(),
            column.name,
            column.kind.sql_type()
        );

        // CURRENT_TIMESTAMP is not a constant default for ALTER TABLE
        let default = column
            .default_value
            .filter(|d| !d.eq_ignore_ascii_case("CURRENT_TIMESTAMP"));

        match (column.not_null, default) {
            (true, Some(default)) if column.references.is_none() => {
                sql.push_str(&format!(" NOT NULL DEFAULT {}", default));
            }
            (_, Some(default)) if column.references.is_none() => {
                sql.push_str(&format!(" DEFAULT {}", default));
            }
            (true, _) => {
                warn!(
                    "Cannot add NOT NULL column {}.{} via ALTER TABLE; adding as nullable",
                    table, column.name
                );
            }
            _ => {}
        }

        info!("Adding column: {}.{} ({})", table, column.name, column.kind.sql_type());

        match sqlx::query(&sql).execute(pool).await {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("duplicate column") => {
                debug!("Column {}.{} already added", table, column.name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[test]
    fn test_types_compatible() {
        assert!(SchemaDiff::types_compatible("TEXT", "TEXT"));
        assert!(SchemaDiff::types_compatible("text", "VARCHAR(255)"));
        assert!(SchemaDiff::types_compatible("INTEGER", "INT"));
        assert!(SchemaDiff::types_compatible("REAL", "DOUBLE PRECISION"));
        assert!(SchemaDiff::types_compatible("TIMESTAMP", "DATETIME"));
        assert!(SchemaDiff::types_compatible("BOOLEAN", "BOOL"));

        assert!(!SchemaDiff::types_compatible("TEXT", "INTEGER"));
        assert!(!SchemaDiff::types_compatible("REAL", "TEXT"));
    }

    #[tokio::test]
    async fn test_detect_missing_columns_on_legacy_songs_table() {
        let pool = setup_test_db().await;
        sqlx::query("CREATE TABLE songs (id INTEGER PRIMARY KEY, title TEXT NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();

        let actual = SchemaIntrospector::introspect_table(&pool, Table::Songs)
            .await
            .unwrap();
        let drift = SchemaDiff::compare(Table::Songs, &actual);

        let missing: Vec<&str> = drift
            .iter()
            .filter_map(|d| match d {
                SchemaDrift::MissingColumn { column, .. } => Some(column.name),
                _ => None,
            })
            .collect();
        assert!(missing.contains(&"lyrics"));
        assert!(missing.contains(&"youtube_id"));
        assert!(!missing.contains(&"title"));
    }

    #[tokio::test]
    async fn test_detect_type_mismatch() {
        let pool = setup_test_db().await;
        sqlx::query("CREATE TABLE genres (id INTEGER PRIMARY KEY, name INTEGER NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();

        let actual = SchemaIntrospector::introspect_table(&pool, Table::Genres)
            .await
            .unwrap();
        let drift = SchemaDiff::compare(Table::Genres, &actual);

        assert_eq!(drift.len(), 1);
        match &drift[0] {
            SchemaDrift::TypeMismatch { column, expected, actual, .. } => {
                assert_eq!(column, "name");
                assert_eq!(expected, "TEXT");
                assert_eq!(actual, "INTEGER");
            }
            other => panic!("Expected TypeMismatch, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sync_adds_missing_columns() {
        let pool = setup_test_db().await;
        sqlx::query("CREATE TABLE setlists (id INTEGER PRIMARY KEY, title TEXT NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO setlists (title) VALUES ('Existing')")
            .execute(&pool)
            .await
            .unwrap();

        SchemaSync::sync_table(&pool, Table::Setlists).await.unwrap();

        let columns = SchemaIntrospector::introspect_table(&pool, Table::Setlists)
            .await
            .unwrap();
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert!(names.contains(&"venue"));
        assert!(names.contains(&"created_at"));
        assert!(names.contains(&"updated_at"));

        // Second pass is a no-op
        SchemaSync::sync_table(&pool, Table::Setlists).await.unwrap();
        let again = SchemaIntrospector::introspect_table(&pool, Table::Setlists)
            .await
            .unwrap();
        assert_eq!(again.len(), columns.len());
    }

    #[tokio::test]
    async fn test_sync_keeps_constant_default() {
        let pool = setup_test_db().await;
        sqlx::query("CREATE TABLE concerts (id INTEGER PRIMARY KEY, title TEXT NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();

        SchemaSync::sync_table(&pool, Table::Concerts).await.unwrap();

        let columns = SchemaIntrospector::introspect_table(&pool, Table::Concerts)
            .await
            .unwrap();
        let status = columns.iter().find(|c| c.name == "status").unwrap();
        assert!(status.not_null);
        assert_eq!(status.default_value.as_deref(), Some("'UPCOMING'"));
    }

    #[tokio::test]
    async fn test_table_exists() {
        let pool = setup_test_db().await;
        assert!(!SchemaIntrospector::table_exists(&pool, Table::Md).await.unwrap());

        sqlx::query(&Table::Concerts.create_table_sql())
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(&Table::Md.create_table_sql())
            .execute(&pool)
            .await
            .unwrap();
        assert!(SchemaIntrospector::table_exists(&pool, Table::Md).await.unwrap());
    }
}
