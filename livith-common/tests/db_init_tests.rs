//! Database initialization tests against real files

use livith_common::db::init::init_database;
use livith_common::Table;
use tempfile::TempDir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("livith.db");

    let pool = init_database(&db_path).await;
    assert!(pool.is_ok(), "Database initialization failed: {:?}", pool.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing_and_keeps_rows() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("livith.db");

    {
        let pool = init_database(&db_path).await.unwrap();
        sqlx::query("INSERT INTO songs (title) VALUES ('Yellow')")
            .execute(&pool)
            .await
            .unwrap();
        pool.close().await;
    }

    let pool = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM songs")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_legacy_table_gains_catalog_columns() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("legacy.db");

    {
        let pool = init_database(&db_path).await.unwrap();
        sqlx::query("DROP TABLE home_concert_sections").execute(&pool).await.unwrap();
        sqlx::query(
            "CREATE TABLE home_concert_sections (id INTEGER PRIMARY KEY AUTOINCREMENT, \
             home_section_id INTEGER NOT NULL, concert_id INTEGER NOT NULL)",
        )
        .execute(&pool)
        .await
        .unwrap();
        pool.close().await;
    }

    let pool = init_database(&db_path).await.unwrap();
    let query = format!("PRAGMA table_info({})", Table::HomeConcertSections.name());
    let rows = sqlx::query(&query).fetch_all(&pool).await.unwrap();
    let names: Vec<String> = rows
        .iter()
        .map(|r| sqlx::Row::get::<String, _>(r, "name"))
        .collect();
    assert!(names.contains(&"sorted_index".to_string()));
    assert!(names.contains(&"section_title".to_string()));
}

#[tokio::test]
async fn test_foreign_keys_enabled_on_file_database() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("fk.db")).await.unwrap();

    let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(enabled, 1);
}
