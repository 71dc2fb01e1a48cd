//! Record Store
//!
//! Table-keyed CRUD access over the catalog. [`RecordStore`] is the seam the
//! reconciler, composer and section rewriter are written against;
//! [`SqliteStore`] is the sqlx implementation.
//!
//! Identifiers (table and column names) only ever come from the catalog, so
//! the dynamic SQL built here never interpolates client input; every value is
//! bound.

use async_trait::async_trait;
use chrono::Utc;
use livith_common::{ColumnKind, Table};
use serde_json::{Map, Number, Value};
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, Row, Sqlite, SqlitePool, TypeInfo, ValueRef};
use tracing::debug;

use crate::error::{DashError, DashResult};

/// One table record as a JSON object (column name → value)
pub type Record = Map<String, Value>;

/// Columns the store maintains itself; client values are discarded
pub const MANAGED_COLUMNS: [&str; 4] = ["id", "created_at", "updated_at", "deleted_at"];

/// Row filter
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column = value` (`IS NULL` for a null value)
    Eq(String, Value),
    /// Case-insensitive substring match on any of the columns
    Contains(Vec<String>, String),
}

/// Sort key
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

/// LIMIT/OFFSET window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

/// Query for [`RecordStore::find`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Vec<OrderBy>,
    pub page: Option<Page>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality filter
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.into(), value.into()));
        self
    }

    /// Add a substring filter over several columns
    pub fn contains(mut self, columns: &[&str], needle: impl Into<String>) -> Self {
        self.filters.push(Filter::Contains(
            columns.iter().map(|c| c.to_string()).collect(),
            needle.into(),
        ));
        self
    }

    /// Ascending sort on a column
    pub fn order_asc(mut self, column: impl Into<String>) -> Self {
        self.order.push(OrderBy {
            column: column.into(),
            descending: false,
        });
        self
    }

    /// Descending sort on a column
    pub fn order_desc(mut self, column: impl Into<String>) -> Self {
        self.order.push(OrderBy {
            column: column.into(),
            descending: true,
        });
        self
    }

    /// Restrict to a LIMIT/OFFSET window
    pub fn page(mut self, limit: i64, offset: i64) -> Self {
        self.page = Some(Page { limit, offset });
        self
    }
}

/// Per-table create/read/update/delete and list/filter/paginate
///
/// Errors: `NotFound` when an id does not resolve, `Constraint` for
/// constraint violations, `Persistence` for anything else.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Rows matching `query`
    async fn find(&self, table: Table, query: &Query) -> DashResult<Vec<Record>>;

    /// Single row by id
    async fn get(&self, table: Table, id: i64) -> DashResult<Record>;

    /// Insert a row and return it as stored
    async fn create(&self, table: Table, data: &Record) -> DashResult<Record>;

    /// Update a row by id and return it as stored
    async fn update(&self, table: Table, id: i64, data: &Record) -> DashResult<Record>;

    /// Delete a row by id
    async fn delete(&self, table: Table, id: i64) -> DashResult<()>;

    /// Number of rows matching `filters`
    async fn count(&self, table: Table, filters: &[Filter]) -> DashResult<i64>;
}

/// Bindable value after coercion to a column kind
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Text(String),
}

/// Coerce a JSON value for storage in a column of `kind`
///
/// Strings are accepted for numeric and boolean columns (`"42"`, `"true"`);
/// an empty string is NULL everywhere except TEXT columns.
pub fn coerce(column: &str, kind: ColumnKind, value: &Value) -> DashResult<SqlValue> {
    let invalid = || {
        DashError::Validation(format!(
            "Invalid value for {} ({}): {}",
            column,
            kind.sql_type(),
            value
        ))
    };

    let coerced = match (kind, value) {
        (_, Value::Null) => SqlValue::Null,
        (ColumnKind::Text, Value::String(s)) => SqlValue::Text(s.clone()),
        (_, Value::String(s)) if s.trim().is_empty() => SqlValue::Null,

        (ColumnKind::Integer, Value::Number(n)) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                    SqlValue::Integer(f as i64)
                }
                _ => return Err(invalid()),
            },
        },
        (ColumnKind::Integer, Value::String(s)) => {
            SqlValue::Integer(s.trim().parse().map_err(|_| invalid())?)
        }
        (ColumnKind::Integer, Value::Bool(b)) => SqlValue::Integer(i64::from(*b)),

        (ColumnKind::Real, Value::Number(n)) => SqlValue::Real(n.as_f64().ok_or_else(invalid)?),
        (ColumnKind::Real, Value::String(s)) => {
            SqlValue::Real(s.trim().parse().map_err(|_| invalid())?)
        }

        (ColumnKind::Boolean, Value::Bool(b)) => SqlValue::Boolean(*b),
        (ColumnKind::Boolean, Value::Number(n)) => SqlValue::Boolean(n.as_f64() != Some(0.0)),
        (ColumnKind::Boolean, Value::String(s)) => match s.trim() {
            "true" | "1" => SqlValue::Boolean(true),
            "false" | "0" => SqlValue::Boolean(false),
            _ => return Err(invalid()),
        },

        (ColumnKind::Timestamp, Value::String(s)) => SqlValue::Text(s.clone()),

        (ColumnKind::Text, Value::Number(n)) => SqlValue::Text(n.to_string()),
        (ColumnKind::Text, Value::Bool(b)) => SqlValue::Text(b.to_string()),
        (ColumnKind::Text, other @ (Value::Array(_) | Value::Object(_))) => {
            SqlValue::Text(other.to_string())
        }

        _ => return Err(invalid()),
    };

    Ok(coerced)
}

/// Escape LIKE wildcards so the needle matches literally (escape char `\`)
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Store timestamp format
pub fn now_timestamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

fn bind_value(query: SqliteQuery<'_>, value: SqlValue) -> SqliteQuery<'_> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Integer(v) => query.bind(v),
        SqlValue::Real(v) => query.bind(v),
        SqlValue::Boolean(v) => query.bind(v),
        SqlValue::Text(v) => query.bind(v),
    }
}

/// Kind of a column, treating `id` as INTEGER
fn column_kind(table: Table, column: &str) -> Option<ColumnKind> {
    if column == "id" {
        return Some(ColumnKind::Integer);
    }
    table.column(column).map(|c| c.kind)
}

fn require_column(table: Table, column: &str) -> DashResult<ColumnKind> {
    column_kind(table, column)
        .ok_or_else(|| DashError::Validation(format!("Unknown column '{}' for {}", column, table)))
}

/// sqlx SQLite implementation of [`RecordStore`]
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Build `WHERE ...` and its bound values
    fn where_clause(table: Table, filters: &[Filter]) -> DashResult<(String, Vec<SqlValue>)> {
        let mut clauses = Vec::new();
        let mut values = Vec::new();

        for filter in filters {
            match filter {
                Filter::Eq(column, value) => {
                    let kind = require_column(table, column)?;
                    match coerce(column, kind, value)? {
                        SqlValue::Null => clauses.push(format!("{} IS NULL", column)),
                        coerced => {
                            clauses.push(format!("{} = ?", column));
                            values.push(coerced);
                        }
                    }
                }
                Filter::Contains(columns, needle) => {
                    if columns.is_empty() {
                        continue;
                    }
                    let pattern = format!("%{}%", escape_like(needle));
                    let mut any = Vec::with_capacity(columns.len());
                    for column in columns {
                        require_column(table, column)?;
                        any.push(format!("{} LIKE ? ESCAPE '\\'", column));
                        values.push(SqlValue::Text(pattern.clone()));
                    }
                    clauses.push(format!("({})", any.join(" OR ")));
                }
            }
        }

        if clauses.is_empty() {
            Ok((String::new(), values))
        } else {
            Ok((format!(" WHERE {}", clauses.join(" AND ")), values))
        }
    }

    /// Validated, coerced write columns; unknown and managed keys are dropped
    fn write_columns(table: Table, data: &Record) -> DashResult<Vec<(&'static str, SqlValue)>> {
        let mut columns = Vec::new();
        for (key, value) in data {
            if MANAGED_COLUMNS.contains(&key.as_str()) {
                continue;
            }
            match table.column(key) {
                Some(def) => columns.push((def.name, coerce(def.name, def.kind, value)?)),
                None => debug!("Ignoring unknown field '{}' for {}", key, table),
            }
        }
        Ok(columns)
    }

    async fn fetch_records(
        &self,
        table: Table,
        sql: &str,
        values: Vec<SqlValue>,
    ) -> DashResult<Vec<Record>> {
        let mut query = sqlx::query(sql);
        for value in values {
            query = bind_value(query, value);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(|row| row_to_record(table, row)).collect()
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn find(&self, table: Table, query: &Query) -> DashResult<Vec<Record>> {
        let (where_sql, mut values) = Self::where_clause(table, &query.filters)?;
        let mut sql = format!("SELECT * FROM {}{}", table.name(), where_sql);

        if !query.order.is_empty() {
            let mut keys = Vec::with_capacity(query.order.len());
            for order in &query.order {
                require_column(table, &order.column)?;
                let direction = if order.descending { "DESC" } else { "ASC" };
                keys.push(format!("{} {}", order.column, direction));
            }
            sql.push_str(&format!(" ORDER BY {}", keys.join(", ")));
        }

        if let Some(page) = query.page {
            sql.push_str(" LIMIT ? OFFSET ?");
            values.push(SqlValue::Integer(page.limit));
            values.push(SqlValue::Integer(page.offset));
        }

        self.fetch_records(table, &sql, values).await
    }

    async fn get(&self, table: Table, id: i64) -> DashResult<Record> {
        let sql = format!("SELECT * FROM {} WHERE id = ?", table.name());
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => row_to_record(table, &row),
            None => Err(DashError::NotFound(format!("{} {} not found", table, id))),
        }
    }

    async fn create(&self, table: Table, data: &Record) -> DashResult<Record> {
        let mut columns = Self::write_columns(table, data)?;
        let now = now_timestamp();
        if table.has_created_at() {
            columns.push(("created_at", SqlValue::Text(now.clone())));
        }
        if table.has_updated_at() {
            columns.push(("updated_at", SqlValue::Text(now)));
        }

        let sql = if columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES RETURNING *", table.name())
        } else {
            let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
            let placeholders = vec!["?"; columns.len()].join(", ");
            format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
                table.name(),
                names.join(", "),
                placeholders
            )
        };

        let mut query = sqlx::query(&sql);
        for (_, value) in columns {
            query = bind_value(query, value);
        }
        let row = query.fetch_one(&self.pool).await?;
        let record = row_to_record(table, &row)?;
        debug!("Created {} {}", table, record_id(&record).unwrap_or_default());
        Ok(record)
    }

    async fn update(&self, table: Table, id: i64, data: &Record) -> DashResult<Record> {
        let mut columns = Self::write_columns(table, data)?;
        if table.has_updated_at() {
            columns.push(("updated_at", SqlValue::Text(now_timestamp())));
        }

        if columns.is_empty() {
            return self.get(table, id).await;
        }

        let assignments: Vec<String> = columns
            .iter()
            .map(|(name, _)| format!("{} = ?", name))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ? RETURNING *",
            table.name(),
            assignments.join(", ")
        );

        let mut query = sqlx::query(&sql);
        for (_, value) in columns {
            query = bind_value(query, value);
        }
        let row = query.bind(id).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => {
                debug!("Updated {} {}", table, id);
                row_to_record(table, &row)
            }
            None => Err(DashError::NotFound(format!("{} {} not found", table, id))),
        }
    }

    async fn delete(&self, table: Table, id: i64) -> DashResult<()> {
        let sql = format!("DELETE FROM {} WHERE id = ?", table.name());
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(DashError::NotFound(format!("{} {} not found", table, id)));
        }
        debug!("Deleted {} {}", table, id);
        Ok(())
    }

    async fn count(&self, table: Table, filters: &[Filter]) -> DashResult<i64> {
        let (where_sql, values) = Self::where_clause(table, filters)?;
        let sql = format!("SELECT COUNT(*) FROM {}{}", table.name(), where_sql);

        let mut query = sqlx::query(&sql);
        for value in values {
            query = bind_value(query, value);
        }
        let row = query.fetch_one(&self.pool).await?;
        Ok(row.try_get::<i64, _>(0)?)
    }
}

/// `id` of a record, if present and integral
pub fn record_id(record: &Record) -> Option<i64> {
    record.get("id").and_then(Value::as_i64)
}

/// Decode a row into a JSON object, mapping BOOLEAN columns to JSON booleans
fn row_to_record(table: Table, row: &SqliteRow) -> DashResult<Record> {
    let mut record = Map::with_capacity(row.len());

    for (index, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(index)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            let type_name = raw.type_info().name().to_string();
            match type_name.as_str() {
                "INTEGER" | "BOOLEAN" => Value::from(row.try_get::<i64, _>(index)?),
                "REAL" => Number::from_f64(row.try_get::<f64, _>(index)?)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
                "BLOB" => Value::Null,
                _ => Value::from(row.try_get::<String, _>(index)?),
            }
        };

        let value = match (column_kind(table, column.name()), value) {
            (Some(ColumnKind::Boolean), Value::Number(n)) => Value::Bool(n.as_i64() != Some(0)),
            (_, value) => value,
        };

        record.insert(column.name().to_string(), value);
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    async fn setup_store() -> SqliteStore {
        let pool = livith_common::db::init_memory_database().await.unwrap();
        SqliteStore::new(pool)
    }

    #[test]
    fn test_coerce_integer() {
        assert_eq!(
            coerce("n", ColumnKind::Integer, &json!("42")).unwrap(),
            SqlValue::Integer(42)
        );
        assert_eq!(
            coerce("n", ColumnKind::Integer, &json!(7)).unwrap(),
            SqlValue::Integer(7)
        );
        assert_eq!(coerce("n", ColumnKind::Integer, &json!("")).unwrap(), SqlValue::Null);
        assert!(coerce("n", ColumnKind::Integer, &json!("abc")).is_err());
        assert_eq!(
            coerce("n", ColumnKind::Integer, &json!(7.0)).unwrap(),
            SqlValue::Integer(7)
        );
    }

    #[test]
    fn test_coerce_integer_out_of_range() {
        assert!(coerce("n", ColumnKind::Integer, &json!(1e30)).is_err());
        assert!(coerce("n", ColumnKind::Integer, &json!(-1e30)).is_err());
        assert!(coerce("n", ColumnKind::Integer, &json!(9.3e18)).is_err());
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%"), "50\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("c:\\x"), "c:\\\\x");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_coerce_boolean_and_text() {
        assert_eq!(
            coerce("b", ColumnKind::Boolean, &json!("true")).unwrap(),
            SqlValue::Boolean(true)
        );
        assert_eq!(
            coerce("b", ColumnKind::Boolean, &json!(0)).unwrap(),
            SqlValue::Boolean(false)
        );
        assert_eq!(
            coerce("t", ColumnKind::Text, &json!("")).unwrap(),
            SqlValue::Text(String::new())
        );
        assert_eq!(
            coerce("t", ColumnKind::Text, &json!(12)).unwrap(),
            SqlValue::Text("12".to_string())
        );
    }

    #[tokio::test]
    async fn test_create_get_update_delete() {
        let store = setup_store().await;

        let created = store
            .create(Table::Songs, &obj(json!({"title": "Yellow", "artist": "Coldplay"})))
            .await
            .unwrap();
        let id = record_id(&created).unwrap();
        assert_eq!(created["title"], "Yellow");
        assert!(created["created_at"].is_string());

        let updated = store
            .update(Table::Songs, id, &obj(json!({"youtube_id": "yKNxeF4KMsY"})))
            .await
            .unwrap();
        assert_eq!(updated["youtube_id"], "yKNxeF4KMsY");
        assert_eq!(updated["title"], "Yellow");

        store.delete(Table::Songs, id).await.unwrap();
        assert!(matches!(
            store.get(Table::Songs, id).await,
            Err(DashError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_client_timestamps_and_unknown_fields_ignored() {
        let store = setup_store().await;

        let created = store
            .create(
                Table::Songs,
                &obj(json!({
                    "title": "Fix You",
                    "created_at": "1999-01-01",
                    "id": 999,
                    "songs": {"nested": true}
                })),
            )
            .await
            .unwrap();
        assert_ne!(created["created_at"], "1999-01-01");
        assert_ne!(record_id(&created), Some(999));
        assert!(!created.contains_key("songs"));
    }

    #[tokio::test]
    async fn test_boolean_round_trip() {
        let store = setup_store().await;
        let user = store
            .create(
                Table::Users,
                &obj(json!({"nickname": "kim", "marketing_consent": "true"})),
            )
            .await
            .unwrap();
        assert_eq!(user["marketing_consent"], json!(true));
        assert_eq!(user["provider"], "kakao");
    }

    #[tokio::test]
    async fn test_not_null_violation_is_constraint() {
        let store = setup_store().await;
        let result = store.create(Table::Songs, &obj(json!({"artist": "X"}))).await;
        assert!(matches!(result, Err(DashError::Constraint(_))));
    }

    #[tokio::test]
    async fn test_foreign_key_violation_is_constraint() {
        let store = setup_store().await;
        let result = store
            .create(Table::SetlistSongs, &obj(json!({"setlist_id": 12345})))
            .await;
        assert!(matches!(result, Err(DashError::Constraint(_))));
    }

    #[tokio::test]
    async fn test_find_filters_order_and_page() {
        let store = setup_store().await;
        for title in ["Alpha", "Beta", "Gamma", "Alphabet"] {
            store
                .create(Table::Songs, &obj(json!({"title": title})))
                .await
                .unwrap();
        }

        let found = store
            .find(
                Table::Songs,
                &Query::new().contains(&["title", "artist"], "alpha").order_asc("title"),
            )
            .await
            .unwrap();
        let titles: Vec<&str> = found.iter().map(|r| r["title"].as_str().unwrap()).collect();
        assert_eq!(titles, vec!["Alpha", "Alphabet"]);

        let page = store
            .find(Table::Songs, &Query::new().order_desc("id").page(2, 1))
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0]["title"], "Gamma");

        let count = store
            .count(Table::Songs, &[Filter::Eq("title".into(), json!("Beta"))])
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_contains_matches_wildcards_literally() {
        let store = setup_store().await;
        for title in ["50%", "500", "a_b", "axb", "back\\slash"] {
            store
                .create(Table::Songs, &obj(json!({"title": title})))
                .await
                .unwrap();
        }

        let titles = |rows: Vec<Record>| -> Vec<String> {
            rows.iter().map(|r| r["title"].as_str().unwrap().to_string()).collect()
        };

        for (needle, expected) in [("50%", "50%"), ("a_b", "a_b"), ("k\\s", "back\\slash")] {
            let found = store
                .find(Table::Songs, &Query::new().contains(&["title"], needle))
                .await
                .unwrap();
            assert_eq!(titles(found), vec![expected.to_string()], "{}", needle);
        }
    }

    #[tokio::test]
    async fn test_unknown_filter_column_rejected() {
        let store = setup_store().await;
        let result = store
            .find(Table::Songs, &Query::new().eq("title; DROP TABLE songs", "x"))
            .await;
        assert!(matches!(result, Err(DashError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_missing_row_is_not_found() {
        let store = setup_store().await;
        let result = store
            .update(Table::Songs, 404, &obj(json!({"title": "x"})))
            .await;
        assert!(matches!(result, Err(DashError::NotFound(_))));
        assert!(matches!(
            store.delete(Table::Songs, 404).await,
            Err(DashError::NotFound(_))
        ));
    }
}
