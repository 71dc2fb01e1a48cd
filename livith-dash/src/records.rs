//! Records service
//!
//! Per-table create/update/delete/list/detail used by the generic
//! `/dashboard/{table}` routes, with the table-specific rules:
//! - section memberships are appended and their section reindexed
//! - deleting a setlist first removes its memberships and concert links
//! - setlist and concert details carry their related rows

use livith_common::Table;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::{DashError, DashResult};
use crate::pagination::{calculate_pagination, Pagination, PAGE_SIZE};
use crate::sections::{self, SectionKind};
use crate::store::{record_id, Query, Record, RecordStore};

/// Query string of a table listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

/// One page of a table
#[derive(Debug, Clone, Serialize)]
pub struct TablePage {
    pub table: Table,
    pub rows: Vec<Record>,
    #[serde(flatten)]
    pub pagination: Pagination,
}

/// Paginated listing; default order is newest first
pub async fn list_table(
    store: &dyn RecordStore,
    table: Table,
    params: &ListParams,
) -> DashResult<TablePage> {
    let descending = match params.order.as_deref() {
        None | Some("") | Some("desc") => true,
        Some("asc") => false,
        Some(other) => {
            return Err(DashError::Validation(format!("Invalid sort order: {}", other)))
        }
    };

    let sort = match params.sort.as_deref().filter(|s| !s.is_empty()) {
        Some(column) if table.has_column(column) => column,
        Some(column) => {
            return Err(DashError::Validation(format!("Invalid sort column: {}", column)))
        }
        None if table.has_created_at() => "created_at",
        None => "id",
    };

    let total = store.count(table, &[]).await?;
    let pagination = calculate_pagination(total, params.page.unwrap_or(1));

    let mut query = Query::new();
    query = if descending {
        query.order_desc(sort)
    } else {
        query.order_asc(sort)
    };
    if sort != "id" {
        query = query.order_desc("id");
    }
    let rows = store
        .find(table, &query.page(PAGE_SIZE, pagination.offset))
        .await?;

    Ok(TablePage {
        table,
        rows,
        pagination,
    })
}

/// Create a row; section memberships go through the section rewriter
pub async fn create_record(
    store: &dyn RecordStore,
    table: Table,
    data: &Record,
) -> DashResult<Record> {
    match SectionKind::for_membership_table(table) {
        Some(kind) => sections::append_concert(store, kind, data).await,
        None => store.create(table, data).await,
    }
}

/// Update a row by id
pub async fn update_record(
    store: &dyn RecordStore,
    table: Table,
    id: i64,
    data: &Record,
) -> DashResult<Record> {
    store.update(table, id, data).await
}

/// Delete a row by id, returning it as it was
///
/// Deleting a setlist removes its `setlist_songs` and `concert_setlists`
/// rows first.
pub async fn delete_record(store: &dyn RecordStore, table: Table, id: i64) -> DashResult<Record> {
    let record = store.get(table, id).await?;

    if table == Table::Setlists {
        for child in [Table::SetlistSongs, Table::ConcertSetlists] {
            let rows = store.find(child, &Query::new().eq("setlist_id", id)).await?;
            for row in &rows {
                if let Some(child_id) = record_id(row) {
                    store.delete(child, child_id).await?;
                }
            }
            if !rows.is_empty() {
                info!("Deleted {} {} rows of setlist {}", rows.len(), child, id);
            }
        }
    }

    store.delete(table, id).await?;
    Ok(record)
}

/// Attach the referenced row of `foreign_key` under `key`
async fn with_parent(
    store: &dyn RecordStore,
    mut row: Record,
    foreign_key: &str,
    parent: Table,
    key: &str,
) -> DashResult<Record> {
    let parent_row = match row.get(foreign_key).and_then(Value::as_i64) {
        Some(parent_id) => match store.get(parent, parent_id).await {
            Ok(found) => Value::Object(found),
            Err(DashError::NotFound(_)) => Value::Null,
            Err(e) => return Err(e),
        },
        None => Value::Null,
    };
    row.insert(key.to_string(), parent_row);
    Ok(row)
}

/// Child rows of `parent_id`, each optionally with its other parent attached
async fn children(
    store: &dyn RecordStore,
    child: Table,
    query: Query,
    include: Option<(&str, Table, &str)>,
) -> DashResult<Value> {
    let rows = store.find(child, &query).await?;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let row = match include {
            Some((foreign_key, parent, key)) => {
                with_parent(store, row, foreign_key, parent, key).await?
            }
            None => row,
        };
        out.push(Value::Object(row));
    }
    Ok(Value::Array(out))
}

/// A record with its related rows
///
/// - `setlists`: `setlist_songs` (by `order_index`, each with `songs`) and
///   `concert_setlists` (each with `concerts`)
/// - `concerts`: `concert_setlists` (each with `setlists`), `md`, `schedule`,
///   `cultures`, `concert_info`, `concert_genres` (each with `genres`)
pub async fn record_detail(store: &dyn RecordStore, table: Table, id: i64) -> DashResult<Record> {
    let mut record = store.get(table, id).await?;

    match table {
        Table::Setlists => {
            let songs = children(
                store,
                Table::SetlistSongs,
                Query::new()
                    .eq("setlist_id", id)
                    .order_asc("order_index")
                    .order_asc("id"),
                Some(("song_id", Table::Songs, "songs")),
            )
            .await?;
            let links = children(
                store,
                Table::ConcertSetlists,
                Query::new().eq("setlist_id", id).order_asc("id"),
                Some(("concert_id", Table::Concerts, "concerts")),
            )
            .await?;
            record.insert("setlist_songs".to_string(), songs);
            record.insert("concert_setlists".to_string(), links);
        }
        Table::Concerts => {
            let links = children(
                store,
                Table::ConcertSetlists,
                Query::new().eq("concert_id", id).order_asc("id"),
                Some(("setlist_id", Table::Setlists, "setlists")),
            )
            .await?;
            record.insert("concert_setlists".to_string(), links);

            for child in [Table::Md, Table::Schedule, Table::Cultures, Table::ConcertInfo] {
                let rows = children(
                    store,
                    child,
                    Query::new().eq("concert_id", id).order_asc("id"),
                    None,
                )
                .await?;
                record.insert(child.name().to_string(), rows);
            }

            let genres = children(
                store,
                Table::ConcertGenres,
                Query::new().eq("concert_id", id).order_asc("id"),
                Some(("genre_id", Table::Genres, "genres")),
            )
            .await?;
            record.insert("concert_genres".to_string(), genres);
        }
        _ => {}
    }

    Ok(record)
}
