//! Typeahead search used by the setlist creator and link pickers

use livith_common::Table;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{DashError, DashResult};
use crate::store::{Query, Record, RecordStore};

/// Maximum results per search
pub const SEARCH_LIMIT: i64 = 20;

/// Query string of `GET /dashboard/search`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub q: Option<String>,
}

/// Searchable table with its match columns and returned fields
struct SearchTarget {
    table: Table,
    columns: &'static [&'static str],
    fields: &'static [&'static str],
}

fn target(kind: &str) -> Option<SearchTarget> {
    let target = match kind {
        "concerts" => SearchTarget {
            table: Table::Concerts,
            columns: &["title", "artist"],
            fields: &["id", "title", "artist", "start_date", "end_date", "venue", "status"],
        },
        "songs" => SearchTarget {
            table: Table::Songs,
            columns: &["title", "artist"],
            fields: &["id", "title", "artist"],
        },
        "setlists" => SearchTarget {
            table: Table::Setlists,
            columns: &["title", "artist"],
            fields: &["id", "title", "artist", "start_date", "end_date"],
        },
        "users" => SearchTarget {
            table: Table::Users,
            columns: &["nickname", "email"],
            fields: &["id", "nickname", "email", "provider"],
        },
        _ => return None,
    };
    Some(target)
}

/// Substring search, most recently updated first
pub async fn search(store: &dyn RecordStore, params: &SearchParams) -> DashResult<Vec<Record>> {
    let kind = params
        .kind
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| DashError::Validation("Type is required".to_string()))?;
    let target = target(kind).ok_or_else(|| DashError::Validation("Invalid type".to_string()))?;
    let needle = params.q.clone().unwrap_or_default();

    let rows = store
        .find(
            target.table,
            &Query::new()
                .contains(target.columns, needle)
                .order_desc("updated_at")
                .order_desc("id")
                .page(SEARCH_LIMIT, 0),
        )
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            target
                .fields
                .iter()
                .map(|f| (f.to_string(), row.get(*f).cloned().unwrap_or(Value::Null)))
                .collect()
        })
        .collect())
}
