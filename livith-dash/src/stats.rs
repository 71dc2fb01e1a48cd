//! Dashboard overview: row counts and recently updated concerts

use indexmap::IndexMap;
use livith_common::Table;
use serde::Serialize;

use crate::error::DashResult;
use crate::store::{Query, Record, RecordStore};

/// Concerts listed under "recently updated"
const RECENT_LIMIT: i64 = 5;

#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    /// Row count per table, in catalog order
    pub counts: IndexMap<Table, i64>,
    pub recently_updated_concerts: Vec<Record>,
}

pub async fn overview(store: &dyn RecordStore) -> DashResult<Overview> {
    let mut counts = IndexMap::new();
    for table in Table::ALL {
        counts.insert(table, store.count(table, &[]).await?);
    }

    let recently_updated_concerts = store
        .find(
            Table::Concerts,
            &Query::new()
                .order_desc("updated_at")
                .order_desc("id")
                .page(RECENT_LIMIT, 0),
        )
        .await?;

    Ok(Overview {
        counts,
        recently_updated_concerts,
    })
}
