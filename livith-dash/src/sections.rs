//! Section memberships
//!
//! Home and search sections each hold an ordered list of concerts
//! (`home_concert_sections` / `search_concert_sections`). `sorted_index` is
//! kept contiguous from 0: every insert is followed by a full reindex of the
//! section.

use livith_common::Table;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

use crate::error::{DashError, DashResult};
use crate::store::{record_id, Query, Record, RecordStore};

/// Substrings marking the "recently updated" section
const RECENT_SECTION_MARKERS: [&str; 2] = ["최근", "업데이트"];

/// Concerts placed by a section sync
const RECENT_CONCERT_COUNT: i64 = 5;

/// Home or search section family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Home,
    Search,
}

impl SectionKind {
    /// Table holding the sections
    pub fn section_table(self) -> Table {
        match self {
            SectionKind::Home => Table::HomeSections,
            SectionKind::Search => Table::SearchSections,
        }
    }

    /// Table holding the memberships
    pub fn membership_table(self) -> Table {
        match self {
            SectionKind::Home => Table::HomeConcertSections,
            SectionKind::Search => Table::SearchConcertSections,
        }
    }

    /// Membership column referencing the section
    pub fn section_column(self) -> &'static str {
        match self {
            SectionKind::Home => "home_section_id",
            SectionKind::Search => "search_section_id",
        }
    }

    /// Section kind owning a membership table
    pub fn for_membership_table(table: Table) -> Option<Self> {
        match table {
            Table::HomeConcertSections => Some(SectionKind::Home),
            Table::SearchConcertSections => Some(SectionKind::Search),
            _ => None,
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionKind::Home => f.write_str("home"),
            SectionKind::Search => f.write_str("search"),
        }
    }
}

impl FromStr for SectionKind {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "home" => Ok(SectionKind::Home),
            "search" => Ok(SectionKind::Search),
            _ => Err(DashError::Validation("Invalid type".to_string())),
        }
    }
}

/// Memberships of a section ordered by `(sorted_index, id)`
async fn ordered_memberships(
    store: &dyn RecordStore,
    kind: SectionKind,
    section_id: i64,
) -> DashResult<Vec<Record>> {
    store
        .find(
            kind.membership_table(),
            &Query::new()
                .eq(kind.section_column(), section_id)
                .order_asc("sorted_index")
                .order_asc("id"),
        )
        .await
}

/// Rewrite every membership's `sorted_index` to its position
pub async fn reindex(store: &dyn RecordStore, kind: SectionKind, section_id: i64) -> DashResult<()> {
    let memberships = ordered_memberships(store, kind, section_id).await?;
    for (position, membership) in memberships.iter().enumerate() {
        if let Some(id) = record_id(membership) {
            let mut data = Record::new();
            data.insert("sorted_index".to_string(), json!(position));
            store.update(kind.membership_table(), id, &data).await?;
        }
    }
    Ok(())
}

/// Insert a membership at the end of its section, then reindex the section
///
/// Any client-supplied `sorted_index` is replaced by a provisional trailing
/// index. Returns the membership as stored after the reindex.
pub async fn append_concert(
    store: &dyn RecordStore,
    kind: SectionKind,
    data: &Record,
) -> DashResult<Record> {
    let section_id = data
        .get(kind.section_column())
        .and_then(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .ok_or_else(|| {
            DashError::Validation(format!("Missing required field: {}", kind.section_column()))
        })?;

    let existing = ordered_memberships(store, kind, section_id).await?;
    let trailing = existing
        .last()
        .and_then(|m| m.get("sorted_index"))
        .and_then(Value::as_i64)
        .map_or(0, |last| last + 1);

    let mut data = data.clone();
    data.insert("sorted_index".to_string(), json!(trailing));
    let created = store.create(kind.membership_table(), &data).await?;

    reindex(store, kind, section_id).await?;

    match record_id(&created) {
        Some(id) => store.get(kind.membership_table(), id).await,
        None => Ok(created),
    }
}

/// Section with its concerts in display order
#[derive(Debug, Clone, Serialize)]
pub struct SectionDetail {
    pub section: Record,
    /// Concert fields plus `sorted_index` and `section_concert_id`
    pub concerts: Vec<Record>,
}

/// Load a section and its ordered concerts
pub async fn section_detail(
    store: &dyn RecordStore,
    kind: SectionKind,
    section_id: i64,
) -> DashResult<SectionDetail> {
    let section = match store.get(kind.section_table(), section_id).await {
        Ok(section) => section,
        Err(DashError::NotFound(_)) => {
            return Err(DashError::NotFound("Section not found".to_string()))
        }
        Err(e) => return Err(e),
    };

    let memberships = ordered_memberships(store, kind, section_id).await?;
    let mut concerts = Vec::with_capacity(memberships.len());
    for membership in memberships {
        let mut entry = Record::new();
        if let Some(concert_id) = membership.get("concert_id").and_then(Value::as_i64) {
            match store.get(Table::Concerts, concert_id).await {
                Ok(concert) => {
                    for field in ["id", "title", "artist", "status", "start_date", "end_date"] {
                        if let Some(value) = concert.get(field) {
                            entry.insert(field.to_string(), value.clone());
                        }
                    }
                }
                Err(DashError::NotFound(_)) => {
                    warn!("Section {} {} references missing concert {}", kind, section_id, concert_id)
                }
                Err(e) => return Err(e),
            }
        }
        entry.insert(
            "sorted_index".to_string(),
            membership.get("sorted_index").cloned().unwrap_or(Value::Null),
        );
        entry.insert(
            "section_concert_id".to_string(),
            membership.get("id").cloned().unwrap_or(Value::Null),
        );
        concerts.push(entry);
    }

    Ok(SectionDetail { section, concerts })
}

/// Result of a section sync
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub home_section_updated: bool,
    pub search_section_updated: bool,
    /// Titles of the placed concerts, most recent first
    pub concerts: Vec<Value>,
}

/// Section whose title marks it as "recent", else the first section
async fn pick_recent_section(store: &dyn RecordStore, kind: SectionKind) -> DashResult<Option<Record>> {
    let sections = store
        .find(kind.section_table(), &Query::new().order_asc("id"))
        .await?;

    let marked = sections.iter().position(|section| {
        section
            .get("section_title")
            .and_then(Value::as_str)
            .is_some_and(|title| RECENT_SECTION_MARKERS.iter().any(|m| title.contains(m)))
    });

    Ok(match marked {
        Some(index) => sections.into_iter().nth(index),
        None => sections.into_iter().next(),
    })
}

/// Fill the "recent" home and search sections with the latest concerts
///
/// Existing memberships of the chosen sections are replaced by the five most
/// recently updated concerts at indices `0..4`.
pub async fn sync_recent_sections(store: &dyn RecordStore) -> DashResult<SyncReport> {
    let concerts = store
        .find(
            Table::Concerts,
            &Query::new()
                .order_desc("updated_at")
                .order_desc("id")
                .page(RECENT_CONCERT_COUNT, 0),
        )
        .await?;

    if concerts.is_empty() {
        return Err(DashError::Validation("No concerts found".to_string()));
    }

    let mut report = SyncReport {
        concerts: concerts
            .iter()
            .map(|c| c.get("title").cloned().unwrap_or(Value::Null))
            .collect(),
        ..Default::default()
    };

    for kind in [SectionKind::Home, SectionKind::Search] {
        let Some(section) = pick_recent_section(store, kind).await? else {
            warn!("No {} section to sync", kind);
            continue;
        };
        let Some(section_id) = record_id(&section) else {
            continue;
        };

        for membership in ordered_memberships(store, kind, section_id).await? {
            if let Some(id) = record_id(&membership) {
                store.delete(kind.membership_table(), id).await?;
            }
        }

        let section_title = section.get("section_title").cloned().unwrap_or(Value::Null);
        for (position, concert) in concerts.iter().enumerate() {
            let mut data = Record::new();
            data.insert(kind.section_column().to_string(), json!(section_id));
            data.insert("concert_id".to_string(), concert.get("id").cloned().unwrap_or(Value::Null));
            data.insert("section_title".to_string(), section_title.clone());
            data.insert(
                "concert_title".to_string(),
                concert.get("title").cloned().unwrap_or(Value::Null),
            );
            data.insert("sorted_index".to_string(), json!(position));
            store.create(kind.membership_table(), &data).await?;
        }

        info!("Synced {} section {} with {} concerts", kind, section_id, concerts.len());
        match kind {
            SectionKind::Home => report.home_section_updated = true,
            SectionKind::Search => report.search_section_updated = true,
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tables() {
        assert_eq!(SectionKind::Home.membership_table(), Table::HomeConcertSections);
        assert_eq!(SectionKind::Search.section_column(), "search_section_id");
        assert_eq!(
            SectionKind::for_membership_table(Table::SearchConcertSections),
            Some(SectionKind::Search)
        );
        assert_eq!(SectionKind::for_membership_table(Table::Concerts), None);
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("home".parse::<SectionKind>().unwrap(), SectionKind::Home);
        assert!(matches!(
            "banner".parse::<SectionKind>(),
            Err(DashError::Validation(_))
        ));
    }
}
