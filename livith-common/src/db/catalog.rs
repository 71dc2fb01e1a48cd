//! Table catalog
//!
//! Single source of truth for the dashboard schema. Every table the dashboard
//! can touch is a variant of [`Table`]; its columns are declared once here and
//! used for both `CREATE TABLE` generation and request validation in the
//! record store.
//!
//! # Usage
//!
//! ```
//! use livith_common::db::catalog::Table;
//!
//! let table: Table = "setlist_songs".parse().unwrap();
//! assert_eq!(table, Table::SetlistSongs);
//! assert!(table.column("order_index").is_some());
//! assert!("not_a_table".parse::<Table>().is_err());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Storage class of a column, used for DDL and for coercing JSON input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Real,
    Text,
    Boolean,
    Timestamp,
}

impl ColumnKind {
    /// SQL type name used in generated DDL
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnKind::Integer => "INTEGER",
            ColumnKind::Real => "REAL",
            ColumnKind::Text => "TEXT",
            ColumnKind::Boolean => "BOOLEAN",
            ColumnKind::Timestamp => "TIMESTAMP",
        }
    }
}

/// Column definition with SQL constraints
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    /// Column name
    pub name: &'static str,
    /// Storage class
    pub kind: ColumnKind,
    /// NOT NULL constraint
    pub not_null: bool,
    /// DEFAULT value (raw SQL)
    pub default_value: Option<&'static str>,
    /// Foreign key target (`REFERENCES <table>(id)`)
    pub references: Option<Table>,
    /// `ON DELETE CASCADE` on the foreign key
    pub cascade: bool,
}

impl ColumnDefinition {
    /// Create new nullable column definition
    pub const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            kind,
            not_null: false,
            default_value: None,
            references: None,
            cascade: false,
        }
    }

    /// Mark column as NOT NULL
    pub const fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Set DEFAULT value
    pub const fn default(mut self, value: &'static str) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Reference another table's `id`
    pub const fn references(mut self, table: Table) -> Self {
        self.references = Some(table);
        self
    }

    /// Delete this row when the referenced row is deleted
    pub const fn on_delete_cascade(mut self) -> Self {
        self.cascade = true;
        self
    }

    /// Column fragment for `CREATE TABLE`
    pub fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.kind.sql_type());
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = self.default_value {
            sql.push_str(&format!(" DEFAULT {}", default));
        }
        if let Some(target) = self.references {
            sql.push_str(&format!(" REFERENCES {}(id)", target.name()));
            if self.cascade {
                sql.push_str(" ON DELETE CASCADE");
            }
        }
        sql
    }
}

/// Raised when a table tag does not name a catalog table
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown table: {0}")]
pub struct UnknownTable(pub String);

/// Every table managed by the dashboard
///
/// Variants are listed parents-first so tables can be created in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Concerts,
    Artists,
    Songs,
    Setlists,
    Users,
    Banners,
    Genres,
    Md,
    #[serde(alias = "schedules")]
    Schedule,
    Cultures,
    Reports,
    ConcertComments,
    ConcertInfo,
    ConcertGenres,
    ConcertSetlists,
    SetlistSongs,
    HomeSections,
    SearchSections,
    HomeConcertSections,
    SearchConcertSections,
    Resignations,
}

use ColumnKind::{Boolean, Integer, Text, Timestamp};

const CREATED_AT: ColumnDefinition = ColumnDefinition::new("created_at", Timestamp)
    .not_null()
    .default("CURRENT_TIMESTAMP");
const UPDATED_AT: ColumnDefinition = ColumnDefinition::new("updated_at", Timestamp)
    .not_null()
    .default("CURRENT_TIMESTAMP");

impl Table {
    /// All tables, parents before children
    pub const ALL: [Table; 21] = [
        Table::Concerts,
        Table::Artists,
        Table::Songs,
        Table::Setlists,
        Table::Users,
        Table::Banners,
        Table::Genres,
        Table::Md,
        Table::Schedule,
        Table::Cultures,
        Table::Reports,
        Table::ConcertComments,
        Table::ConcertInfo,
        Table::ConcertGenres,
        Table::ConcertSetlists,
        Table::SetlistSongs,
        Table::HomeSections,
        Table::SearchSections,
        Table::HomeConcertSections,
        Table::SearchConcertSections,
        Table::Resignations,
    ];

    /// Table name in database
    pub fn name(self) -> &'static str {
        match self {
            Table::Concerts => "concerts",
            Table::Artists => "artists",
            Table::Songs => "songs",
            Table::Setlists => "setlists",
            Table::Users => "users",
            Table::Banners => "banners",
            Table::Genres => "genres",
            Table::Md => "md",
            Table::Schedule => "schedule",
            Table::Cultures => "cultures",
            Table::Reports => "reports",
            Table::ConcertComments => "concert_comments",
            Table::ConcertInfo => "concert_info",
            Table::ConcertGenres => "concert_genres",
            Table::ConcertSetlists => "concert_setlists",
            Table::SetlistSongs => "setlist_songs",
            Table::HomeSections => "home_sections",
            Table::SearchSections => "search_sections",
            Table::HomeConcertSections => "home_concert_sections",
            Table::SearchConcertSections => "search_concert_sections",
            Table::Resignations => "resignations",
        }
    }

    /// Editable and timestamp columns, excluding the `id` primary key
    pub fn columns(self) -> Vec<ColumnDefinition> {
        match self {
            Table::Concerts => vec![
                ColumnDefinition::new("code", Text),
                ColumnDefinition::new("title", Text).not_null(),
                ColumnDefinition::new("artist", Text),
                ColumnDefinition::new("artist_id", Integer),
                ColumnDefinition::new("status", Text).not_null().default("'UPCOMING'"),
                ColumnDefinition::new("start_date", Text),
                ColumnDefinition::new("end_date", Text),
                ColumnDefinition::new("poster", Text),
                ColumnDefinition::new("venue", Text),
                ColumnDefinition::new("ticket_site", Text),
                ColumnDefinition::new("ticket_url", Text),
                ColumnDefinition::new("label", Text),
                ColumnDefinition::new("introduction", Text),
                CREATED_AT,
                UPDATED_AT,
            ],
            Table::Artists => vec![
                ColumnDefinition::new("artist", Text).not_null(),
                ColumnDefinition::new("category", Text),
                ColumnDefinition::new("debut_date", Text),
                ColumnDefinition::new("keywords", Text),
                ColumnDefinition::new("instagram_url", Text),
                ColumnDefinition::new("img_url", Text),
                ColumnDefinition::new("detail", Text),
                CREATED_AT,
                UPDATED_AT,
            ],
            Table::Songs => vec![
                ColumnDefinition::new("title", Text).not_null(),
                ColumnDefinition::new("artist", Text),
                ColumnDefinition::new("youtube_id", Text),
                ColumnDefinition::new("img_url", Text),
                ColumnDefinition::new("lyrics", Text),
                ColumnDefinition::new("pronunciation", Text),
                ColumnDefinition::new("translation", Text),
                CREATED_AT,
                UPDATED_AT,
            ],
            Table::Setlists => vec![
                ColumnDefinition::new("title", Text).not_null(),
                ColumnDefinition::new("artist", Text),
                ColumnDefinition::new("start_date", Text),
                ColumnDefinition::new("end_date", Text),
                ColumnDefinition::new("venue", Text),
                ColumnDefinition::new("img_url", Text),
                CREATED_AT,
                UPDATED_AT,
            ],
            Table::Users => vec![
                ColumnDefinition::new("nickname", Text),
                ColumnDefinition::new("email", Text),
                ColumnDefinition::new("provider", Text).not_null().default("'kakao'"),
                ColumnDefinition::new("provider_id", Text),
                ColumnDefinition::new("interest_concert_id", Integer),
                ColumnDefinition::new("marketing_consent", Boolean).not_null().default("0"),
                ColumnDefinition::new("refresh_token", Text),
                CREATED_AT,
                UPDATED_AT,
            ],
            Table::Banners => vec![
                ColumnDefinition::new("title", Text),
                ColumnDefinition::new("category", Text),
                ColumnDefinition::new("content", Text),
                ColumnDefinition::new("img_url", Text),
                CREATED_AT,
                UPDATED_AT,
            ],
            Table::Genres => vec![ColumnDefinition::new("name", Text).not_null()],
            Table::Md => vec![
                ColumnDefinition::new("concert_id", Integer)
                    .not_null()
                    .references(Table::Concerts),
                ColumnDefinition::new("name", Text).not_null(),
                ColumnDefinition::new("price", Text),
                ColumnDefinition::new("img_url", Text),
                CREATED_AT,
                UPDATED_AT,
            ],
            Table::Schedule => vec![
                ColumnDefinition::new("concert_id", Integer)
                    .not_null()
                    .references(Table::Concerts),
                ColumnDefinition::new("category", Text).not_null(),
                ColumnDefinition::new("scheduled_at", Timestamp)
                    .not_null()
                    .default("CURRENT_TIMESTAMP"),
                ColumnDefinition::new("type", Text),
                CREATED_AT,
                UPDATED_AT,
            ],
            Table::Cultures => vec![
                ColumnDefinition::new("concert_id", Integer)
                    .not_null()
                    .references(Table::Concerts),
                ColumnDefinition::new("title", Text).not_null(),
                ColumnDefinition::new("content", Text).not_null(),
                ColumnDefinition::new("img_url", Text),
                CREATED_AT,
                UPDATED_AT,
            ],
            Table::Reports => vec![
                ColumnDefinition::new("comment_id", Integer),
                ColumnDefinition::new("comment_content", Text).not_null(),
                ColumnDefinition::new("comment_user_id", Integer).not_null(),
                ColumnDefinition::new("report_reason", Text),
                CREATED_AT,
                UPDATED_AT,
            ],
            Table::ConcertComments => vec![
                ColumnDefinition::new("concert_id", Integer)
                    .not_null()
                    .references(Table::Concerts),
                ColumnDefinition::new("user_id", Integer)
                    .not_null()
                    .references(Table::Users),
                ColumnDefinition::new("content", Text).not_null(),
                CREATED_AT,
                UPDATED_AT,
            ],
            Table::ConcertInfo => vec![
                ColumnDefinition::new("concert_id", Integer)
                    .not_null()
                    .references(Table::Concerts),
                ColumnDefinition::new("category", Text).not_null(),
                ColumnDefinition::new("content", Text).not_null(),
                ColumnDefinition::new("img_url", Text),
                CREATED_AT,
                UPDATED_AT,
            ],
            Table::ConcertGenres => vec![
                ColumnDefinition::new("concert_id", Integer)
                    .not_null()
                    .references(Table::Concerts),
                ColumnDefinition::new("concert_title", Text),
                ColumnDefinition::new("genre_id", Integer)
                    .not_null()
                    .references(Table::Genres),
                ColumnDefinition::new("name", Text),
            ],
            Table::ConcertSetlists => vec![
                ColumnDefinition::new("concert_id", Integer)
                    .not_null()
                    .references(Table::Concerts),
                ColumnDefinition::new("setlist_id", Integer)
                    .not_null()
                    .references(Table::Setlists),
                ColumnDefinition::new("type", Text).not_null().default("'EXPECTED'"),
                ColumnDefinition::new("status", Text).not_null().default("''"),
                ColumnDefinition::new("concert_title", Text),
                ColumnDefinition::new("setlist_title", Text),
                CREATED_AT,
                UPDATED_AT,
            ],
            Table::SetlistSongs => vec![
                ColumnDefinition::new("setlist_id", Integer)
                    .not_null()
                    .references(Table::Setlists),
                ColumnDefinition::new("song_id", Integer).references(Table::Songs),
                ColumnDefinition::new("order_index", Integer).not_null().default("0"),
                ColumnDefinition::new("setlist_date", Text),
                ColumnDefinition::new("setlist_title", Text),
                ColumnDefinition::new("song_title", Text),
                ColumnDefinition::new("fanchant", Text),
                ColumnDefinition::new("fanchant_point", Text),
                CREATED_AT,
                UPDATED_AT,
            ],
            Table::HomeSections | Table::SearchSections => vec![
                ColumnDefinition::new("section_title", Text).not_null(),
                ColumnDefinition::new("section_type", Text),
                UPDATED_AT,
            ],
            Table::HomeConcertSections => vec![
                ColumnDefinition::new("home_section_id", Integer)
                    .not_null()
                    .references(Table::HomeSections)
                    .on_delete_cascade(),
                ColumnDefinition::new("concert_id", Integer)
                    .not_null()
                    .references(Table::Concerts),
                ColumnDefinition::new("section_title", Text),
                ColumnDefinition::new("concert_title", Text),
                ColumnDefinition::new("sorted_index", Integer).not_null().default("0"),
                UPDATED_AT,
            ],
            Table::SearchConcertSections => vec![
                ColumnDefinition::new("search_section_id", Integer)
                    .not_null()
                    .references(Table::SearchSections)
                    .on_delete_cascade(),
                ColumnDefinition::new("concert_id", Integer)
                    .not_null()
                    .references(Table::Concerts),
                ColumnDefinition::new("section_title", Text),
                ColumnDefinition::new("concert_title", Text),
                ColumnDefinition::new("sorted_index", Integer).not_null().default("0"),
                UPDATED_AT,
            ],
            Table::Resignations => vec![
                ColumnDefinition::new("user_id", Integer),
                ColumnDefinition::new("content", Text),
                CREATED_AT,
            ],
        }
    }

    /// Look up a column by name (`id` is not part of the column list)
    pub fn column(self, name: &str) -> Option<ColumnDefinition> {
        self.columns().into_iter().find(|c| c.name == name)
    }

    /// True if `name` is `id` or a declared column
    pub fn has_column(self, name: &str) -> bool {
        name == "id" || self.column(name).is_some()
    }

    /// True if the table carries a `created_at` column
    pub fn has_created_at(self) -> bool {
        self.column("created_at").is_some()
    }

    /// True if the table carries an `updated_at` column
    pub fn has_updated_at(self) -> bool {
        self.column("updated_at").is_some()
    }

    /// `CREATE TABLE IF NOT EXISTS` statement for this table
    pub fn create_table_sql(self) -> String {
        let mut parts = vec!["id INTEGER PRIMARY KEY AUTOINCREMENT".to_string()];
        parts.extend(self.columns().iter().map(ColumnDefinition::to_sql));
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.name(),
            parts.join(", ")
        )
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Table {
    type Err = UnknownTable;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "schedules" {
            return Ok(Table::Schedule);
        }
        Table::ALL
            .iter()
            .copied()
            .find(|t| t.name() == s)
            .ok_or_else(|| UnknownTable(s.to_string()))
    }
}
