//! HTTP API handlers for livith-dash

pub mod auth;
pub mod drafts;
pub mod health;
pub mod records;
pub mod search;
pub mod sections;
pub mod setlists;

pub use auth::{auth_middleware, login, logout};
pub use drafts::{delete_draft, get_draft, put_draft, save_draft};
pub use health::{database_health, health_routes};
pub use records::{create_record, delete_record, get_record, list_records, update_record};
pub use search::{get_stats, search_records};
pub use sections::{get_section, sync_sections};
pub use setlists::create_setlist;
