//! livith-dash library - content dashboard for the Livith concert catalog
//!
//! Generic record editing over the table catalog, batch saves of edited
//! grids, the setlist composer and home/search section curation.

use std::sync::Arc;

use axum::Router;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod composer;
pub mod draft;
pub mod error;
pub mod pagination;
pub mod reconcile;
pub mod records;
pub mod row;
pub mod save;
pub mod search;
pub mod sections;
pub mod stats;
pub mod store;

use api::auth::Sessions;
use draft::DraftStore;
use store::{RecordStore, SqliteStore};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Record store over `db`
    pub store: Arc<dyn RecordStore>,
    /// Pending change-set between edits and a successful save
    pub drafts: Arc<dyn DraftStore>,
    /// Live admin sessions
    pub sessions: Sessions,
    /// `None` disables login
    pub admin_password: Option<String>,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, drafts: Arc<dyn DraftStore>, admin_password: Option<String>) -> Self {
        Self {
            store: Arc::new(SqliteStore::new(db.clone())),
            db,
            drafts,
            sessions: Sessions::default(),
            admin_password,
        }
    }
}

/// Build application router
///
/// `/health` and `/api/auth/*` are public; everything else requires a
/// session cookie.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    // Static segments take priority over `/dashboard/:table`
    let protected = Router::new()
        .route("/api/health/db", get(api::database_health))
        .route("/dashboard/stats", get(api::get_stats))
        .route("/dashboard/search", get(api::search_records))
        .route("/dashboard/create-setlist", post(api::create_setlist))
        .route("/dashboard/sync-sections", post(api::sync_sections))
        .route("/dashboard/sections/:kind/:id", get(api::get_section))
        .route(
            "/dashboard/draft",
            get(api::get_draft).put(api::put_draft).delete(api::delete_draft),
        )
        .route("/dashboard/save", post(api::save_draft))
        .route(
            "/dashboard/:table",
            get(api::list_records).post(api::create_record),
        )
        .route(
            "/dashboard/:table/:id",
            get(api::get_record)
                .put(api::update_record)
                .delete(api::delete_record),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    let public = Router::new()
        .route("/api/auth/login", post(api::login))
        .route("/api/auth/logout", post(api::logout))
        .merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
