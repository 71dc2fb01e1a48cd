//! # Livith Common Library
//!
//! Shared code for the Livith content dashboard including:
//! - Table catalog (the single source of truth for the schema)
//! - Database initialization and schema synchronization
//! - Configuration loading
//! - Session/password helpers and the JSON response envelope

pub mod api;
pub mod config;
pub mod db;
pub mod error;

pub use db::catalog::{ColumnKind, Table, UnknownTable};
pub use error::{Error, Result};
