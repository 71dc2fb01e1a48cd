//! Database catalog, initialization and schema sync

pub mod catalog;
pub mod init;
pub mod schema_sync;

pub use init::*;
