//! CRM database layer
//!
//! sqlx/Postgres repositories and the unit-of-work abstraction used by the
//! mutation engine.

pub mod db;

pub use db::*;

/// Migrations shipped with the workspace (`migrations/` at the repository root)
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");
