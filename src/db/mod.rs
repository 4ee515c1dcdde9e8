//! Database module: models and schema for persistent storage.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for initializing the database (SQLite)
//! - `sqlite.rs`: `LedgerStorage`, every query the application issues

pub mod models;
pub mod schema;
pub mod sqlite;

pub use models::{NewObject, ObjectId, ObjectSummary, Place, PlaceHit, PlaceId, SearchHit};
pub use schema::SQLITE_INIT;
pub use sqlite::{LedgerStorage, SqlitePool, connect};
