//! Database module: the local SQLite file that backs every page.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for initializing the database
//! - `sqlite.rs`: per-request storage handle and form queries
//! - `report.rs`: dimension filters, summaries and pivots

pub mod models;
pub mod report;
pub mod schema;
pub mod sqlite;

pub use models::{NewPurchase, Project, Purchase};
pub use report::Dimension;
pub use schema::SQLITE_INIT;
pub use sqlite::{ExpenseStorage, Lookup, SqlitePool};
