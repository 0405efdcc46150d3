//! schemata-db - Database capability for Schemata
//!
//! This crate provides the `Database` trait the migration engine consumes and
//! its DuckDB implementation, plus the transaction helper and the advisory
//! lock used around migration sweeps.

pub mod duckdb;
pub mod error;
pub mod traits;
pub mod transaction;

pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use traits::{Database, Row};
pub use transaction::{manages_transaction, script_manages_transaction, with_transaction};
