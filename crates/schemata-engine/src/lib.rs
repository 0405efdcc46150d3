//! schemata-engine - Table migration engine
//!
//! This crate applies versioned table migrations: it discovers table
//! definitions in schema source roots, orders tables by their dependencies,
//! runs structural steps and replacements, and applies row-level migrations.
//! Scripts record each table's version in the metadata table; the engine only
//! reads it.

pub mod error;
pub mod hooks;
pub mod lock;
pub mod options;
pub mod registry;
pub mod source;
pub mod table;
#[doc(hidden)]
pub mod test_utils;

pub use error::{EngineError, EngineResult};
pub use hooks::{
    HookContext, HookError, HookRegistry, HookResult, RowApplyFn, RowContext, RowFetchFn,
    TableHookFn,
};
pub use lock::MigrationLock;
pub use options::RegistryOptions;
pub use registry::{ListOptions, RowReport, SchemaRegistry, TableReport, TagMatch};
pub use source::SchemaSource;
pub use table::{TableSchema, TableState};
