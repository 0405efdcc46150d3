//! schemata-core - Core library for Schemata
//!
//! This crate provides the value types shared by the migration engine and the
//! CLI: version identifiers and their comparator, table definition files,
//! project configuration, and the table dependency DAG.

pub mod config;
pub mod dag;
pub mod definition;
pub mod error;
mod newtype_string;
pub(crate) mod serde_helpers;
pub mod table_name;
pub mod version;

pub use config::{Config, DatabaseConfig, LayoutConfig, LockConfig, MetadataConfig};
pub use dag::TableDag;
pub use definition::{
    HookSpec, Requirement, RowStepDef, ScriptSpec, StepDef, TableDefinition,
};
pub use error::{CoreError, CoreResult};
pub use table_name::{HookName, TableName};
pub use version::{compare, Version, VersionOrder};
