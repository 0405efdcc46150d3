//! Error types for schemata-engine

use crate::hooks::HookError;
use schemata_core::CoreError;
use schemata_db::DbError;
use thiserror::Error;

/// Migration engine errors.
///
/// Every variant is fatal for the sweep that raised it; the first error aborts
/// the remaining tables.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The metadata table does not exist in the target database (E001).
    #[error("[E001] Metadata table '{table}' does not exist; create it before running migrations")]
    MetadataTableMissing { table: String },

    /// A schema source is not laid out as expected (E002).
    #[error("[E002] Invalid schema source {path}: {reason}")]
    InvalidSource { path: String, reason: String },

    /// An explicitly referenced script does not exist (E003).
    #[error("[E003] Script for table '{table}' not found: {path}")]
    ScriptNotFound { table: String, path: String },

    /// A definition references a hook nobody registered (E004).
    #[error("[E004] Table '{table}' references unknown {kind} hook '{hook}'")]
    UnknownHook {
        table: String,
        kind: &'static str,
        hook: String,
    },

    /// The recorded version is newer than any configured step (E005).
    #[error("[E005] Table '{table}' is at version {current}, newer than its latest configured version {latest}")]
    VersionAhead {
        table: String,
        current: String,
        latest: String,
    },

    /// The table exists but the metadata table has no version for it (E006).
    #[error("[E006] Table '{table}' exists but has no version recorded in '{metadata_table}'")]
    MetadataMissing {
        table: String,
        metadata_table: String,
    },

    /// A step ran but the metadata still reports an older version (E007).
    #[error("[E007] Step {step} of table '{table}' did not record its version (metadata reports {recorded})")]
    VersionNotRecorded {
        table: String,
        step: String,
        recorded: String,
    },

    /// The replaced table still exists after the replacement ran (E008).
    #[error("[E008] Replacement of '{old}' by '{table}' did not remove '{old}'")]
    ReplacementIncomplete { table: String, old: String },

    /// A hard dependency has no definition in any source (E009).
    #[error("[E009] Table '{table}' depends on '{dependency}', which has no definition")]
    MissingDependency { table: String, dependency: String },

    /// A dependency was updated but still does not meet the requirement (E010).
    #[error("[E010] Table '{table}' requires '{dependency}' at {required}, but it is at {actual}")]
    UnsatisfiedDependency {
        table: String,
        dependency: String,
        required: String,
        actual: String,
    },

    /// A requirement points back at a table whose update is in progress (E011).
    #[error("[E011] Circular dependency: '{table}' requires '{dependency}', which is still being updated")]
    CircularDependency { table: String, dependency: String },

    /// A hook returned an error (E012).
    #[error("[E012] Hook '{hook}' failed for table '{table}': {source}")]
    Hook {
        table: String,
        hook: String,
        #[source]
        source: HookError,
    },

    /// An earlier update of this table in the same run failed (E013).
    #[error("[E013] Table '{table}' already failed to update in this run")]
    PreviousFailure { table: String },

    /// A fetched row breaks the row-version contract (E014).
    #[error("[E014] Row migration {step} of table '{table}': {reason}")]
    RowContract {
        table: String,
        step: String,
        reason: String,
    },

    /// Another sweep holds the advisory lock (E015).
    #[error("[E015] Migration lock '{name}' is held by {holder}; run `schemata unlock` if it is stale")]
    LockHeld { name: String, holder: String },

    /// Database error (E016).
    #[error(transparent)]
    Db(#[from] DbError),

    /// Definition, config or version error (E017).
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type alias for EngineError
pub type EngineResult<T> = Result<T, EngineError>;
