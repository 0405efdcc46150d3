//! Strongly-typed identifiers for tables and hooks.

use crate::newtype_string::define_identifier;

define_identifier! {
    /// Name of a versioned table, as used in the metadata store and as the
    /// directory name of its definition.
    pub struct TableName;
}

define_identifier! {
    /// Key of a hook in the hook registry.
    pub struct HookName;
}
