//! Registry options derived from the project configuration.

use schemata_core::{Config, LayoutConfig, LockConfig, MetadataConfig, Version};

/// Settings a [`SchemaRegistry`](crate::SchemaRegistry) runs with.
#[derive(Debug, Clone)]
pub struct RegistryOptions {
    /// Metadata table and column names
    pub metadata: MetadataConfig,
    /// Version of a table that declares no steps
    pub default_version: Version,
    /// Source root layout
    pub layout: LayoutConfig,
    /// Row-version column used when a table sets no `vercolumn`
    pub row_version_column: String,
    /// Wrap each step in a transaction
    pub transactional: bool,
    /// Advisory lock around sweeps
    pub lock: LockConfig,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            metadata: MetadataConfig::default(),
            default_version: Version::Known("1.0".to_string()),
            layout: LayoutConfig::default(),
            row_version_column: "row_version".to_string(),
            transactional: true,
            lock: LockConfig::default(),
        }
    }
}

impl RegistryOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            metadata: config.metadata.clone(),
            default_version: config.default_version.clone(),
            layout: config.layout.clone(),
            row_version_column: config.row_version_column.clone(),
            transactional: config.transactional,
            lock: config.lock.clone(),
        }
    }
}
