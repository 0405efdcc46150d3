//! Error types for schemata-core

use thiserror::Error;

/// Core error type for Schemata
#[derive(Error, Debug)]
pub enum CoreError {
    /// S001: Configuration file not found
    #[error("[S001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// S002: Failed to parse configuration file
    #[error("[S002] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// S003: Invalid configuration value
    #[error("[S003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// S004: Version identifier cannot be parsed
    #[error("[S004] Invalid version '{value}': {reason}")]
    InvalidVersion { value: String, reason: String },

    /// S005: Table definition file could not be parsed
    #[error("[S005] Failed to parse table definition {path}: {details}")]
    DefinitionParse { path: String, details: String },

    /// S006: Table definition is structurally invalid
    #[error("[S006] Invalid definition for table '{table}': {reason}")]
    DefinitionInvalid { table: String, reason: String },

    /// S007: Circular dependency detected
    #[error("[S007] Circular dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    /// S008: Empty table name
    #[error("[S008] Empty table name in {context}")]
    EmptyName { context: String },

    /// S009: IO error with file path context
    #[error("[S009] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// S010: IO error
    #[error("[S010] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// S011: YAML parse error
    #[error("[S011] YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
