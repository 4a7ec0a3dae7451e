use std::path::PathBuf;

use thiserror::Error;

/// entigen errors
#[derive(Error, Debug)]
pub enum EntigenError {
    #[error("Failed to connect to database: {0}")]
    Connection(String),

    #[error("Schema of database '{database}' is unavailable: {message}")]
    SchemaUnavailable { database: String, message: String },

    #[error("Tables do not exist: {}", .0.join(", "))]
    UnknownTable(Vec<String>),

    #[error("Table '{table}' no longer exists")]
    TableNotFound { table: String },

    #[error("Unsupported type '{data_type}' for column '{column}' of table '{table}'")]
    UnsupportedColumnType {
        table: String,
        column: String,
        data_type: String,
    },

    #[error("Failed to write {path:?} for table '{table}': {source}")]
    WriteFailure {
        table: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Tables {} all map to class '{class_name}'", .tables.join(", "))]
    DuplicateClassName {
        class_name: String,
        tables: Vec<String>,
    },

    #[error("Columns {} of table '{table}' all map to property '{property}'", .columns.join(", "))]
    DuplicatePropertyName {
        table: String,
        property: String,
        columns: Vec<String>,
    },

    #[error("Rendering failed for table '{table}': {message}")]
    Render { table: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EntigenError {
    /// Whether the error stops the whole run rather than a single table
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EntigenError::Connection(_)
                | EntigenError::SchemaUnavailable { .. }
                | EntigenError::UnknownTable(_)
                | EntigenError::Config(_)
        )
    }
}
