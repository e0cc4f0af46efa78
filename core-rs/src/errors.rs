//! Error types for the migration engine

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("Error parsing graph at line {line}, column {column}: {message}")]
    Parse {
        line: u64,
        column: u64,
        message: String,
    },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("\nerror executing migration statement: {forward}\n\nRollback done successfully!!!")]
    MigrationRolledBack { forward: String },

    #[error("\nerror executing migration statement: {forward}\n\nRollback done partially: error executing rollback statement: {rollback}")]
    MigrationPartiallyRolledBack { forward: String, rollback: String },

    #[error("Invalid migration: {0}")]
    InvalidMigration(String),

    #[error("version not found ({0})")]
    VersionNotFound(String),

    #[error("{0}")]
    FileNotFound(String),

    #[error("directory not found ('{0}')")]
    DirectoryNotFound(String),

    #[error("invalid git repository ('{0}')")]
    InvalidRepository(String),

    #[error("no migration found")]
    NoMigrationFound,

    #[error("Config error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Process error: {0}")]
    Process(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrateError {
    /// True for the two failures raised after a forward script was attempted.
    pub fn is_migration_failure(&self) -> bool {
        matches!(
            self,
            MigrateError::MigrationRolledBack { .. }
                | MigrateError::MigrationPartiallyRolledBack { .. }
        )
    }
}

impl From<oxigraph::store::StorageError> for MigrateError {
    fn from(err: oxigraph::store::StorageError) -> Self {
        MigrateError::Store(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MigrateError>;
