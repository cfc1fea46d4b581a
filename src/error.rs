//! Error types for schema loading, transformation and bulk loading.

use thiserror::Error;

/// Main error type for smelter operations.
#[derive(Error, Debug)]
pub enum SmelterError {
    /// Malformed schema specification (bad column entry, missing table, ...)
    #[error("Schema parse error: {0}")]
    SchemaParse(String),

    /// Namespace has no mapping in the catalog
    #[error("No mapping for namespace: {0}")]
    SchemaNotFound(String),

    /// An input record is not a document (e.g. a bare scalar or array)
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// The sink reported a failure during or after a copy session.
    /// `stage` names the COPY step; `source` is the sink's own error.
    #[error("Bulk load failed for table {table}: {stage}: {source}")]
    BulkLoad {
        table: String,
        stage: &'static str,
        #[source]
        source: Box<SmelterError>,
    },

    /// A shared sink was poisoned by a panic in another holder
    #[error("Sink lock poisoned by a previous failure")]
    SinkPoisoned,

    /// PostgreSQL connection or statement error
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] postgres::Error),

    /// IO error (file operations, script output)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SmelterError {
    /// Create a SchemaParse error
    pub fn schema_parse(message: impl Into<String>) -> Self {
        SmelterError::SchemaParse(message.into())
    }

    /// Wrap a sink error with the table and COPY stage it came from
    pub fn bulk_load(table: impl Into<String>, stage: &'static str, source: SmelterError) -> Self {
        SmelterError::BulkLoad {
            table: table.into(),
            stage,
            source: Box::new(source),
        }
    }

    /// The PostgreSQL error behind this one, if any.
    ///
    /// Looks through `BulkLoad` wrapping, so callers can inspect the SQLSTATE
    /// of a failed copy and decide whether to retry.
    pub fn postgres_error(&self) -> Option<&postgres::Error> {
        match self {
            SmelterError::Postgres(e) => Some(e),
            SmelterError::BulkLoad { source, .. } => source.postgres_error(),
            _ => None,
        }
    }
}

/// Result type alias for smelter operations.
pub type Result<T> = std::result::Result<T, SmelterError>;
