//! Error types for chatvault.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("History error: {0}")]
    History(#[from] HistoryError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("PostgreSQL error: {}", postgres_message(.0))]
    Postgres(#[from] tokio_postgres::Error),

    #[error("Pool creation error: {0}")]
    PoolCreate(#[from] deadpool_postgres::CreatePoolError),

    #[error("Pool runtime error: {0}")]
    PoolRuntime(#[from] deadpool_postgres::PoolError),
}

/// Server-reported message when there is one; tokio-postgres renders
/// those as a bare "db error".
fn postgres_message(err: &tokio_postgres::Error) -> String {
    match err.as_db_error() {
        Some(db) => format!("{} ({})", db.message(), db.code().code()),
        None => err.to_string(),
    }
}

/// Chat message history errors.
///
/// Operation failures name the operation that failed; the database error
/// is only reachable through [`std::error::Error::source`].
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("missing chat message history engine")]
    MissingEngine,

    #[error("table name must be provided")]
    MissingTable,

    #[error("session ID must be provided")]
    MissingSessionId,

    #[error("invalid {kind} identifier {name:?}: {reason}")]
    InvalidIdentifier {
        kind: &'static str,
        name: String,
        reason: &'static str,
    },

    #[error("table '{table}' does not exist in schema '{schema}'")]
    TableNotFound { schema: String, table: String },

    #[error("column '{column}' is missing in table '{table}'. Expected columns: {expected:?}")]
    MissingColumn {
        column: String,
        table: String,
        expected: Vec<String>,
    },

    #[error("error validating table {table}")]
    Validate {
        table: String,
        #[source]
        source: DatabaseError,
    },

    #[error("failed to initialize table {table}")]
    Initialize {
        table: String,
        #[source]
        source: DatabaseError,
    },

    #[error("failed to add messages to session {session_id}")]
    Add {
        session_id: String,
        #[source]
        source: DatabaseError,
    },

    #[error("failed to retrieve messages for session {session_id}")]
    Get {
        session_id: String,
        #[source]
        source: DatabaseError,
    },

    #[error("failed to clear session {session_id}")]
    Clear {
        session_id: String,
        #[source]
        source: DatabaseError,
    },
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
