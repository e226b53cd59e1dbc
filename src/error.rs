//! Error types for Legal Navigator.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The stored revision no longer matches the one the caller acted on.
    #[error("Conversation {id} changed concurrently: expected revision {expected}")]
    Conflict { id: String, expected: u64 },
}

/// Errors raised while processing one conversation turn.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("Storage failed during turn: {0}")]
    Storage(#[from] DatabaseError),

    #[error("Conversation state is out of date (revision {revision})")]
    StaleState { revision: u64 },
}

impl TurnError {
    /// Lift a storage error, surfacing revision conflicts as stale state.
    pub fn from_storage(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Conflict { expected, .. } => Self::StaleState { revision: expected },
            other => Self::Storage(other),
        }
    }
}

/// PDF rendering errors.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Failed to write PDF stream: {0}")]
    Write(#[from] std::io::Error),
}
