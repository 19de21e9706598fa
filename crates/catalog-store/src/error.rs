use thiserror::Error;

/// Errors that can occur when interacting with the catalog store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored row could not be mapped onto the model.
    #[error("Corrupt row in {table}: {reason}")]
    CorruptRow { table: &'static str, reason: String },

    /// A referenced row does not exist.
    #[error("{entity} {id} does not exist")]
    MissingReference { entity: &'static str, id: i64 },
}

/// Result type for catalog store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
