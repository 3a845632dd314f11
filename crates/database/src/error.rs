use enrollment::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to load environment variables for database connection: {0}")]
    ConnectionConfigError(String),

    #[error("Database query failed: {0}")]
    QueryError(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("A record with the same unique key already exists: {0}")]
    Duplicate(String),

    #[error("A referenced record does not exist: {0}")]
    MissingReference(String),

    #[error("The requested data was not found in the database.")]
    NotFound,
}

/// Classifies a raw `sqlx` error, pulling constraint violations out into
/// their own variants so callers can report them as client errors.
pub(crate) fn classify(err: sqlx::Error) -> DbError {
    match &err {
        sqlx::Error::RowNotFound => DbError::NotFound,
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            DbError::Duplicate(db.message().to_string())
        }
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            DbError::MissingReference(db.message().to_string())
        }
        _ => DbError::QueryError(err),
    }
}

/// Maps a `sqlx` error raised inside an enrollment transaction onto the
/// store error contract.
pub(crate) fn store_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::UniqueViolation(db.message().to_string())
        }
        _ => StoreError::backend(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_row_is_not_found() {
        assert!(matches!(classify(sqlx::Error::RowNotFound), DbError::NotFound));
    }

    #[test]
    fn other_errors_stay_query_errors() {
        assert!(matches!(classify(sqlx::Error::PoolTimedOut), DbError::QueryError(_)));
        assert!(matches!(store_error(sqlx::Error::PoolTimedOut), StoreError::Backend(_)));
    }
}
