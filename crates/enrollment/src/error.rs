use thiserror::Error;

/// Errors raised by a transactional store implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A uniqueness constraint rejected a write.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// Any other failure of the underlying store (connection, I/O, timeout, ...).
    #[error("Store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl StoreError {
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StoreError::Backend(Box::new(err))
    }
}

/// The failure taxonomy surfaced to callers of the enrollment coordinator.
///
/// The first three variants are business-rule violations and carry a message
/// that is safe to show to an end user. `InternalFailure` wraps everything
/// else; its message only names the step that failed and the store error is
/// kept as the `source` for diagnostics.
#[derive(Error, Debug)]
pub enum EnrollmentError {
    #[error("{0}")]
    PreconditionFailed(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{context}")]
    InternalFailure {
        context: String,
        #[source]
        source: StoreError,
    },
}

impl EnrollmentError {
    /// Builds a closure that wraps a store error with the given context,
    /// for use with `map_err`.
    pub(crate) fn internal(context: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| EnrollmentError::InternalFailure {
            context: context.to_string(),
            source,
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, EnrollmentError::InternalFailure { .. })
    }
}
