use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use database::DbError;
use enrollment::EnrollmentError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),
    #[error("Enrollment error: {0}")]
    Enrollment(#[from] EnrollmentError),
    #[error("Invalid request: {0}")]
    Validation(String),
}

/// A request body that is not valid JSON for the handler's payload type.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(status = %rejection.status(), "Rejected request body.");
        AppError::Validation(rejection.body_text())
    }
}

impl AppError {
    /// The status code and client-facing message for this error.
    ///
    /// Internal failures are logged here with their full cause; the client only
    /// ever sees a generic message for them.
    fn status_and_message(self) -> (StatusCode, String) {
        match self {
            AppError::Validation(message) => (StatusCode::BAD_REQUEST, message),
            AppError::Database(DbError::NotFound) => (
                StatusCode::NOT_FOUND,
                "The requested resource was not found".to_string(),
            ),
            AppError::Database(DbError::Duplicate(detail)) => {
                tracing::debug!(detail = %detail, "Unique constraint rejected a write.");
                (
                    StatusCode::CONFLICT,
                    "A record with the same unique key already exists".to_string(),
                )
            }
            AppError::Database(DbError::MissingReference(detail)) => {
                tracing::debug!(detail = %detail, "Foreign key rejected a write.");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "A referenced record does not exist".to_string(),
                )
            }
            AppError::Database(db_err) => {
                tracing::error!(error = ?db_err, "Database error.");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal database error occurred".to_string(),
                )
            }
            AppError::Enrollment(err) => match err {
                EnrollmentError::NotFound(message) => (StatusCode::NOT_FOUND, message),
                EnrollmentError::Conflict(message) => (StatusCode::CONFLICT, message),
                EnrollmentError::PreconditionFailed(message) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, message)
                }
                internal @ EnrollmentError::InternalFailure { .. } => {
                    tracing::error!(error = ?internal, "Enrollment failed.");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "The enrollment could not be completed".to_string(),
                    )
                }
            },
        }
    }
}

/// Converts our custom `AppError` into an HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = self.status_and_message();
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enrollment::StoreError;

    async fn body_of(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn business_rule_violations_keep_their_message() {
        let cases = [
            (
                EnrollmentError::NotFound("Subject 9 not found".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                EnrollmentError::Conflict("already enrolled".to_string()),
                StatusCode::CONFLICT,
            ),
            (
                EnrollmentError::PreconditionFailed("no capacity".to_string()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];

        for (err, expected) in cases {
            let message = err.to_string();
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), expected);
            assert_eq!(body_of(response).await["error"], message);
        }
    }

    #[tokio::test]
    async fn internal_failures_hide_their_cause() {
        let err = EnrollmentError::InternalFailure {
            context: "Failed to update subject capacity".to_string(),
            source: StoreError::UniqueViolation("secret detail".to_string()),
        };
        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_of(response).await;
        assert_eq!(body["error"], "The enrollment could not be completed");
    }

    #[tokio::test]
    async fn database_errors_map_to_client_statuses() {
        let not_found = AppError::from(DbError::NotFound).into_response();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let duplicate = AppError::from(DbError::Duplicate("users_email_key".to_string())).into_response();
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);

        let internal = AppError::from(DbError::ConnectionConfigError("x".to_string())).into_response();
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn validation_errors_are_bad_requests() {
        let response = AppError::Validation("name must not be empty".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_of(response).await["error"], "name must not be empty");
    }
}
