use crate::error::AppError;
use axum::extract::FromRequest;

/// `axum::Json`, but a body that fails to parse is answered like every other
/// client error: a 400 with an `{ "error": ... }` body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
