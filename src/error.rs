use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Error surfaced by the data-access layer and handlers.
///
/// Absence of a row is modelled as `Option::None` by the repos; `NotFound`
/// exists so handlers (and ownership-checked writes) can turn that absence
/// into a response without inventing per-module error types.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Input rejected before any write was attempted.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Unique or foreign-key constraint violation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The entity does not exist, or is not owned by the acting user.
    #[error("not found")]
    NotFound,

    /// Anything else the store reported.
    #[error("database error: {0}")]
    Database(sqlx::Error),

    /// Infrastructure failure outside the store (hashing, token signing).
    #[error("internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::RowNotFound = e {
            return ApiError::NotFound;
        }
        if let sqlx::Error::Database(db) = &e {
            if let Some(code) = db.code() {
                match code.as_ref() {
                    // unique_violation, foreign_key_violation
                    "23505" | "23503" => {
                        let constraint = db.constraint().unwrap_or("constraint").to_string();
                        return ApiError::Conflict(constraint);
                    }
                    // check_violation
                    "23514" => {
                        let constraint = db.constraint().unwrap_or("check").to_string();
                        return ApiError::Validation(format!("violates {constraint}"));
                    }
                    _ => {}
                }
            }
        }
        ApiError::Database(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Database(e) => {
                tracing::error!(error = %e, "database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };
        let body = json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err = ApiError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, ApiError::NotFound));
    }

    #[test]
    fn other_sqlx_errors_stay_database() {
        let err = ApiError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, ApiError::Database(_)));
    }
}
