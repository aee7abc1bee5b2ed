use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use platepick_core::error::CoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and [`sqlx::Error`] for persistence.
/// Implements [`IntoResponse`] to produce `{ "error", "code", "retryable" }`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `platepick_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

/// Status, stable error code, message, and whether a retry may succeed.
type Classified = (StatusCode, &'static str, String, bool);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, retryable) = match &self {
            AppError::Core(core) => classify_core_error(core),
            AppError::Database(err) => classify_sqlx_error(err),
        };

        let body = json!({
            "error": message,
            "code": code,
            "retryable": retryable,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Domain failures are local validation or state conflicts; none is retryable.
fn classify_core_error(err: &CoreError) -> Classified {
    let (status, code) = match err {
        CoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        CoreError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        CoreError::InvalidRankings(_) => (StatusCode::BAD_REQUEST, "INVALID_RANKINGS"),
        CoreError::NotParticipant => (StatusCode::FORBIDDEN, "NOT_PARTICIPANT"),
        CoreError::NotAuthorized => (StatusCode::FORBIDDEN, "NOT_AUTHORIZED"),
        CoreError::NotActive => (StatusCode::CONFLICT, "NOT_ACTIVE"),
        CoreError::AlreadyResolved => (StatusCode::CONFLICT, "ALREADY_RESOLVED"),
        CoreError::Expired => (StatusCode::GONE, "EXPIRED"),
        CoreError::EmptyCandidateSet => (StatusCode::UNPROCESSABLE_ENTITY, "EMPTY_CANDIDATE_SET"),
        CoreError::NoWinner => (StatusCode::UNPROCESSABLE_ENTITY, "NO_WINNER"),
        CoreError::NoVotes => (StatusCode::UNPROCESSABLE_ENTITY, "NO_VOTES"),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            return internal();
        }
    };
    (status, code, err.to_string(), false)
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Integrity constraint violations (SQLSTATE class 23) map to 409.
/// - Connection and pool failures map to 503 and are retryable.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> Classified {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
            false,
        ),
        sqlx::Error::Database(db_err)
            if db_err.code().is_some_and(|code| code.starts_with("23")) =>
        {
            let constraint = db_err.constraint().unwrap_or("unknown");
            tracing::warn!(error = %db_err, constraint, "Constraint violation");
            (
                StatusCode::CONFLICT,
                "CONFLICT",
                format!("Request conflicts with current data: {constraint}"),
                false,
            )
        }
        sqlx::Error::Database(_)
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => {
            tracing::error!(error = %err, "Transient database failure");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "TRANSIENT_FAILURE",
                "The service is temporarily unavailable, please retry".to_string(),
                true,
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}

fn internal() -> Classified {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
        false,
    )
}
