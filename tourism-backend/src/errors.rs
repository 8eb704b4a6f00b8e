//! API error type shared by controllers and services
//!
//! Every error renders as `{"success": false, "error": "..."}`; validation
//! failures additionally carry the per-field `details`.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::validation::FieldError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("{} not found", what))
    }

    pub fn field(field: &str, message: &str) -> Self {
        ApiError::Validation(vec![FieldError::new(field, message)])
    }
}

/// Convenience `Result` type
pub type ApiResult<T> = Result<T, ApiError>;

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Database(_) | ApiError::Io(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        match self {
            ApiError::Validation(details) => HttpResponse::build(status).json(json!({
                "success": false,
                "error": "Validation failed",
                "details": details,
            })),
            ApiError::Database(_) | ApiError::Io(_) | ApiError::Internal(_) => {
                log::error!("Request failed: {}", self);
                HttpResponse::build(status).json(json!({
                    "success": false,
                    "error": "Internal server error",
                }))
            }
            _ => HttpResponse::build(status).json(json!({
                "success": false,
                "error": self.to_string(),
            })),
        }
    }
}

fn has_extended_code(err: &rusqlite::Error, codes: &[i32]) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if codes.contains(&e.extended_code))
}

pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    has_extended_code(
        err,
        &[
            rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
            rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY,
        ],
    )
}

pub fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    has_extended_code(err, &[rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY])
}

/// Map a unique-constraint violation to a 409, leaving other database errors alone
pub fn conflict_on_unique(err: rusqlite::Error, message: &str) -> ApiError {
    if is_unique_violation(&err) {
        ApiError::Conflict(message.to_string())
    } else {
        ApiError::Database(err)
    }
}

/// Handler for JSON body errors: malformed input is a 400, not actix's default text body
pub fn json_error_handler(
    err: actix_web::error::JsonPayloadError,
    _req: &actix_web::HttpRequest,
) -> actix_web::Error {
    log::debug!("Rejected JSON payload: {}", err);
    ApiError::BadRequest(format!("Invalid JSON body: {}", err)).into()
}

/// Handler for query string errors
pub fn query_error_handler(
    err: actix_web::error::QueryPayloadError,
    _req: &actix_web::HttpRequest,
) -> actix_web::Error {
    ApiError::BadRequest(format!("Invalid query string: {}", err)).into()
}
