//! API error types with HTTP response mapping.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request (ids, bodies, query strings).
    BadRequest(String),
    /// Missing or invalid credentials.
    Unauthorized(String),
    /// Authenticated but not allowed.
    Forbidden(String),
    /// Resource not found.
    NotFound(String),
    /// Domain logic error.
    Domain(DomainError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = serde_json::json!({ "success": false, "message": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    match &err {
        DomainError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        DomainError::InvalidInput(_) | DomainError::EmptyCart => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        DomainError::Conflict(_) | DomainError::InvalidStatusTransition { .. } => {
            (StatusCode::CONFLICT, err.to_string())
        }
        DomainError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, err.to_string()),
        DomainError::Repository(_) => {
            tracing::error!(error = %err, "storage failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: impl Into<ApiError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_domain_status_codes() {
        assert_eq!(
            status_of(DomainError::NotFound {
                entity: "Cart",
                key: "x".to_string()
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_of(DomainError::EmptyCart), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(DomainError::InvalidInput("bad".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(DomainError::Conflict("stale".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(DomainError::InvalidStatusTransition {
                from: domain::OrderStatus::Delivered,
                to: domain::OrderStatus::Pending,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(DomainError::Unauthorized("no".to_string())),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(
            status_of(ApiError::Forbidden("admins only".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(ApiError::Internal("boom".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
