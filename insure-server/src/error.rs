//! Error types for the HTTP API

use crate::api::ErrorBody;
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use insure_core::{InsureError, ValidationErrors};
use std::any::Any;
use std::fmt;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    /// Business rule rejected the request (400)
    BadRequest(String),

    /// A required path or query parameter is blank or missing (400)
    MissingParameter {
        /// Label used in the error title, e.g. "Policy ID"
        label: &'static str,
        /// Parameter name as it appears in the request
        parameter: &'static str,
    },

    /// Field validation failed (400)
    Validation(ValidationErrors),

    /// Request body is not valid JSON (400)
    InvalidJson(String),

    /// Missing or invalid API key (401)
    Unauthorized(String),

    /// Key lacks a required permission (403)
    Forbidden(String),

    /// No policy with this id on lookup (404)
    PolicyNotFound(String),

    /// No policy with this id to update or delete (404)
    UnknownPolicy(String),

    /// No route for this method and path (404)
    RouteNotFound {
        /// HTTP method
        method: String,
        /// Request path
        path: String,
    },

    /// Internal server error (500); the message is safe to show clients
    Internal(String),

    /// Store error that escaped a handler (500)
    Store(InsureError),
}

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_)
            | ApiError::MissingParameter { .. }
            | ApiError::Validation(_)
            | ApiError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::PolicyNotFound(_)
            | ApiError::UnknownPolicy(_)
            | ApiError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Internal(_) | ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for metrics
    fn kind(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::MissingParameter { .. } => "missing_parameter",
            ApiError::Validation(_) => "validation",
            ApiError::InvalidJson(_) => "invalid_json",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::PolicyNotFound(_) | ApiError::UnknownPolicy(_) => "policy_not_found",
            ApiError::RouteNotFound { .. } => "route_not_found",
            ApiError::Internal(_) => "internal_error",
            ApiError::Store(_) => "store_error",
        }
    }

    /// Render into the wire body
    pub fn to_body(&self) -> ErrorBody {
        let (error, message) = match self {
            ApiError::BadRequest(msg) => ("Bad Request".to_string(), msg.clone()),
            ApiError::MissingParameter { label, parameter } => (
                format!("{} is required", label),
                format!("Missing required parameter '{}'", parameter),
            ),
            ApiError::Validation(errors) => ("Validation Error".to_string(), errors.to_string()),
            ApiError::InvalidJson(msg) => {
                ("Bad Request".to_string(), format!("Invalid JSON: {}", msg))
            }
            ApiError::Unauthorized(msg) => ("Unauthorized".to_string(), msg.clone()),
            ApiError::Forbidden(msg) => ("Forbidden".to_string(), msg.clone()),
            ApiError::PolicyNotFound(id) => (
                "Policy not found".to_string(),
                format!("Policy with ID {} not found", id),
            ),
            ApiError::UnknownPolicy(id) => (
                "Not Found".to_string(),
                format!("Policy with ID {} not found", id),
            ),
            ApiError::RouteNotFound { method, path } => (
                "Not Found".to_string(),
                format!("Route {} {} not found", method, path),
            ),
            ApiError::Internal(msg) => ("Internal Server Error".to_string(), msg.clone()),
            ApiError::Store(_) => (
                "Internal Server Error".to_string(),
                "An unexpected error occurred".to_string(),
            ),
        };

        ErrorBody {
            error,
            message,
            status_code: self.status_code().as_u16(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::MissingParameter { parameter, .. } => {
                write!(f, "Missing parameter: {}", parameter)
            }
            ApiError::Validation(errors) => write!(f, "Validation failed: {}", errors),
            ApiError::InvalidJson(msg) => write!(f, "Invalid JSON: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::PolicyNotFound(id) | ApiError::UnknownPolicy(id) => {
                write!(f, "Policy not found: {}", id)
            }
            ApiError::RouteNotFound { method, path } => {
                write!(f, "Route not found: {} {}", method, path)
            }
            ApiError::Internal(msg) => write!(f, "Internal error: {}", msg),
            ApiError::Store(e) => write!(f, "Store error: {}", e),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<InsureError> for ApiError {
    fn from(err: InsureError) -> Self {
        ApiError::Store(err)
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidJson(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Store(e) = &self {
            tracing::error!(error = %e, "Unhandled store error");
        }
        crate::metrics::record_error(self.kind());

        (self.status_code(), Json(self.to_body())).into_response()
    }
}

/// Response for a handler that panicked
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    tracing::error!(panic = %detail, "Handler panicked");

    ApiError::Internal("An unexpected error occurred".to_string()).into_response()
}
