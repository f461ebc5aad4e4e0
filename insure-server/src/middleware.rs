//! API key middleware
//!
//! Mutating routes are wrapped with [`require_api_key`], parameterized by an
//! [`ApiKeyGuard`] naming the permissions the route needs.

use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use insure_core::auth::API_KEY_HEADER;
use insure_core::{authorize, AuthFailure, Permission, PolicyStore, RequiredPermissions};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Store handle plus the permissions a route requires
#[derive(Clone)]
pub struct ApiKeyGuard {
    store: Arc<PolicyStore>,
    required: RequiredPermissions,
}

impl ApiKeyGuard {
    /// Guard requiring every permission in `permissions`
    pub fn new(store: Arc<PolicyStore>, permissions: &[Permission]) -> Self {
        Self {
            store,
            required: RequiredPermissions::all_of(permissions),
        }
    }
}

impl From<AuthFailure> for ApiError {
    fn from(failure: AuthFailure) -> Self {
        match failure {
            AuthFailure::MissingKey => ApiError::Unauthorized(format!(
                "API key is required. Please provide {} header.",
                API_KEY_HEADER
            )),
            AuthFailure::UnknownKey => ApiError::Unauthorized("Invalid API key".to_string()),
            AuthFailure::InvalidKey => {
                ApiError::Unauthorized("Invalid or missing API key".to_string())
            }
            AuthFailure::InsufficientPermissions => ApiError::Forbidden(
                "Insufficient permissions for the requested operation".to_string(),
            ),
        }
    }
}

/// Reject the request unless it carries a valid key holding the guard's
/// permissions
pub async fn require_api_key(
    State(guard): State<ApiKeyGuard>,
    request: Request,
    next: Next,
) -> Response {
    // A header that is not visible ASCII can never match a stored key
    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        authorize(&guard.store, presented.as_deref(), &guard.required, Utc::now())
    }));

    let decision = match outcome {
        Ok(decision) => decision,
        Err(_) => {
            error!("API key check panicked");
            return ApiError::Internal(
                "An unexpected error occurred during authentication.".to_string(),
            )
            .into_response();
        }
    };

    match decision {
        Ok(check) => {
            debug!(permissions = ?check.permissions, "API key accepted");
            next.run(request).await
        }
        Err(failure) => {
            warn!(
                reason = failure.reason(),
                method = %request.method(),
                path = %request.uri().path(),
                "API key rejected"
            );
            crate::metrics::record_auth_failure(failure.reason());
            ApiError::from(failure).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request as HttpRequest, StatusCode};
    use axum::middleware::from_fn_with_state;
    use axum::routing::post;
    use axum::Router;
    use tower::ServiceExt;

    const FULL_KEY: &str = "RW50ZXIgdGhlIHRleHQgdG8gQmFzZTY0IEVuY29kZQm";
    const READ_ONLY_KEY: &str = "CkJhc2U2NCBFbmNvZGUKICAKRW50ZXIgdGhhdCB0aGF0";
    const EXPIRED_KEY: &str = "VGhlLWVhZ2xlLxZC02Nzg5MC1mZ2hpa2p0LWxqYW5l";
    const INACTIVE_KEY: &str = "Gb3JtYXR0ZIsIEpT04gQmXRpZmllciwgWE1FZpZXdlcg";

    fn test_app() -> Router {
        let store = Arc::new(PolicyStore::with_builtin_keys(vec![], vec![]));
        let guard = ApiKeyGuard::new(store, &[Permission::Write]);
        Router::new()
            .route("/guarded", post(|| async { "ok" }))
            .layer(from_fn_with_state(guard, require_api_key))
    }

    async fn call(key: Option<&str>) -> (StatusCode, serde_json::Value) {
        let mut builder = HttpRequest::builder().method("POST").uri("/guarded");
        if let Some(key) = key {
            builder = builder.header(API_KEY_HEADER, key);
        }
        let response = test_app()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn test_missing_key_is_unauthorized() {
        let (status, body) = call(None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "API key is required. Please provide x-api-key header.");
    }

    #[tokio::test]
    async fn test_empty_key_counts_as_missing() {
        let (status, body) = call(Some("")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "API key is required. Please provide x-api-key header.");
    }

    #[tokio::test]
    async fn test_unknown_key_is_unauthorized() {
        let (status, body) = call(Some("not-a-key")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid API key");
    }

    #[tokio::test]
    async fn test_inactive_and_expired_keys_are_unauthorized() {
        let (status, body) = call(Some(INACTIVE_KEY)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid or missing API key");

        let (status, _) = call(Some(EXPIRED_KEY)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_missing_permission_is_forbidden() {
        let (status, body) = call(Some(READ_ONLY_KEY)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["statusCode"], 403);
    }

    #[tokio::test]
    async fn test_valid_key_reaches_handler() {
        let (status, _) = call(Some(FULL_KEY)).await;
        assert_eq!(status, StatusCode::OK);
    }
}
