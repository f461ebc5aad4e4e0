//! Insure HTTP Server - REST API over the policy store
//!
//! Reads are open; creating, updating and deleting policies need an
//! `x-api-key` header carrying a key with the matching permission.

pub mod api;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod openapi;
pub mod state;
pub mod tracing;

pub use api::{ErrorBody, HealthResponse, SearchParams};
pub use config::{LogFormat, ServerConfig};
pub use error::{ApiError, ApiResult};
pub use middleware::ApiKeyGuard;
pub use state::AppState;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
    Router,
};
use insure_core::Permission;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Build the application router
pub fn app(state: AppState) -> Router {
    let write_guard = ApiKeyGuard::new(state.store.clone(), &[Permission::Write]);
    let delete_guard = ApiKeyGuard::new(state.store.clone(), &[Permission::Delete]);

    let collection = get(handlers::search_policies)
        .merge(
            post(handlers::create_policy)
                .layer(from_fn_with_state(write_guard.clone(), middleware::require_api_key)),
        )
        .fallback(handlers::route_not_found);

    let item = get(handlers::get_policy)
        .merge(
            put(handlers::update_policy)
                .layer(from_fn_with_state(write_guard, middleware::require_api_key)),
        )
        .merge(
            delete(handlers::delete_policy)
                .layer(from_fn_with_state(delete_guard, middleware::require_api_key)),
        )
        .fallback(handlers::route_not_found);

    Router::new()
        .route("/policies", collection)
        .route("/policies/:id", item)
        .route("/health", get(handlers::health))
        .route("/api-docs", get(handlers::api_docs))
        .route("/metrics", get(handlers::metrics))
        .route_layer(from_fn(metrics::track_requests))
        .fallback(handlers::route_not_found)
        .with_state(state)
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(CatchPanicLayer::custom(error::handle_panic))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use insure_core::{Policy, PolicyStatus, PolicyStore, Product, ProductCategory};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const FULL_KEY: &str = "RW50ZXIgdGhlIHRleHQgdG8gQmFzZTY0IEVuY29kZQm";
    const READ_ONLY_KEY: &str = "CkJhc2U2NCBFbmNvZGUKICAKRW50ZXIgdGhhdCB0aGF0";

    fn product(id: &str) -> Product {
        Product {
            id: id.to_string(),
            name: "Pet Cover".to_string(),
            category: ProductCategory::Pet,
            description: "Vet bills".to_string(),
            base_price: 120.0,
            created_at: "2024-01-01T00:00:00.000Z".to_string(),
        }
    }

    fn policy(id: &str, product_id: &str, customer: &str) -> Policy {
        Policy {
            id: id.to_string(),
            product_id: product_id.to_string(),
            customer_name: customer.to_string(),
            start_date: "2025-01-01".to_string(),
            end_date: "2026-01-01".to_string(),
            premium: 99.5,
            status: PolicyStatus::Active,
            created_at: "2024-12-01T00:00:00.000Z".to_string(),
        }
    }

    fn test_app() -> Router {
        let store = PolicyStore::with_builtin_keys(
            vec![
                policy("pol_001", "prod_pet", "Hannah Davis"),
                policy("pol_002", "prod_gone", "Orphan Owner"),
            ],
            vec![product("prod_pet")],
        );
        app(AppState::new(store))
    }

    async fn send(
        router: &Router,
        method: &str,
        uri: &str,
        key: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(key) = key {
            builder = builder.header("x-api-key", key);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_get_policy_joins_product() {
        let router = test_app();
        let (status, body) = send(&router, "GET", "/policies/pol_001", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "pol_001");
        assert_eq!(body["product"]["id"], "prod_pet");
    }

    #[tokio::test]
    async fn test_dangling_product_is_internal_error() {
        let router = test_app();
        let (status, body) = send(&router, "GET", "/policies/pol_002", None, None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Associated product not found");

        let (status, _) = send(&router, "GET", "/policies?customerName=orphan", None, None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_blank_id_is_bad_request() {
        let router = test_app();
        let (status, body) = send(&router, "GET", "/policies/%20", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Policy ID is required");
    }

    #[tokio::test]
    async fn test_padded_id_is_not_trimmed() {
        let router = test_app();
        let (status, body) = send(&router, "GET", "/policies/%20pol_001", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Policy with ID  pol_001 not found");
    }

    #[tokio::test]
    async fn test_undecodable_id_is_json_bad_request() {
        let router = test_app();
        let (status, body) = send(&router, "GET", "/policies/%FF", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Bad Request");
        assert_eq!(body["statusCode"], 400);
        assert!(body["message"].as_str().unwrap().contains("UTF-8"));
    }

    #[tokio::test]
    async fn test_repeated_query_field_is_json_bad_request() {
        let router = test_app();
        let (status, body) =
            send(&router, "GET", "/policies?customerName=a&customerName=b", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Bad Request");
        assert!(body["message"].as_str().unwrap().contains("customerName"));
    }

    #[tokio::test]
    async fn test_unknown_policy_titles() {
        let router = test_app();
        let (status, body) = send(&router, "GET", "/policies/pol_999", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Policy not found");

        let (status, body) = send(
            &router,
            "PUT",
            "/policies/pol_999",
            Some(FULL_KEY),
            Some(json!({ "premium": 10 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not Found");
        assert_eq!(body["message"], "Policy with ID pol_999 not found");

        let (status, body) = send(&router, "DELETE", "/policies/pol_999", Some(FULL_KEY), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not Found");
        assert_eq!(body["message"], "Policy with ID pol_999 not found");
    }

    #[tokio::test]
    async fn test_empty_search_is_bad_request() {
        let router = test_app();
        let (status, body) = send(&router, "GET", "/policies?customerName=", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Customer name is required");
    }

    #[tokio::test]
    async fn test_auth_runs_before_validation() {
        let router = test_app();
        let (status, _) = send(&router, "POST", "/policies", None, Some(json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) =
            send(&router, "POST", "/policies", Some(READ_ONLY_KEY), Some(json!({}))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) =
            send(&router, "POST", "/policies", Some(FULL_KEY), Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Validation Error");
    }

    #[tokio::test]
    async fn test_create_then_delete() {
        let router = test_app();
        let draft = json!({
            "productId": "prod_pet",
            "customerName": "New Customer",
            "startDate": "2025-03-01",
            "endDate": "2026-03-01",
            "premium": "75.25"
        });

        let (status, created) = send(&router, "POST", "/policies", Some(FULL_KEY), Some(draft)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["id"], "pol_003");
        assert_eq!(created["status"], "active");
        assert_eq!(created["premium"], 75.25);

        let (status, _) = send(&router, "DELETE", "/policies/pol_003", Some(FULL_KEY), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&router, "DELETE", "/policies/pol_003", Some(FULL_KEY), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_rejects_dates_against_stored_start() {
        let router = test_app();
        let (status, body) = send(
            &router,
            "PUT",
            "/policies/pol_001",
            Some(FULL_KEY),
            Some(json!({ "endDate": "2024-06-01" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "End date must be after start date");
    }

    #[tokio::test]
    async fn test_public_reads_ignore_keys() {
        let router = test_app();
        let (status, _) = send(&router, "GET", "/policies/pol_001", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unrouted_requests_get_json_404() {
        let router = test_app();
        let (status, body) = send(&router, "GET", "/claims", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not Found");
        assert_eq!(body["message"], "Route GET /claims not found");

        let (status, body) = send(&router, "PATCH", "/policies/pol_001", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Route PATCH /policies/pol_001 not found");
    }

    #[tokio::test]
    async fn test_health_and_docs() {
        let router = test_app();
        let (status, body) = send(&router, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "OK");
        assert_eq!(body["service"], "insure-api health check");

        let (status, body) = send(&router, "GET", "/api-docs", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["openapi"], "3.0.3");
    }
}
