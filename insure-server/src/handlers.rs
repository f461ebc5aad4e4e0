//! HTTP request handlers

use crate::api::{HealthResponse, PolicyProductList, SearchParams, HEALTH_SERVICE_NAME};
use crate::error::{ApiError, ApiResult};
use crate::extractors::{ApiPath, ApiQuery, ValidatedJson};
use crate::state::AppState;
use crate::tracing::{policy_span, record_failure, record_outcome};
use axum::{
    extract::State,
    http::{Method, StatusCode, Uri},
    Json,
};
use insure_core::dates::{is_strictly_after, now_timestamp};
use insure_core::{NewPolicy, PolicyProduct, PolicyStore, PolicyUpdate};
use serde_json::Value;
use tracing::{debug, error, info, warn};

const END_BEFORE_START: &str = "End date must be after start date";

/// Reject a blank id; the id itself is looked up untrimmed
fn require_id(id: &str) -> ApiResult<&str> {
    if id.trim().is_empty() {
        return Err(ApiError::MissingParameter {
            label: "Policy ID",
            parameter: "id",
        });
    }
    Ok(id)
}

fn require_product(store: &PolicyStore, product_id: &str) -> ApiResult<()> {
    if store.find_product_by_id(product_id).is_none() {
        warn!(product_id = %product_id, "Unknown product referenced");
        record_failure("unknown_product");
        return Err(ApiError::BadRequest(format!(
            "Product with ID {} not found",
            product_id
        )));
    }
    Ok(())
}

/// Get a policy with its product
pub async fn get_policy(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<PolicyProduct>> {
    let id = require_id(&id)?;

    policy_span("get", id).in_scope(|| {
        debug!("Fetching policy");
        match state.store.find_policy_product_by_id(id) {
            Ok(Some(found)) => {
                record_outcome("found");
                Ok(Json(found))
            }
            Ok(None) => {
                record_failure("not_found");
                Err(ApiError::PolicyNotFound(id.to_string()))
            }
            Err(e) => {
                error!(error = %e, "Policy references a missing product");
                record_failure("dangling_product");
                Err(ApiError::Internal("Associated product not found".to_string()))
            }
        }
    })
}

/// Search policies by customer name
pub async fn search_policies(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> ApiResult<Json<PolicyProductList>> {
    let name = match params.customer_name.as_deref() {
        Some(name) if !name.is_empty() => name,
        _ => {
            return Err(ApiError::MissingParameter {
                label: "Customer name",
                parameter: "customerName",
            })
        }
    };

    let matches = state.store.find_policies_by_customer_name(name);
    debug!(query = %name, matches = matches.len(), "Customer name search");

    let resolved = matches
        .into_iter()
        .map(|policy| state.store.resolve(policy))
        .collect::<Result<PolicyProductList, _>>()
        .map_err(|e| {
            error!(error = %e, "Search hit a policy with a missing product");
            ApiError::Internal("Failed to retrieve policies".to_string())
        })?;

    Ok(Json(resolved))
}

/// Create a policy from a validated body
pub async fn create_policy(
    State(state): State<AppState>,
    ValidatedJson(new): ValidatedJson<NewPolicy>,
) -> ApiResult<(StatusCode, Json<PolicyProduct>)> {
    let store = &state.store;

    policy_span("create", "").in_scope(|| {
        require_product(store, &new.product_id)?;

        if !is_strictly_after(&new.start_date, &new.end_date) {
            record_failure("invalid_dates");
            return Err(ApiError::BadRequest(END_BEFORE_START.to_string()));
        }

        let policy = store.create_policy(new, now_timestamp()).map_err(|e| {
            error!(error = %e, "Failed to insert policy");
            record_failure("insert_failed");
            ApiError::Internal("Failed to create policy".to_string())
        })?;

        tracing::Span::current().record("policy_id", policy.id.as_str());
        let created = store.resolve(policy).map_err(|e| {
            error!(error = %e, "Created policy has no product");
            ApiError::Internal("Failed to create policy".to_string())
        })?;

        info!(policy_id = %created.policy.id, customer = %created.policy.customer_name, "Policy created");
        crate::metrics::record_mutation("create");
        record_outcome("created");
        Ok((StatusCode::CREATED, Json(created)))
    })
}

/// Apply a partial update to a policy
pub async fn update_policy(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ValidatedJson(update): ValidatedJson<PolicyUpdate>,
) -> ApiResult<Json<PolicyProduct>> {
    let id = require_id(&id)?;
    let store = &state.store;

    policy_span("update", id).in_scope(|| {
        let existing = store.find_policy_by_id(id).ok_or_else(|| {
            record_failure("not_found");
            ApiError::UnknownPolicy(id.to_string())
        })?;

        if let Some(product_id) = &update.product_id {
            require_product(store, product_id)?;
        }

        if update.changes_dates() {
            let start = update.start_date.as_deref().unwrap_or(existing.start_date.as_str());
            let end = update.end_date.as_deref().unwrap_or(existing.end_date.as_str());
            if !is_strictly_after(start, end) {
                record_failure("invalid_dates");
                return Err(ApiError::BadRequest(END_BEFORE_START.to_string()));
            }
        }

        if !store.update_policy(id, update) {
            error!("Policy disappeared before the update was applied");
            record_failure("update_failed");
            return Err(ApiError::Internal("Failed to update policy".to_string()));
        }

        let updated = match store.find_policy_product_by_id(id) {
            Ok(Some(updated)) => updated,
            Ok(None) => {
                error!("Policy disappeared after the update");
                return Err(ApiError::Internal(
                    "Failed to retrieve updated policy".to_string(),
                ));
            }
            Err(e) => {
                error!(error = %e, "Updated policy references a missing product");
                return Err(ApiError::Internal(
                    "Failed to retrieve updated policy".to_string(),
                ));
            }
        };

        info!("Policy updated");
        crate::metrics::record_mutation("update");
        record_outcome("updated");
        Ok(Json(updated))
    })
}

/// Delete a policy
pub async fn delete_policy(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    let id = require_id(&id)?;
    let store = &state.store;

    policy_span("delete", id).in_scope(|| {
        if store.find_policy_by_id(id).is_none() {
            record_failure("not_found");
            return Err(ApiError::UnknownPolicy(id.to_string()));
        }

        if !store.delete_policy(id) {
            error!("Policy disappeared before it could be deleted");
            record_failure("delete_failed");
            return Err(ApiError::Internal("Failed to delete policy".to_string()));
        }

        info!("Policy deleted");
        crate::metrics::record_mutation("delete");
        record_outcome("deleted");
        Ok(StatusCode::NO_CONTENT)
    })
}

/// Health check
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        timestamp: now_timestamp(),
        service: HEALTH_SERVICE_NAME.to_string(),
        uptime_seconds: state.uptime_seconds(),
        policies: state.store.policy_count(),
        products: state.store.product_count(),
    })
}

/// Prometheus metrics endpoint
pub async fn metrics(State(state): State<AppState>) -> String {
    crate::metrics::update_store_metrics(state.store.policy_count(), state.store.product_count());
    crate::metrics::get_prometheus_metrics()
}

/// OpenAPI document
pub async fn api_docs() -> Json<Value> {
    Json(crate::openapi::document())
}

/// Fallback for unrouted requests
pub async fn route_not_found(method: Method, uri: Uri) -> ApiError {
    debug!(method = %method, path = %uri.path(), "No route");
    ApiError::RouteNotFound {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
}
