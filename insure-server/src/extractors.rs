//! Custom extractors

use crate::error::ApiError;
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use insure_core::{validate_create, validate_update, NewPolicy, PolicyUpdate, ValidationErrors};
use serde_json::Value;
use tracing::debug;

/// A request body type with field-level validation rules
pub trait ValidatedBody: Sized {
    /// Check the raw JSON and build the typed body
    fn validate(body: &Value) -> Result<Self, ValidationErrors>;
}

impl ValidatedBody for NewPolicy {
    fn validate(body: &Value) -> Result<Self, ValidationErrors> {
        validate_create(body)
    }
}

impl ValidatedBody for PolicyUpdate {
    fn validate(body: &Value) -> Result<Self, ValidationErrors> {
        validate_update(body)
    }
}

/// JSON body that has passed validation.
///
/// Rejects with a single aggregated 400 before the handler runs.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: ValidatedBody,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<Value>::from_request(req, state).await?;

        match T::validate(&body) {
            Ok(value) => Ok(ValidatedJson(value)),
            Err(errors) => {
                debug!(errors = %errors, "Request body failed validation");
                crate::metrics::record_validation_failure();
                Err(ApiError::Validation(errors))
            }
        }
    }
}

/// Path parameters whose rejection renders as a JSON error body
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(ApiPath(value))
    }
}

/// Query string whose rejection renders as a JSON error body
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(ApiQuery(value))
    }
}
