//! API request and response types

use insure_core::PolicyProduct;
use serde::{Deserialize, Serialize};

/// Service name reported by the health check
pub const HEALTH_SERVICE_NAME: &str = "insure-api health check";

/// Query parameters for the customer-name search
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    /// Case-insensitive substring of the customer name
    pub customer_name: Option<String>,
}

/// Body of every error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Short error title
    pub error: String,

    /// Human-readable explanation
    pub message: String,

    /// HTTP status code, repeated in the body
    pub status_code: u16,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `OK` while the process serves requests
    pub status: String,

    /// Time of the check (RFC 3339)
    pub timestamp: String,

    /// Service name
    pub service: String,

    /// Uptime in seconds
    pub uptime_seconds: u64,

    /// Number of stored policies
    pub policies: usize,

    /// Number of catalog products
    pub products: usize,
}

/// A list of policies with their products
pub type PolicyProductList = Vec<PolicyProduct>;
