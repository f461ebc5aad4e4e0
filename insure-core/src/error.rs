//! Error types for the policy store

use thiserror::Error;

/// Main error type for store and domain operations
#[derive(Error, Debug)]
pub enum InsureError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// A data source file exists but could not be read or parsed
    #[error("Failed to load data source {path}: {reason}")]
    DataSource { path: String, reason: String },

    /// A policy references a product that is not in the catalog
    #[error("Product {product_id} not found for policy {policy_id}")]
    DanglingProduct {
        policy_id: String,
        product_id: String,
    },

    /// Insert attempted with an id that is already taken
    #[error("Policy with ID {0} already exists")]
    DuplicatePolicyId(String),
}

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, InsureError>;
