//! Insure Core - policy records, the in-memory store, and API key checks
//!
//! This crate holds everything the HTTP service and the CLI share: the
//! domain model, the policy store, key validation and request-body rules.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod auth;
pub mod dates;
pub mod error;
pub mod integrity;
pub mod models;
pub mod store;
pub mod validation;

pub use auth::{authorize, check_api_key, AuthFailure, KeyCheck, KeyStatus, RequiredPermissions};
pub use error::{InsureError, Result};
pub use integrity::{check_store, Problem};
pub use models::{
    ApiKey, NewPolicy, Permission, Policy, PolicyProduct, PolicyStatus, PolicyUpdate, Product,
    ProductCategory,
};
pub use store::PolicyStore;
pub use validation::{validate_create, validate_update, ValidationErrors};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
