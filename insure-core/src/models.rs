//! Domain records: policies, products and API keys

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Lifecycle status of a policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyStatus {
    /// Policy is in force
    #[default]
    Active,
    /// Policy ran past its end date
    Expired,
    /// Policy was cancelled before its end date
    Cancelled,
}

impl PolicyStatus {
    /// Every accepted status, in display order
    pub const ALL: [PolicyStatus; 3] = [
        PolicyStatus::Active,
        PolicyStatus::Expired,
        PolicyStatus::Cancelled,
    ];

    /// Wire name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyStatus::Active => "active",
            PolicyStatus::Expired => "expired",
            PolicyStatus::Cancelled => "cancelled",
        }
    }

    /// Parse a wire name (exact, lowercase)
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }
}

impl fmt::Display for PolicyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Insurable product category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductCategory {
    /// Home and contents
    Home,
    /// Cars and motorbikes
    Motor,
    /// Pets
    Pet,
    /// Travel
    Travel,
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProductCategory::Home => "home",
            ProductCategory::Motor => "motor",
            ProductCategory::Pet => "pet",
            ProductCategory::Travel => "travel",
        };
        f.write_str(name)
    }
}

/// An insurance contract for one customer and one product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// Policy identifier (`pol_NNN`)
    pub id: String,
    /// Product this policy covers
    pub product_id: String,
    /// Insured customer
    pub customer_name: String,
    /// Cover start (ISO-8601)
    pub start_date: String,
    /// Cover end (ISO-8601), strictly after `start_date`
    pub end_date: String,
    /// Premium amount, always positive
    pub premium: f64,
    /// Lifecycle status
    pub status: PolicyStatus,
    /// Creation timestamp
    pub created_at: String,
}

impl Policy {
    /// Build a policy from a validated creation request
    pub fn from_new(id: String, new: NewPolicy, created_at: String) -> Self {
        Policy {
            id,
            product_id: new.product_id,
            customer_name: new.customer_name,
            start_date: new.start_date,
            end_date: new.end_date,
            premium: new.premium,
            status: new.status.unwrap_or_default(),
            created_at,
        }
    }

    /// Merge the provided fields over this record. The id never changes.
    pub fn apply(&mut self, update: PolicyUpdate) {
        if let Some(product_id) = update.product_id {
            self.product_id = product_id;
        }
        if let Some(customer_name) = update.customer_name {
            self.customer_name = customer_name;
        }
        if let Some(start_date) = update.start_date {
            self.start_date = start_date;
        }
        if let Some(end_date) = update.end_date {
            self.end_date = end_date;
        }
        if let Some(premium) = update.premium {
            self.premium = premium;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
    }
}

/// Catalog entry describing an insurable product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Product identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Category
    pub category: ProductCategory,
    /// Free-text description
    pub description: String,
    /// Base price before underwriting
    pub base_price: f64,
    /// Creation timestamp
    pub created_at: String,
}

/// A policy with its product resolved, as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyProduct {
    /// Policy fields, flattened into the top level
    #[serde(flatten)]
    pub policy: Policy,
    /// The referenced product
    pub product: Product,
}

/// Validated body of a creation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPolicy {
    /// Product to cover; must exist in the catalog
    pub product_id: String,
    /// Insured customer, 2 to 100 characters
    pub customer_name: String,
    /// Cover start
    pub start_date: String,
    /// Cover end
    pub end_date: String,
    /// Premium, greater than zero
    pub premium: f64,
    /// Initial status, `active` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PolicyStatus>,
}

/// Validated body of a partial update.
///
/// `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct PolicyUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub premium: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PolicyStatus>,
}

impl PolicyUpdate {
    /// Whether the update touches either cover date
    pub fn changes_dates(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some()
    }
}

/// Capability granted to an API key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Read policies
    Read,
    /// Create and update policies
    Write,
    /// Delete policies
    Delete,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Permission::Read => "read",
            Permission::Write => "write",
            Permission::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// A bearer credential accepted in the `x-api-key` header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    /// Raw key value
    pub key: String,
    /// Issue timestamp
    pub created_at: String,
    /// Expiry timestamp
    pub expires_at: String,
    /// Whether the key may be used at all
    pub is_active: bool,
    /// Granted capabilities
    #[serde(default)]
    pub permissions: BTreeSet<Permission>,
}
