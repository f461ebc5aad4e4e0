//! In-memory policy store
//!
//! Holds the policy list, the product catalog and the API keys for the
//! lifetime of the process. Collections are seeded once, either from JSON
//! files in a data directory or from values handed to [`PolicyStore::new`].
//!
//! Every method takes the store lock for its own duration only, so each
//! call is atomic on its own. [`PolicyStore::create_policy`] generates the
//! id and inserts under a single write lock.

use crate::auth::builtin_api_keys;
use crate::error::{InsureError, Result};
use crate::models::{ApiKey, NewPolicy, Policy, PolicyProduct, PolicyUpdate, Product};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// File name of the policy list inside the data directory
pub const POLICIES_FILE: &str = "policies.json";

/// File name of the product catalog inside the data directory
pub const PRODUCTS_FILE: &str = "products.json";

const POLICY_ID_PREFIX: &str = "pol_";

/// Process-wide store of policies, products and API keys
#[derive(Debug)]
pub struct PolicyStore {
    /// Mutable policy list, kept in insertion order
    policies: RwLock<Vec<Policy>>,
    /// Read-only product catalog
    products: Vec<Product>,
    /// Read-only key records
    api_keys: Vec<ApiKey>,
}

impl PolicyStore {
    /// Create a store from explicit collections
    pub fn new(policies: Vec<Policy>, products: Vec<Product>, api_keys: Vec<ApiKey>) -> Self {
        PolicyStore {
            policies: RwLock::new(policies),
            products,
            api_keys,
        }
    }

    /// Create a store from explicit policies and products, with the
    /// compiled-in API keys
    pub fn with_builtin_keys(policies: Vec<Policy>, products: Vec<Product>) -> Self {
        Self::new(policies, products, builtin_api_keys())
    }

    /// Load `policies.json` and `products.json` from `data_dir`.
    ///
    /// A missing file yields an empty collection. A file that exists but
    /// does not parse is an error.
    #[instrument(skip_all, fields(data_dir = %data_dir.as_ref().display()))]
    pub fn load(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let policies: Vec<Policy> = load_collection(&data_dir.join(POLICIES_FILE))?;
        let products: Vec<Product> = load_collection(&data_dir.join(PRODUCTS_FILE))?;

        info!(
            policies = policies.len(),
            products = products.len(),
            "Loaded data sources"
        );

        Ok(Self::with_builtin_keys(policies, products))
    }

    /// Find a policy by exact id
    pub fn find_policy_by_id(&self, id: &str) -> Option<Policy> {
        self.policies.read().iter().find(|p| p.id == id).cloned()
    }

    /// Find a product by exact id
    pub fn find_product_by_id(&self, id: &str) -> Option<Product> {
        self.products.iter().find(|p| p.id == id).cloned()
    }

    /// Case-insensitive substring search over customer names, in list order
    pub fn find_policies_by_customer_name(&self, text: &str) -> Vec<Policy> {
        let needle = text.to_lowercase();
        self.policies
            .read()
            .iter()
            .filter(|p| p.customer_name.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    /// Find an API key record by exact key
    pub fn find_api_key(&self, key: &str) -> Option<ApiKey> {
        self.api_keys.iter().find(|k| k.key == key).cloned()
    }

    /// Join a policy with its product.
    ///
    /// Returns `Ok(None)` when the policy does not exist and
    /// [`InsureError::DanglingProduct`] when its product is missing.
    pub fn find_policy_product_by_id(&self, id: &str) -> Result<Option<PolicyProduct>> {
        match self.find_policy_by_id(id) {
            Some(policy) => self.resolve(policy).map(Some),
            None => Ok(None),
        }
    }

    /// Attach the referenced product to a policy
    pub fn resolve(&self, policy: Policy) -> Result<PolicyProduct> {
        match self.find_product_by_id(&policy.product_id) {
            Some(product) => Ok(PolicyProduct { policy, product }),
            None => Err(InsureError::DanglingProduct {
                policy_id: policy.id,
                product_id: policy.product_id,
            }),
        }
    }

    /// Append a policy. Returns `false` if the id is already taken.
    pub fn insert_policy(&self, policy: Policy) -> bool {
        let mut policies = self.policies.write();
        if policies.iter().any(|p| p.id == policy.id) {
            return false;
        }
        policies.push(policy);
        true
    }

    /// Generate the next id and insert the new policy under one lock
    pub fn create_policy(&self, new: NewPolicy, created_at: String) -> Result<Policy> {
        let mut policies = self.policies.write();
        let id = next_policy_id(&policies);
        if policies.iter().any(|p| p.id == id) {
            return Err(InsureError::DuplicatePolicyId(id));
        }

        let policy = Policy::from_new(id, new, created_at);
        policies.push(policy.clone());
        debug!(policy_id = %policy.id, "Inserted policy");
        Ok(policy)
    }

    /// Merge a partial update into an existing policy. Returns `false` if
    /// the id is absent.
    pub fn update_policy(&self, id: &str, update: PolicyUpdate) -> bool {
        let mut policies = self.policies.write();
        match policies.iter_mut().find(|p| p.id == id) {
            Some(policy) => {
                policy.apply(update);
                true
            }
            None => false,
        }
    }

    /// Remove a policy. Returns `false` if the id is absent.
    pub fn delete_policy(&self, id: &str) -> bool {
        let mut policies = self.policies.write();
        match policies.iter().position(|p| p.id == id) {
            Some(index) => {
                policies.remove(index);
                true
            }
            None => false,
        }
    }

    /// The id the next created policy would receive
    pub fn generate_policy_id(&self) -> String {
        next_policy_id(&self.policies.read())
    }

    /// Snapshot of every policy, in list order
    pub fn policies(&self) -> Vec<Policy> {
        self.policies.read().clone()
    }

    /// The product catalog
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// The key records
    pub fn api_keys(&self) -> &[ApiKey] {
        &self.api_keys
    }

    /// Number of stored policies
    pub fn policy_count(&self) -> usize {
        self.policies.read().len()
    }

    /// Number of catalog products
    pub fn product_count(&self) -> usize {
        self.products.len()
    }
}

/// Numeric suffix of a `pol_NNN` id
pub fn policy_id_number(id: &str) -> Option<u64> {
    let digits = id.strip_prefix(POLICY_ID_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Successor of the highest `pol_NNN` id, zero-padded to three digits
pub fn next_policy_id(policies: &[Policy]) -> String {
    let max = policies
        .iter()
        .filter_map(|p| policy_id_number(&p.id))
        .max()
        .unwrap_or(0);
    format!("{}{:03}", POLICY_ID_PREFIX, max + 1)
}

fn load_collection<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        warn!(path = %path.display(), "Data source not found, starting empty");
        return Ok(Vec::new());
    }

    let data = std::fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|e| InsureError::DataSource {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}
