//! Consistency checks over a loaded store
//!
//! The server loads data files as-is. These checks report records that
//! would surface as 500s or that validation would have refused.

use crate::dates::is_strictly_after;
use crate::store::{policy_id_number, PolicyStore};
use std::collections::HashSet;
use std::fmt;

/// One integrity problem found in the data
#[derive(Debug, Clone, PartialEq)]
pub enum Problem {
    /// Two or more policies share an id
    DuplicateId(String),
    /// The id does not follow the `pol_NNN` pattern
    MalformedId(String),
    /// The referenced product is not in the catalog
    DanglingProduct {
        /// Policy holding the reference
        policy_id: String,
        /// Missing product id
        product_id: String,
    },
    /// End date is not strictly after start date, or either does not parse
    InvalidDates {
        /// Affected policy
        policy_id: String,
        /// Stored start date
        start_date: String,
        /// Stored end date
        end_date: String,
    },
    /// Premium is zero or negative
    NonPositivePremium {
        /// Affected policy
        policy_id: String,
        /// Stored premium
        premium: f64,
    },
}

impl Problem {
    /// Policy the problem is attached to
    pub fn policy_id(&self) -> &str {
        match self {
            Problem::DuplicateId(id) | Problem::MalformedId(id) => id,
            Problem::DanglingProduct { policy_id, .. }
            | Problem::InvalidDates { policy_id, .. }
            | Problem::NonPositivePremium { policy_id, .. } => policy_id,
        }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Problem::DuplicateId(id) => write!(f, "{}: duplicate policy id", id),
            Problem::MalformedId(id) => write!(f, "{}: id does not match pol_NNN", id),
            Problem::DanglingProduct {
                policy_id,
                product_id,
            } => write!(f, "{}: product {} not found", policy_id, product_id),
            Problem::InvalidDates {
                policy_id,
                start_date,
                end_date,
            } => write!(
                f,
                "{}: end date {} is not after start date {}",
                policy_id, end_date, start_date
            ),
            Problem::NonPositivePremium { policy_id, premium } => {
                write!(f, "{}: premium {} is not positive", policy_id, premium)
            }
        }
    }
}

/// Check every policy in the store, in store order
pub fn check_store(store: &PolicyStore) -> Vec<Problem> {
    let mut problems = Vec::new();
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();

    for policy in store.policies() {
        if !seen.insert(policy.id.clone()) && reported.insert(policy.id.clone()) {
            problems.push(Problem::DuplicateId(policy.id.clone()));
        }

        if policy_id_number(&policy.id).is_none() {
            problems.push(Problem::MalformedId(policy.id.clone()));
        }

        if store.find_product_by_id(&policy.product_id).is_none() {
            problems.push(Problem::DanglingProduct {
                policy_id: policy.id.clone(),
                product_id: policy.product_id.clone(),
            });
        }

        if !is_strictly_after(&policy.start_date, &policy.end_date) {
            problems.push(Problem::InvalidDates {
                policy_id: policy.id.clone(),
                start_date: policy.start_date.clone(),
                end_date: policy.end_date.clone(),
            });
        }

        if policy.premium <= 0.0 || policy.premium.is_nan() {
            problems.push(Problem::NonPositivePremium {
                policy_id: policy.id.clone(),
                premium: policy.premium,
            });
        }
    }

    problems
}
