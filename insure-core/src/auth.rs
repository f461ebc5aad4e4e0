//! API key authentication and permission checks

use crate::dates::parse_iso8601;
use crate::models::{ApiKey, Permission};
use crate::store::PolicyStore;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt;

/// Header carrying the raw API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Outcome of validating a presented key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyCheck {
    /// Whether the key may be used
    pub valid: bool,
    /// Capabilities granted by the key (empty when invalid)
    pub permissions: BTreeSet<Permission>,
}

impl KeyCheck {
    fn invalid() -> Self {
        Self::default()
    }
}

/// Validate a key: non-empty, known, active, and not expired at `now`.
///
/// An expiry that does not parse is treated as expired.
pub fn check_api_key(store: &PolicyStore, key: &str, now: DateTime<Utc>) -> KeyCheck {
    if key.trim().is_empty() {
        return KeyCheck::invalid();
    }

    let record = match store.find_api_key(key) {
        Some(record) if record.is_active => record,
        _ => return KeyCheck::invalid(),
    };

    match parse_iso8601(&record.expires_at) {
        Some(expires_at) if expires_at >= now => KeyCheck {
            valid: true,
            permissions: record.permissions,
        },
        _ => KeyCheck::invalid(),
    }
}

/// The set of permissions an operation requires
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequiredPermissions(BTreeSet<Permission>);

impl RequiredPermissions {
    /// Require every permission in `permissions`
    pub fn all_of(permissions: &[Permission]) -> Self {
        RequiredPermissions(permissions.iter().copied().collect())
    }

    /// Require nothing beyond a valid key
    pub fn none() -> Self {
        Self::default()
    }

    /// Allow if every required permission is granted
    pub fn is_satisfied_by(&self, granted: &BTreeSet<Permission>) -> bool {
        self.0.is_subset(granted)
    }
}

/// Reason a request was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No key header was sent, or it was empty
    MissingKey,
    /// The key is not in the store
    UnknownKey,
    /// The key is inactive, expired, or blank
    InvalidKey,
    /// The key is valid but lacks a required permission
    InsufficientPermissions,
}

impl AuthFailure {
    /// Short label for logs and metrics
    pub fn reason(&self) -> &'static str {
        match self {
            AuthFailure::MissingKey => "missing_key",
            AuthFailure::UnknownKey => "unknown_key",
            AuthFailure::InvalidKey => "invalid_key",
            AuthFailure::InsufficientPermissions => "insufficient_permissions",
        }
    }
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// Run the full authentication and authorization sequence for one request
pub fn authorize(
    store: &PolicyStore,
    presented: Option<&str>,
    required: &RequiredPermissions,
    now: DateTime<Utc>,
) -> Result<KeyCheck, AuthFailure> {
    let key = presented
        .filter(|key| !key.is_empty())
        .ok_or(AuthFailure::MissingKey)?;

    if store.find_api_key(key).is_none() {
        return Err(AuthFailure::UnknownKey);
    }

    let check = check_api_key(store, key, now);
    if !check.valid {
        return Err(AuthFailure::InvalidKey);
    }

    if !required.is_satisfied_by(&check.permissions) {
        return Err(AuthFailure::InsufficientPermissions);
    }

    Ok(check)
}

/// Computed state of a key at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    /// Usable
    Active,
    /// Switched off
    Inactive,
    /// Past its expiry
    Expired,
}

impl KeyStatus {
    /// Classify a key record at `now`
    pub fn of(key: &ApiKey, now: DateTime<Utc>) -> Self {
        if !key.is_active {
            return KeyStatus::Inactive;
        }
        match parse_iso8601(&key.expires_at) {
            Some(expires_at) if expires_at >= now => KeyStatus::Active,
            _ => KeyStatus::Expired,
        }
    }
}

impl fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyStatus::Active => "active",
            KeyStatus::Inactive => "inactive",
            KeyStatus::Expired => "expired",
        };
        f.write_str(name)
    }
}

fn key(
    key: &str,
    created_at: &str,
    expires_at: &str,
    is_active: bool,
    permissions: &[Permission],
) -> ApiKey {
    ApiKey {
        key: key.to_string(),
        created_at: created_at.to_string(),
        expires_at: expires_at.to_string(),
        is_active,
        permissions: permissions.iter().copied().collect(),
    }
}

/// The compiled-in key records
pub fn builtin_api_keys() -> Vec<ApiKey> {
    use Permission::{Delete, Read, Write};

    vec![
        key(
            "VGhlLWVhZ2xlLxZC02Nzg5MC1mZ2hpa2p0LWxqYW5l",
            "2024-12-01T00:00:00Z",
            "2025-04-01T00:00:00Z",
            true,
            &[Read, Write, Delete],
        ),
        key(
            "RW50ZXIgdGhlIHRleHQgdG8gQmFzZTY0IEVuY29kZQm",
            "2024-01-01T00:00:00Z",
            "2100-06-01T00:00:00Z",
            true,
            &[Read, Write, Delete],
        ),
        key(
            "CkJhc2U2NCBFbmNvZGUKICAKRW50ZXIgdGhhdCB0aGF0",
            "2025-02-01T00:00:00Z",
            "2100-08-01T00:00:00Z",
            true,
            &[Read],
        ),
        key(
            "Gb3JtYXR0ZIsIEpT04gQmXRpZmllciwgWE1FZpZXdlcg",
            "2025-01-01T00:00:00Z",
            "2026-01-01T00:00:00Z",
            false,
            &[Read, Write, Delete],
        ),
    ]
}
