//! Tenant resolution.
//!
//! A tenant is one college, identified by the caller's email domain and
//! mapped to a single storage partition. All keys for one tenant share the
//! `TENANT#<domain>` prefix; nothing else about the tenant is stored.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

pub const TENANT_PREFIX: &str = "TENANT#";

/// Partition key of one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantKey(String);

impl TenantKey {
    pub fn from_domain(domain: &str) -> Self {
        Self(format!("{}{}", TENANT_PREFIX, domain.trim().to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the tenant partition key from a caller's email address.
/// Callers whose identity does not carry a usable domain are rejected.
pub fn resolve_tenant(caller_email: &str) -> EngineResult<TenantKey> {
    let email = caller_email.trim();
    let Some((local, domain)) = email.rsplit_once('@') else {
        return Err(EngineError::Validation(format!(
            "caller identity {:?} has no email domain",
            email
        )));
    };

    if local.is_empty()
        || domain.is_empty()
        || !domain.contains('.')
        || domain.chars().any(char::is_whitespace)
    {
        return Err(EngineError::Validation(format!(
            "caller identity {:?} has no resolvable email domain",
            email
        )));
    }

    Ok(TenantKey::from_domain(domain))
}
