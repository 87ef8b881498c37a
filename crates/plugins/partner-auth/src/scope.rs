//! Scopes and the authenticated partner identity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{PartnerAuthError, PartnerAuthResult};

/// A permission granted to an API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Read,
    Write,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Read => "read",
            Scope::Write => "write",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "read" => Ok(Scope::Read),
            "write" => Ok(Scope::Write),
            other => Err(format!("unknown scope: {other}")),
        }
    }
}

/// An authenticated partner, as seen by downstream handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartnerIdentity {
    pub partner_id: String,
    pub key_id: String,
    pub scopes: Vec<Scope>,
    pub rate_limit_per_minute: u32,
}

impl PartnerIdentity {
    /// Builds an identity from stored scope names. Unknown names are ignored.
    pub fn new(
        partner_id: impl Into<String>,
        key_id: impl Into<String>,
        scopes: &[String],
        rate_limit_per_minute: u32,
    ) -> Self {
        let mut parsed = Vec::new();
        for scope in scopes.iter().filter_map(|s| s.parse::<Scope>().ok()) {
            if !parsed.contains(&scope) {
                parsed.push(scope);
            }
        }
        Self {
            partner_id: partner_id.into(),
            key_id: key_id.into(),
            scopes: parsed,
            rate_limit_per_minute,
        }
    }

    pub fn has_scope(&self, scope: Scope) -> bool {
        self.scopes.contains(&scope)
    }

    /// Fails with `InsufficientScope` unless the key was granted `scope`.
    pub fn require(&self, scope: Scope) -> PartnerAuthResult<()> {
        if self.has_scope(scope) {
            Ok(())
        } else {
            Err(PartnerAuthError::InsufficientScope(scope))
        }
    }
}
