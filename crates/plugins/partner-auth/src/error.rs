//! Partner authentication errors.

use first_rule_core::StoreError;
use thiserror::Error;

use crate::scope::Scope;

/// Result type for partner authentication.
pub type PartnerAuthResult<T> = Result<T, PartnerAuthError>;

/// Why a partner request was refused.
#[derive(Debug, Error)]
pub enum PartnerAuthError {
    #[error("Missing API key")]
    MissingKey,

    #[error("Invalid API key")]
    InvalidKey,

    #[error("API key is inactive")]
    InactiveKey,

    #[error("API key expired")]
    ExpiredKey,

    #[error("Partner account is not active")]
    InactivePartner,

    #[error("Insufficient permissions: {0} scope required")]
    InsufficientScope(Scope),

    #[error("Rate limit exceeded")]
    RateLimited { retry_after_secs: u64 },

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl PartnerAuthError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingKey
            | Self::InvalidKey
            | Self::InactiveKey
            | Self::ExpiredKey
            | Self::InactivePartner => 401,
            Self::InsufficientScope(_) => 403,
            Self::RateLimited { .. } => 429,
            Self::Storage(_) => 500,
        }
    }

    /// Returns a short message that is safe to send to the caller.
    pub fn public_message(&self) -> String {
        match self {
            Self::Storage(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authentication_vs_authorization() {
        assert_eq!(PartnerAuthError::InvalidKey.status_code(), 401);
        assert_eq!(PartnerAuthError::ExpiredKey.status_code(), 401);
        assert_eq!(PartnerAuthError::InactivePartner.status_code(), 401);
        assert_eq!(
            PartnerAuthError::InsufficientScope(Scope::Write).status_code(),
            403
        );
        assert_eq!(
            PartnerAuthError::RateLimited { retry_after_secs: 3 }.status_code(),
            429
        );
    }

    #[test]
    fn test_scope_message() {
        assert_eq!(
            PartnerAuthError::InsufficientScope(Scope::Write).to_string(),
            "Insufficient permissions: write scope required"
        );
    }
}
