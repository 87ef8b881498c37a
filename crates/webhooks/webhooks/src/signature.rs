//! HMAC signature verification for inbound webhooks.
//!
//! The sender signs the raw request body with HMAC-SHA256 using the shared
//! secret and sends the lowercase hex digest in a header. The header may carry
//! a `sha256=` prefix.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_PREFIX: &str = "sha256=";

/// Verifies webhook signatures against the shared secret.
///
/// A verifier built without a secret rejects everything.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Option<String>,
}

impl WebhookVerifier {
    /// Creates a verifier. An empty secret counts as unconfigured.
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    /// Returns true if a secret is configured.
    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    /// Checks `header` against the HMAC of `payload`.
    ///
    /// Returns false for an unconfigured secret, malformed hex, or a mismatch.
    pub fn verify(&self, payload: &[u8], header: &str) -> bool {
        let Some(mut mac) = self.mac() else {
            return false;
        };

        let header = header.trim();
        let header = header.strip_prefix(SIGNATURE_PREFIX).unwrap_or(header);
        let Ok(expected) = hex::decode(header) else {
            return false;
        };

        mac.update(payload);
        mac.verify_slice(&expected).is_ok()
    }

    /// Signs `payload`, returning the hex digest a sender would put in the
    /// header. `None` when no secret is configured.
    pub fn sign(&self, payload: &[u8]) -> Option<String> {
        let mut mac = self.mac()?;
        mac.update(payload);
        Some(hex::encode(mac.finalize().into_bytes()))
    }

    fn mac(&self) -> Option<HmacSha256> {
        let secret = self.secret.as_ref()?;
        HmacSha256::new_from_slice(secret.as_bytes()).ok()
    }
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("configured", &self.is_configured())
            .finish()
    }
}
