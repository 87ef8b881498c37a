//! API key generation and hashing.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Generates partner API keys.
#[derive(Debug, Clone)]
pub struct PartnerKeyGenerator {
    /// Number of random bytes (hex-encoded) after the prefix.
    bytes: usize,
    prefix: String,
}

impl PartnerKeyGenerator {
    pub fn new(bytes: usize, prefix: impl Into<String>) -> Self {
        Self {
            bytes,
            prefix: prefix.into(),
        }
    }

    /// Generates a new key: the prefix followed by lowercase hex.
    pub fn generate(&self) -> String {
        let mut buf = vec![0u8; self.bytes];
        rand::thread_rng().fill_bytes(&mut buf);
        format!("{}{}", self.prefix, hex::encode(buf))
    }

    /// Hashes a key for storage and lookup (SHA-256, lowercase hex).
    pub fn hash_key(key: &str) -> String {
        hex::encode(Sha256::digest(key.as_bytes()))
    }

    /// Display-only prefix: the first `length` characters followed by `...`.
    pub fn display_prefix(key: &str, length: usize) -> String {
        let start: String = key.chars().take(length).collect();
        format!("{start}...")
    }
}

impl Default for PartnerKeyGenerator {
    fn default() -> Self {
        Self::new(32, "fr_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        let key = PartnerKeyGenerator::default().generate();

        assert!(key.starts_with("fr_"));
        assert_eq!(key.len(), 3 + 64);
        assert!(key[3..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_known_hash() {
        assert_eq!(
            PartnerKeyGenerator::hash_key("fr_0000"),
            "37e2999cd9bfc4e3bb3962f81c6bf33b38c8efceeb76d0a7a3094a80b1ffd9d0"
        );
    }

    #[test]
    fn test_display_prefix() {
        assert_eq!(
            PartnerKeyGenerator::display_prefix("fr_1a2b3c4d5e6f7a8b", 12),
            "fr_1a2b3c4d..."
        );
    }

    #[test]
    fn test_uniqueness() {
        let generator = PartnerKeyGenerator::default();
        let keys: Vec<String> = (0..100).map(|_| generator.generate()).collect();

        let unique: std::collections::HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len());
    }
}
