//! Configuration for partner authentication.

/// Configuration for partner API keys.
#[derive(Debug, Clone)]
pub struct PartnerAuthConfig {
    /// Header names checked for the API key, in order.
    pub api_key_headers: Vec<String>,
    /// Prefix of generated keys.
    pub key_prefix: String,
    /// Random bytes per generated key.
    pub key_bytes: usize,
    /// Characters of the key kept as its display prefix.
    pub display_prefix_length: usize,
    /// Rate limit window in milliseconds.
    pub rate_limit_window_ms: i64,
    /// Whether per-key rate limits are enforced.
    pub rate_limit_enabled: bool,
    /// Rate limit given to newly issued keys.
    pub default_rate_limit_per_minute: u32,
}

impl Default for PartnerAuthConfig {
    fn default() -> Self {
        Self {
            api_key_headers: vec!["x-api-key".to_string()],
            key_prefix: "fr_".to_string(),
            key_bytes: 32,
            display_prefix_length: 12,
            rate_limit_window_ms: 60_000,
            rate_limit_enabled: true,
            default_rate_limit_per_minute: 60,
        }
    }
}

impl PartnerAuthConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key headers.
    pub fn api_key_headers(mut self, headers: Vec<String>) -> Self {
        self.api_key_headers = headers;
        self
    }

    /// Sets the rate limit window.
    pub fn rate_limit_window_ms(mut self, window_ms: i64) -> Self {
        self.rate_limit_window_ms = window_ms;
        self
    }

    /// Disables rate limiting.
    pub fn disable_rate_limit(mut self) -> Self {
        self.rate_limit_enabled = false;
        self
    }
}
