//! Configuration for the Maestro session core

use chrono::Duration;

use crate::error::DEFAULT_FAILURE_MESSAGE;

/// Session core configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Storage key holding the bearer token
    pub token_key: String,

    /// Storage key holding the serialized user profile
    pub user_key: String,

    /// Lifetime stamped into locally minted fallback tokens
    pub fallback_token_validity: Duration,

    /// Client-local secret used to sign fallback tokens (not a trust boundary)
    pub fallback_secret: String,

    /// Whether `ensure_token` may mint fallback tokens at all
    pub fallback_tokens_enabled: bool,

    /// Message shown when the identity service fails without one
    pub default_failure_message: String,

    /// Bounded capacity of the session actor mailbox
    pub channel_capacity: usize,
}

impl SessionConfig {
    /// Create config with sensible defaults
    ///
    /// Persisted layout:
    /// ```text
    /// token  → opaque bearer string
    /// user   → JSON user profile
    /// ```
    pub fn new() -> Self {
        Self {
            token_key: "token".to_string(),
            user_key: "user".to_string(),
            fallback_token_validity: Duration::days(1),
            fallback_secret: std::env::var("MAESTRO_FALLBACK_SECRET")
                .unwrap_or_else(|_| "maestro-local-fallback-not-a-credential".to_string()),
            fallback_tokens_enabled: true,
            default_failure_message: DEFAULT_FAILURE_MESSAGE.to_string(),
            channel_capacity: 64,
        }
    }

    /// Override storage keys
    pub fn with_keys(mut self, token_key: impl Into<String>, user_key: impl Into<String>) -> Self {
        self.token_key = token_key.into();
        self.user_key = user_key.into();
        self
    }

    /// Override fallback token lifetime
    pub fn with_fallback_validity(mut self, validity: Duration) -> Self {
        self.fallback_token_validity = validity;
        self
    }

    /// Override fallback signing secret
    pub fn with_fallback_secret(mut self, secret: impl Into<String>) -> Self {
        self.fallback_secret = secret.into();
        self
    }

    /// Enable or disable fallback token minting
    pub fn with_fallback_tokens(mut self, enabled: bool) -> Self {
        self.fallback_tokens_enabled = enabled;
        self
    }

    /// Override the generic failure message
    pub fn with_default_failure_message(mut self, message: impl Into<String>) -> Self {
        self.default_failure_message = message.into();
        self
    }

    /// Override actor mailbox capacity (minimum 1)
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = SessionConfig::new();
        assert_eq!(cfg.token_key, "token");
        assert_eq!(cfg.user_key, "user");
        assert_eq!(cfg.fallback_token_validity, Duration::days(1));
        assert!(cfg.fallback_tokens_enabled);
        assert_eq!(cfg.channel_capacity, 64);
    }

    #[test]
    fn test_builder_pattern() {
        let cfg = SessionConfig::new()
            .with_keys("access", "profile")
            .with_fallback_secret("my-secret")
            .with_fallback_validity(Duration::hours(2))
            .with_fallback_tokens(false)
            .with_channel_capacity(0);

        assert_eq!(cfg.token_key, "access");
        assert_eq!(cfg.user_key, "profile");
        assert_eq!(cfg.fallback_secret, "my-secret");
        assert_eq!(cfg.fallback_token_validity, Duration::hours(2));
        assert!(!cfg.fallback_tokens_enabled);
        assert_eq!(cfg.channel_capacity, 1);
    }
}
