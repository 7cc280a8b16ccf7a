//! OAuth hand-off configuration.
//!
//! # Example (TOML)
//!
//! ```toml
//! [oauth]
//! login_url = "/user/login"
//! token_header = "TOKEN"
//! authorization_code_lifetime = "10m"
//!
//! [oauth.session]
//! cookie_name = "sastlink_session"
//! ttl = "24h"
//!
//! [oauth.identity]
//! jwt_secret = "change-me"
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the authorization hand-off.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Where unauthenticated users are sent to log in.
    pub login_url: String,

    /// Request header carrying the login token.
    pub token_header: String,

    /// Authorization code lifetime.
    #[serde(with = "humantime_serde")]
    pub authorization_code_lifetime: Duration,

    /// How often expired authorization codes are swept from storage.
    #[serde(with = "humantime_serde")]
    pub code_gc_interval: Duration,

    /// Maximum age of a stashed authorize request.
    /// Unset means the request lives as long as the browser session.
    #[serde(default, with = "humantime_serde")]
    pub pending_request_max_age: Option<Duration>,

    /// Browser session settings.
    pub session: SessionConfig,

    /// Login-token verification settings.
    pub identity: IdentityConfig,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            login_url: "/user/login".to_string(),
            token_header: "TOKEN".to_string(),
            authorization_code_lifetime: Duration::from_secs(600), // 10 minutes
            code_gc_interval: Duration::from_secs(60),
            pending_request_max_age: None,
            session: SessionConfig::default(),
            identity: IdentityConfig::default(),
        }
    }
}

/// Browser session cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name of the cookie carrying the session id.
    pub cookie_name: String,

    /// Path attribute of the session cookie.
    pub cookie_path: String,

    /// Session lifetime, refreshed on every slot write.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,

    /// Mark the cookie `Secure` (enable behind HTTPS).
    pub secure_cookies: bool,

    /// How often expired sessions are swept from storage.
    #[serde(with = "humantime_serde")]
    pub gc_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "sastlink_session".to_string(),
            cookie_path: "/".to_string(),
            ttl: Duration::from_secs(24 * 3600),
            secure_cookies: false,
            gc_interval: Duration::from_secs(600),
        }
    }
}

/// Login-token (JWT) verification configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// HMAC secret the login service signs tokens with.
    pub jwt_secret: String,

    /// Claim holding the username.
    pub username_claim: String,

    /// Clock skew tolerated when checking `exp`.
    #[serde(with = "humantime_serde")]
    pub leeway: Duration,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            username_claim: "username".to_string(),
            leeway: Duration::ZERO,
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl OAuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the JWT secret is empty, and
    /// `ConfigError::InvalidValue` for empty names or zero durations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.login_url.is_empty() {
            return Err(ConfigError::InvalidValue(
                "login_url cannot be empty".to_string(),
            ));
        }

        if self.token_header.is_empty() {
            return Err(ConfigError::InvalidValue(
                "token_header cannot be empty".to_string(),
            ));
        }
        if axum::http::HeaderName::from_bytes(self.token_header.as_bytes()).is_err() {
            return Err(ConfigError::InvalidValue(format!(
                "token_header '{}' is not a valid header name",
                self.token_header
            )));
        }

        if self.authorization_code_lifetime.is_zero() {
            return Err(ConfigError::InvalidValue(
                "authorization_code_lifetime must be > 0".to_string(),
            ));
        }

        if self.code_gc_interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "code_gc_interval must be > 0".to_string(),
            ));
        }

        if self.pending_request_max_age.is_some_and(|age| age.is_zero()) {
            return Err(ConfigError::InvalidValue(
                "pending_request_max_age must be > 0 when set".to_string(),
            ));
        }

        if self.session.cookie_name.is_empty() {
            return Err(ConfigError::InvalidValue(
                "session.cookie_name cannot be empty".to_string(),
            ));
        }

        if self.session.ttl.is_zero() {
            return Err(ConfigError::InvalidValue(
                "session.ttl must be > 0".to_string(),
            ));
        }

        if self.session.gc_interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "session.gc_interval must be > 0".to_string(),
            ));
        }

        if self.identity.jwt_secret.is_empty() {
            return Err(ConfigError::Missing("identity.jwt_secret".to_string()));
        }

        if self.identity.username_claim.is_empty() {
            return Err(ConfigError::InvalidValue(
                "identity.username_claim cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> OAuthConfig {
        let mut config = OAuthConfig::default();
        config.identity.jwt_secret = "secret".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = OAuthConfig::default();
        assert_eq!(config.login_url, "/user/login");
        assert_eq!(config.token_header, "TOKEN");
        assert_eq!(config.authorization_code_lifetime, Duration::from_secs(600));
        assert!(config.pending_request_max_age.is_none());
        assert_eq!(config.identity.username_claim, "username");
    }

    #[test]
    fn test_default_config_requires_secret() {
        let err = OAuthConfig::default().validate().unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
        assert!(err.to_string().contains("jwt_secret"));

        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_invalid_header_name_fails_validation() {
        let mut config = valid_config();
        config.token_header = "bad header".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
        assert!(err.to_string().contains("token_header"));
    }

    #[test]
    fn test_zero_pending_age_fails_validation() {
        let mut config = valid_config();
        config.pending_request_max_age = Some(Duration::ZERO);
        assert!(config.validate().is_err());

        config.pending_request_max_age = Some(Duration::from_secs(900));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_humantime() {
        let config: OAuthConfig = serde_json::from_value(serde_json::json!({
            "authorization_code_lifetime": "5m",
            "pending_request_max_age": "15m",
            "session": { "ttl": "2h" },
            "identity": { "jwt_secret": "s3cr3t" }
        }))
        .unwrap();

        assert_eq!(config.authorization_code_lifetime, Duration::from_secs(300));
        assert_eq!(
            config.pending_request_max_age,
            Some(Duration::from_secs(900))
        );
        assert_eq!(config.session.ttl, Duration::from_secs(7200));
        assert_eq!(config.session.cookie_name, "sastlink_session");
        assert_eq!(config.login_url, "/user/login");
        assert!(config.validate().is_ok());
    }
}
