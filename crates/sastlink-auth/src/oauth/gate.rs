//! Credential gate.
//!
//! Decides whether an inbound request carries a valid login token and, if
//! so, which user it belongs to. The gate never redirects and never fails:
//! a missing header, an unverifiable token and an empty username all come
//! out as [`Authentication::NeedsLogin`], so an expired token simply sends
//! the user back to the login page.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderName};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde_json::{Map, Value};

use crate::config::IdentityConfig;
use crate::{AuthError, AuthResult};

// =============================================================================
// Outcome
// =============================================================================

/// A resolved user identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    /// Wraps a username.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self(username.into())
    }

    /// The username.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of the credential gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    /// The request carries a valid login token for this user.
    Authenticated(Identity),
    /// The user has to log in (again).
    NeedsLogin,
}

impl Authentication {
    /// Returns the identity when authenticated.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            Self::NeedsLogin => None,
        }
    }
}

// =============================================================================
// Capabilities
// =============================================================================

/// Decides the authentication status of a request.
///
/// Injected into the [`OAuthServer`](crate::oauth::server::OAuthServer) at
/// construction.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Inspects the request headers.
    async fn authenticate(&self, headers: &HeaderMap) -> Authentication;
}

/// Resolves a login token to a username.
///
/// This is the external identity service's boundary.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verifies `token` and returns the username it was issued to.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is invalid or expired.
    async fn verify(&self, token: &str) -> AuthResult<String>;
}

#[async_trait]
impl<V: IdentityVerifier + ?Sized> IdentityVerifier for Arc<V> {
    async fn verify(&self, token: &str) -> AuthResult<String> {
        (**self).verify(token).await
    }
}

// =============================================================================
// JWT verifier
// =============================================================================

/// Verifies HS256 login tokens issued by the login service.
pub struct JwtIdentityVerifier {
    key: DecodingKey,
    validation: Validation,
    username_claim: String,
}

impl JwtIdentityVerifier {
    /// Builds a verifier from configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the secret is empty.
    pub fn from_config(config: &IdentityConfig) -> AuthResult<Self> {
        if config.jwt_secret.is_empty() {
            return Err(AuthError::configuration("identity.jwt_secret is empty"));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.leeway.as_secs();

        Ok(Self {
            key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            username_claim: config.username_claim.clone(),
        })
    }
}

#[async_trait]
impl IdentityVerifier for JwtIdentityVerifier {
    async fn verify(&self, token: &str) -> AuthResult<String> {
        let data = decode::<Map<String, Value>>(token, &self.key, &self.validation)
            .map_err(|e| AuthError::validation(format!("invalid login token: {e}")))?;

        data.claims
            .get(&self.username_claim)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                AuthError::validation(format!(
                    "login token has no '{}' claim",
                    self.username_claim
                ))
            })
    }
}

// =============================================================================
// Gate
// =============================================================================

/// Header-based credential gate.
pub struct CredentialGate<V> {
    header: HeaderName,
    verifier: V,
}

impl<V: IdentityVerifier> CredentialGate<V> {
    /// Creates a gate reading the login token from `header`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `header` is not a valid header name.
    pub fn new(header: &str, verifier: V) -> AuthResult<Self> {
        let header = HeaderName::from_bytes(header.as_bytes())
            .map_err(|e| AuthError::configuration(format!("invalid token header: {e}")))?;
        Ok(Self { header, verifier })
    }

    fn token<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        headers
            .get(&self.header)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

#[async_trait]
impl<V: IdentityVerifier> Authenticator for CredentialGate<V> {
    async fn authenticate(&self, headers: &HeaderMap) -> Authentication {
        let Some(token) = self.token(headers) else {
            tracing::debug!(header = %self.header, "No login token present");
            return Authentication::NeedsLogin;
        };

        match self.verifier.verify(token).await {
            Ok(username) if !username.trim().is_empty() => {
                Authentication::Authenticated(Identity::new(username))
            }
            Ok(_) => {
                tracing::debug!("Login token resolved to an empty username");
                Authentication::NeedsLogin
            }
            Err(e) => {
                tracing::debug!(error = %e, "Login token rejected");
                Authentication::NeedsLogin
            }
        }
    }
}
