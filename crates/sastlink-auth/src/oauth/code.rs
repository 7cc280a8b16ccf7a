//! Authorization codes.
//!
//! A code binds a validated client, the authenticated user and the redirect
//! URI it was delivered to. Codes are 256-bit random values, short-lived and
//! single-use.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// An issued authorization code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationCode {
    /// The code itself, base64url-encoded.
    pub code: String,

    /// Client the code was issued to.
    pub client_id: String,

    /// Username resolved from the login token.
    pub user_id: String,

    /// Redirect URI the code was delivered to.
    pub redirect_uri: String,

    /// Requested scope, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Timestamp when the code was issued.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Timestamp after which the code can no longer be exchanged.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl AuthorizationCode {
    /// Issues a new code with the given lifetime.
    #[must_use]
    pub fn issue(
        client_id: impl Into<String>,
        user_id: impl Into<String>,
        redirect_uri: impl Into<String>,
        scope: Option<String>,
        lifetime: std::time::Duration,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        let lifetime = time::Duration::try_from(lifetime).unwrap_or(time::Duration::MAX);
        Self {
            code: Self::generate_code(),
            client_id: client_id.into(),
            user_id: user_id.into(),
            redirect_uri: redirect_uri.into(),
            scope,
            created_at: now,
            expires_at: now.saturating_add(lifetime),
        }
    }

    /// Generates a new cryptographically secure authorization code.
    ///
    /// 32 bytes of random data encoded as base64url without padding
    /// (43 characters).
    #[must_use]
    pub fn generate_code() -> String {
        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Returns `true` if the code has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }
}
