//! OAuth 2.0 client registration.

use serde::{Deserialize, Serialize};
use url::Url;

// =============================================================================
// Client
// =============================================================================

/// A registered client application.
///
/// Clients are immutable once registered; `id` is the identity key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    /// Unique client identifier used in OAuth flows.
    pub id: String,

    /// Client secret. Blank in the current authorize flow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    /// Registered redirect domain; authorize redirects must stay within it.
    pub redirect_domain: String,
}

impl Client {
    /// Creates a client after validating its fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is empty or the redirect domain is not an
    /// absolute URI.
    pub fn new(
        id: impl Into<String>,
        secret: Option<String>,
        redirect_domain: impl Into<String>,
    ) -> Result<Self, ClientValidationError> {
        let client = Self {
            id: id.into(),
            secret: secret.filter(|s| !s.is_empty()),
            redirect_domain: redirect_domain.into(),
        };
        client.validate()?;
        Ok(client)
    }

    /// Validates the client registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the registration is invalid.
    pub fn validate(&self) -> Result<(), ClientValidationError> {
        if self.id.trim().is_empty() {
            return Err(ClientValidationError::EmptyClientId);
        }

        if self.redirect_domain.trim().is_empty() {
            return Err(ClientValidationError::EmptyRedirectDomain);
        }

        let domain = Url::parse(&self.redirect_domain)
            .map_err(|e| ClientValidationError::InvalidRedirectDomain(e.to_string()))?;
        if domain.host_str().is_none() {
            return Err(ClientValidationError::InvalidRedirectDomain(
                "redirect domain has no host".to_string(),
            ));
        }

        Ok(())
    }

    /// Checks whether `redirect_uri` lies within the registered domain.
    ///
    /// The scheme must match, and the host must equal the registered host or be
    /// one of its subdomains. Ports must match when either side names one.
    #[must_use]
    pub fn is_redirect_uri_allowed(&self, redirect_uri: &str) -> bool {
        let (Ok(base), Ok(target)) = (Url::parse(&self.redirect_domain), Url::parse(redirect_uri))
        else {
            return false;
        };

        if base.scheme() != target.scheme() || base.port() != target.port() {
            return false;
        }

        match (base.host_str(), target.host_str()) {
            (Some(base_host), Some(target_host)) => {
                let base_host = base_host.to_ascii_lowercase();
                let target_host = target_host.to_ascii_lowercase();
                target_host == base_host || target_host.ends_with(&format!(".{base_host}"))
            }
            _ => false,
        }
    }
}

/// Client validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientValidationError {
    /// Client id is empty.
    #[error("client id cannot be empty")]
    EmptyClientId,

    /// Redirect domain is empty.
    #[error("redirect domain cannot be empty")]
    EmptyRedirectDomain,

    /// Redirect domain is not a valid absolute URI.
    #[error("invalid redirect domain: {0}")]
    InvalidRedirectDomain(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(domain: &str) -> Client {
        Client::new("app", None, domain).unwrap()
    }

    #[test]
    fn test_new_validates() {
        assert_eq!(
            Client::new("", None, "https://app.example").unwrap_err(),
            ClientValidationError::EmptyClientId
        );
        assert_eq!(
            Client::new("app", None, "").unwrap_err(),
            ClientValidationError::EmptyRedirectDomain
        );
        assert!(matches!(
            Client::new("app", None, "not a uri").unwrap_err(),
            ClientValidationError::InvalidRedirectDomain(_)
        ));
    }

    #[test]
    fn test_blank_secret_is_dropped() {
        let client = Client::new("app", Some(String::new()), "https://app.example").unwrap();
        assert!(client.secret.is_none());
    }

    #[test]
    fn test_redirect_uri_same_host() {
        let client = client("https://app.example/cb");
        assert!(client.is_redirect_uri_allowed("https://app.example/cb"));
        assert!(client.is_redirect_uri_allowed("https://app.example/other?x=1"));
    }

    #[test]
    fn test_redirect_uri_subdomain() {
        let client = client("https://app.example");
        assert!(client.is_redirect_uri_allowed("https://login.app.example/cb"));
        assert!(!client.is_redirect_uri_allowed("https://evilapp.example/cb"));
    }

    #[test]
    fn test_redirect_uri_rejections() {
        let client = client("https://app.example");
        assert!(!client.is_redirect_uri_allowed("http://app.example/cb"));
        assert!(!client.is_redirect_uri_allowed("https://app.example:8443/cb"));
        assert!(!client.is_redirect_uri_allowed("https://other.example/cb"));
        assert!(!client.is_redirect_uri_allowed("/relative"));
    }

    #[test]
    fn test_serialization() {
        let client = client("https://app.example/cb");
        let json = serde_json::to_value(&client).unwrap();
        assert_eq!(json["id"], "app");
        assert_eq!(json["redirectDomain"], "https://app.example/cb");
        assert!(json.get("secret").is_none());
    }
}
