//! Authorization endpoint request and response types.
//!
//! # Authorization code hand-off
//!
//! 1. Client redirects the user to the authorize endpoint
//! 2. Without a login token the request is stashed and the user sent to log in
//! 3. The next authorize call on the same session resumes the stashed request
//! 4. Server redirects back to the client with an authorization code
//!
//! Only `client_id` and `redirect_uri` are required to reach the engine.
//! `response_type` is checked by the engine itself so an unsupported value
//! surfaces as a protocol error rather than a parameter error.

use serde::{Deserialize, Serialize};

use crate::types::FormValues;
use crate::{AuthError, AuthResult};

/// The only supported `response_type`.
pub const RESPONSE_TYPE_CODE: &str = "code";

/// Authorization request parameters.
///
/// # Example
///
/// ```ignore
/// GET /oauth/authorize?
///   response_type=code
///   &client_id=my-app
///   &redirect_uri=https://app.example.com/callback
///   &scope=all
///   &state=abc123xyz
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    /// Must be "code".
    #[serde(default)]
    pub response_type: String,

    /// Client identifier issued during registration.
    pub client_id: String,

    /// Where the response will be sent. Must lie within the client's
    /// registered redirect domain.
    pub redirect_uri: String,

    /// Requested scope, passed through to the issued code.
    #[serde(default)]
    pub scope: Option<String>,

    /// Opaque client state, echoed back verbatim.
    #[serde(default)]
    pub state: Option<String>,
}

impl AuthorizationRequest {
    /// Extracts the request from (possibly merged) form values.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `client_id` or `redirect_uri` is absent
    /// or blank.
    pub fn from_form(form: &FormValues) -> AuthResult<Self> {
        let client_id = form
            .get_non_empty("client_id")
            .ok_or_else(|| AuthError::missing_parameter("client_id"))?;
        let redirect_uri = form
            .get_non_empty("redirect_uri")
            .ok_or_else(|| AuthError::missing_parameter("redirect_uri"))?;

        Ok(Self {
            response_type: form.get("response_type").unwrap_or_default().to_string(),
            client_id: client_id.to_string(),
            redirect_uri: redirect_uri.to_string(),
            scope: form.get_non_empty("scope").map(str::to_string),
            state: form.get("state").map(str::to_string),
        })
    }
}

/// Authorization response parameters.
///
/// Returned as query parameters on the redirect URI after a successful
/// authorization.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationResponse {
    /// Authorization code to be exchanged for tokens.
    pub code: String,

    /// Echoed state parameter, when the request carried one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl AuthorizationResponse {
    /// Creates a new authorization response.
    #[must_use]
    pub fn new(code: String, state: Option<String>) -> Self {
        Self { code, state }
    }

    /// Builds the redirect URL with response parameters.
    ///
    /// Existing query parameters on `redirect_uri` are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if `redirect_uri` is not an absolute URL.
    pub fn to_redirect_url(&self, redirect_uri: &str) -> Result<String, url::ParseError> {
        let mut url = url::Url::parse(redirect_uri)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("code", &self.code);
            if let Some(ref state) = self.state {
                pairs.append_pair("state", state);
            }
        }
        Ok(url.to_string())
    }
}
