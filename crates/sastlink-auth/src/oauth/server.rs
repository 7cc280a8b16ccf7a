//! The OAuth server instance.
//!
//! One `OAuthServer` binds the client registry, the authorization code store
//! and the [`Authenticator`] together. It is built once at startup and
//! shared by reference; nothing about it changes while requests are served.
//!
//! # Usage
//!
//! ```ignore
//! let server = Arc::new(OAuthServer::new(registry, codes, authenticator, config));
//! let _gc = server.spawn_code_gc();
//!
//! match server.handle_authorize_request(&request, &headers).await? {
//!     AuthorizeDecision::Granted { redirect_url } => { /* 302 to client */ }
//!     AuthorizeDecision::NeedsLogin => { /* stash and 302 to login */ }
//! }
//! ```

use std::sync::Arc;

use axum::http::HeaderMap;

use crate::config::OAuthConfig;
use crate::oauth::authorize::{AuthorizationRequest, AuthorizationResponse, RESPONSE_TYPE_CODE};
use crate::oauth::code::AuthorizationCode;
use crate::oauth::gate::{Authentication, Authenticator};
use crate::registry::ClientRegistry;
use crate::storage::AuthorizationCodeStorage;
use crate::{AuthError, AuthResult};

/// What the engine decided for one authorize request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizeDecision {
    /// A code was issued; send the user here.
    Granted {
        /// Client redirect URI carrying `code` and `state`.
        redirect_url: String,
    },
    /// No authenticated user; the caller handles the login detour.
    NeedsLogin,
}

/// Authorization code engine.
pub struct OAuthServer {
    registry: ClientRegistry,
    codes: Arc<dyn AuthorizationCodeStorage>,
    authenticator: Arc<dyn Authenticator>,
    config: OAuthConfig,
}

impl OAuthServer {
    /// Wires the engine's collaborators.
    #[must_use]
    pub fn new(
        registry: ClientRegistry,
        codes: Arc<dyn AuthorizationCodeStorage>,
        authenticator: Arc<dyn Authenticator>,
        config: OAuthConfig,
    ) -> Self {
        Self {
            registry,
            codes,
            authenticator,
            config,
        }
    }

    /// The client registry the engine validates against.
    #[must_use]
    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Processes an authorization request.
    ///
    /// The authenticator is consulted before the client is looked up, so an
    /// unauthenticated request always ends in the login detour.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `response_type` is not "code" (`Protocol`)
    /// - the client is not registered (`NotFound`)
    /// - `redirect_uri` is outside the client's redirect domain (`Validation`)
    /// - the code cannot be stored (`Storage`)
    pub async fn handle_authorize_request(
        &self,
        request: &AuthorizationRequest,
        headers: &HeaderMap,
    ) -> AuthResult<AuthorizeDecision> {
        if request.response_type != RESPONSE_TYPE_CODE {
            return Err(AuthError::protocol(format!(
                "unsupported response type: '{}'",
                request.response_type
            )));
        }

        let identity = match self.authenticator.authenticate(headers).await {
            Authentication::Authenticated(identity) => identity,
            Authentication::NeedsLogin => return Ok(AuthorizeDecision::NeedsLogin),
        };

        let client = self.registry.lookup(&request.client_id).await?;
        if !client.is_redirect_uri_allowed(&request.redirect_uri) {
            return Err(AuthError::validation(format!(
                "redirect_uri is not within the redirect domain registered for client '{}'",
                client.id
            )));
        }

        let code = AuthorizationCode::issue(
            &client.id,
            identity.as_str(),
            &request.redirect_uri,
            request.scope.clone(),
            self.config.authorization_code_lifetime,
        );
        self.codes.create(&code).await?;

        // Never log the code itself
        tracing::info!(
            client_id = %client.id,
            user = %identity,
            "Issued authorization code"
        );

        let redirect_url = AuthorizationResponse::new(code.code, request.state.clone())
            .to_redirect_url(&request.redirect_uri)
            .map_err(|e| AuthError::validation(format!("invalid redirect_uri: {e}")))?;

        Ok(AuthorizeDecision::Granted { redirect_url })
    }

    /// Redeems an authorization code for the token endpoint.
    ///
    /// The code is consumed whether or not the binding matches.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown, expired or already used code and
    /// `Validation` if the client or redirect URI differ from issuance.
    pub async fn redeem_code(
        &self,
        code: &str,
        client_id: &str,
        redirect_uri: &str,
    ) -> AuthResult<AuthorizationCode> {
        let issued = self
            .codes
            .consume(code)
            .await?
            .ok_or_else(|| AuthError::not_found("authorization code"))?;

        if issued.client_id != client_id || issued.redirect_uri != redirect_uri {
            tracing::warn!(
                client_id = %client_id,
                "Authorization code presented with a mismatched binding"
            );
            return Err(AuthError::validation(
                "authorization code was not issued to this client and redirect_uri",
            ));
        }

        Ok(issued)
    }

    /// Starts the background sweep of expired authorization codes.
    pub fn spawn_code_gc(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let server = Arc::clone(self);
        let period = server.config.code_gc_interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                interval.tick().await;

                match server.codes.cleanup_expired().await {
                    Ok(deleted) if deleted > 0 => {
                        tracing::debug!(deleted = deleted, "Expired authorization codes swept");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Authorization code sweep failed");
                    }
                    _ => {}
                }
            }
        })
    }
}
