//! Authorization flow controller.
//!
//! Drives one authorize attempt through the hand-off state machine:
//!
//! ```text
//! START -> RESTORE_PENDING -> DELEGATE -> GRANT
//!                                      -> REDIRECT_LOGIN
//!                                      -> FAIL
//! ```
//!
//! A pending request found in the session is cleared before delegation and
//! its values override the current ones. When the engine reports that the
//! user has to log in, the (merged) request is stashed again and the user is
//! redirected to the login page.

use std::fmt;
use std::sync::Arc;

use axum::http::HeaderMap;
use tracing::Instrument;

use crate::{AuthError, AuthResult};
use crate::oauth::authorize::AuthorizationRequest;
use crate::oauth::pending::PendingRequestStore;
use crate::oauth::server::{AuthorizeDecision, OAuthServer};
use crate::session::Session;
use crate::types::FormValues;

/// States of one authorize attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Start,
    RestorePending,
    Delegate,
    Grant,
    RedirectLogin,
    Fail,
}

impl FlowState {
    /// Returns the state name used in logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::RestorePending => "restore_pending",
            Self::Delegate => "delegate",
            Self::Grant => "grant",
            Self::RedirectLogin => "redirect_login",
            Self::Fail => "fail",
        }
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome of a successful authorize attempt.
///
/// `FAIL` is the `Err` side of [`AuthorizationFlow::authorize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    /// Redirect to the client with a fresh authorization code.
    Grant {
        /// Client redirect URI with `code` and `state`.
        location: String,
    },
    /// Redirect to the login page; the request is stashed in the session.
    RedirectLogin {
        /// The login page.
        location: String,
    },
}

impl FlowOutcome {
    /// Where the browser is sent next.
    #[must_use]
    pub fn location(&self) -> &str {
        match self {
            Self::Grant { location } | Self::RedirectLogin { location } => location,
        }
    }

    /// The terminal state this outcome corresponds to.
    #[must_use]
    pub fn state(&self) -> FlowState {
        match self {
            Self::Grant { .. } => FlowState::Grant,
            Self::RedirectLogin { .. } => FlowState::RedirectLogin,
        }
    }
}

/// Orchestrates restore, delegation and the login detour.
#[derive(Clone)]
pub struct AuthorizationFlow {
    server: Arc<OAuthServer>,
    pending: PendingRequestStore,
    login_url: String,
}

impl AuthorizationFlow {
    /// Creates a controller around an already constructed engine.
    #[must_use]
    pub fn new(server: Arc<OAuthServer>, pending: PendingRequestStore) -> Self {
        let login_url = server.config().login_url.clone();
        Self {
            server,
            pending,
            login_url,
        }
    }

    /// The engine this controller delegates to.
    #[must_use]
    pub fn server(&self) -> &Arc<OAuthServer> {
        &self.server
    }

    /// Runs one authorize attempt.
    ///
    /// # Errors
    ///
    /// Returns a validation error if neither the request nor a restored
    /// pending request supply `client_id` and `redirect_uri`, and propagates
    /// engine and storage failures. In every case a pending request that was
    /// read has already been cleared.
    pub async fn authorize(
        &self,
        session: &Session,
        headers: &HeaderMap,
        form: FormValues,
    ) -> AuthResult<FlowOutcome> {
        let span = tracing::debug_span!("authorize", session_id = %session.id());
        let result = self.run(session, headers, form).instrument(span).await;
        match &result {
            Ok(outcome) => {
                tracing::debug!(flow.state = %outcome.state(), "Authorize attempt finished");
            }
            Err(e) => {
                tracing::debug!(
                    flow.state = %FlowState::Fail,
                    error = %e,
                    error.category = %e.category(),
                    "Authorize attempt failed"
                );
            }
        }
        result
    }

    async fn run(
        &self,
        session: &Session,
        headers: &HeaderMap,
        mut form: FormValues,
    ) -> AuthResult<FlowOutcome> {
        tracing::trace!(flow.state = %FlowState::Start, params = form.len());

        tracing::trace!(flow.state = %FlowState::RestorePending);
        if let Some(restored) = self.pending.restore_and_clear(session).await? {
            form.merge_from(restored);
        }

        let request = AuthorizationRequest::from_form(&form)?;

        tracing::trace!(flow.state = %FlowState::Delegate, client_id = %request.client_id);
        let decision = self
            .server
            .handle_authorize_request(&request, headers)
            .await
            .map_err(engine_failure)?;
        match decision {
            AuthorizeDecision::Granted { redirect_url } => Ok(FlowOutcome::Grant {
                location: redirect_url,
            }),
            AuthorizeDecision::NeedsLogin => {
                self.pending.stash(session, &form).await?;
                Ok(FlowOutcome::RedirectLogin {
                    location: self.login_url.clone(),
                })
            }
        }
    }
}

/// Engine rejections are internal failures of the authorize call; only the
/// controller's own parameter check is reported as client input.
fn engine_failure(err: AuthError) -> AuthError {
    if err.is_server_error() {
        return err;
    }
    AuthError::protocol(format!("authorization engine rejected the request: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OAuthConfig;
    use crate::oauth::gate::{Authentication, Authenticator, Identity};
    use crate::oauth::pending::{PENDING_REQUEST_SLOT, PendingRequest};
    use crate::registry::ClientRegistry;
    use crate::storage::{
        MemoryClientStorage, MemoryCodeStorage, MemorySessionStorage, SessionStorage,
    };
    use async_trait::async_trait;
    use axum::http::HeaderValue;
    use std::time::Duration;

    const TTL: Duration = Duration::from_secs(3600);

    /// Any non-empty `TOKEN` header authenticates as its own value.
    struct HeaderEcho;

    #[async_trait]
    impl Authenticator for HeaderEcho {
        async fn authenticate(&self, headers: &HeaderMap) -> Authentication {
            headers
                .get("TOKEN")
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(|v| Authentication::Authenticated(Identity::new(v)))
                .unwrap_or(Authentication::NeedsLogin)
        }
    }

    struct Harness {
        flow: AuthorizationFlow,
        sessions: Arc<MemorySessionStorage>,
        codes: Arc<MemoryCodeStorage>,
    }

    impl Harness {
        async fn new() -> Self {
            let registry = ClientRegistry::new(Arc::new(MemoryClientStorage::new()));
            registry
                .register("app", None, "https://app.example")
                .await
                .unwrap();
            let codes = Arc::new(MemoryCodeStorage::new());
            let server = Arc::new(OAuthServer::new(
                registry,
                codes.clone(),
                Arc::new(HeaderEcho),
                OAuthConfig::default(),
            ));
            let sessions = Arc::new(MemorySessionStorage::new());
            let flow = AuthorizationFlow::new(server, PendingRequestStore::new(sessions.clone()));
            Self {
                flow,
                sessions,
                codes,
            }
        }

        async fn session(&self, id: &str) -> Session {
            Session::start(self.sessions.as_ref(), Some(id), TTL)
                .await
                .unwrap()
        }

        async fn stashed(&self, id: &str) -> Option<PendingRequest> {
            let record = self.sessions.load(id).await.unwrap()?;
            let value = record.values.get(PENDING_REQUEST_SLOT)?.clone();
            Some(serde_json::from_value(value).unwrap())
        }
    }

    fn token(user: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("TOKEN", HeaderValue::from_str(user).unwrap());
        headers
    }

    const QUERY: &str =
        "client_id=app&redirect_uri=https%3A%2F%2Fapp.example%2Fcb&response_type=code&state=xyz";

    #[tokio::test]
    async fn test_login_detour_and_resume() {
        let h = Harness::new().await;
        let session = Session::fresh(TTL);

        // No token: stash the four parameters and go to the login page.
        let outcome = h
            .flow
            .authorize(&session, &HeaderMap::new(), FormValues::parse(QUERY))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            FlowOutcome::RedirectLogin {
                location: "/user/login".to_string()
            }
        );
        assert!(h.codes.is_empty());

        let stashed = h.stashed(session.id()).await.unwrap();
        assert_eq!(stashed.form_values, FormValues::parse(QUERY));

        // Same session, token, no parameters: resume the stashed request.
        let session = h.session(session.id()).await;
        let outcome = h
            .flow
            .authorize(&session, &token("alice"), FormValues::new())
            .await
            .unwrap();
        assert_eq!(outcome.state(), FlowState::Grant);
        assert!(outcome.location().starts_with("https://app.example/cb?code="));
        assert!(outcome.location().ends_with("&state=xyz"));

        // Slot is empty now: a bare call fails on the missing parameter.
        let session = h.session(session.id()).await;
        let err = h
            .flow
            .authorize(&session, &HeaderMap::new(), FormValues::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation { .. }));
        assert!(err.to_string().contains("client_id"));
    }

    #[tokio::test]
    async fn test_restored_values_take_precedence() {
        let h = Harness::new().await;
        let session = Session::fresh(TTL);
        h.flow
            .authorize(&session, &HeaderMap::new(), FormValues::parse(QUERY))
            .await
            .unwrap();

        let session = h.session(session.id()).await;
        let outcome = h
            .flow
            .authorize(
                &session,
                &token("alice"),
                FormValues::parse("state=later&client_id=app"),
            )
            .await
            .unwrap();
        assert!(outcome.location().ends_with("&state=xyz"));
    }

    #[tokio::test]
    async fn test_pending_cleared_even_when_engine_fails() {
        let h = Harness::new().await;
        let session = Session::fresh(TTL);
        h.flow
            .authorize(
                &session,
                &HeaderMap::new(),
                FormValues::parse(
                    "client_id=ghost&redirect_uri=https%3A%2F%2Fapp.example&response_type=code",
                ),
            )
            .await
            .unwrap();

        let session = h.session(session.id()).await;
        let err = h
            .flow
            .authorize(&session, &token("alice"), FormValues::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Protocol { .. }));
        assert!(err.is_server_error());
        assert!(err.to_string().contains("ghost"));

        assert_eq!(h.stashed(session.id()).await, None);
    }

    #[tokio::test]
    async fn test_direct_grant_without_detour() {
        let h = Harness::new().await;
        let session = Session::fresh(TTL);

        let outcome = h
            .flow
            .authorize(&session, &token("bob"), FormValues::parse(QUERY))
            .await
            .unwrap();
        assert_eq!(outcome.state(), FlowState::Grant);
        assert_eq!(h.codes.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_redirect_uri_fails_fast() {
        let h = Harness::new().await;
        let session = Session::fresh(TTL);

        let err = h
            .flow
            .authorize(
                &session,
                &HeaderMap::new(),
                FormValues::parse("client_id=app&response_type=code"),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("redirect_uri"));

        // Failing fast stashes nothing.
        assert!(h.sessions.load(session.id()).await.unwrap().is_none());
    }
}
