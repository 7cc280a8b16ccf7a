//! Axum HTTP handlers for the OAuth hand-off endpoints.
//!
//! # Available Handlers
//!
//! - [`create_client_handler`] - Self-service client registration
//! - [`init_server_handler`] - Administrative client bootstrap
//! - [`authorize_get`] / [`authorize_post`] - Authorization endpoint
//! - [`user_auth_handler`] - Login-token presence check

pub mod authorize;
pub mod client;
pub mod result;

use std::sync::Arc;

use crate::config::SessionConfig;
use crate::oauth::{AuthorizationFlow, OAuthServer, PendingRequestStore};
use crate::storage::SessionStorage;

pub use authorize::{authorize_get, authorize_post, user_auth_handler};
pub use client::{ClientRegistration, create_client_handler, init_server_handler};
pub use result::{ApiError, ApiResult, ResultCode};

/// Shared state for the OAuth handlers.
///
/// Holds the one engine built at startup; cloning the state never builds a
/// new one.
#[derive(Clone)]
pub struct OAuthState {
    pub flow: AuthorizationFlow,
    pub sessions: Arc<dyn SessionStorage>,
    pub session_config: SessionConfig,
}

impl OAuthState {
    /// Builds handler state around `server`.
    ///
    /// Session, pending-request and cookie settings come from the server's
    /// configuration.
    #[must_use]
    pub fn new(server: Arc<OAuthServer>, sessions: Arc<dyn SessionStorage>) -> Self {
        let config = server.config().clone();
        let pending = PendingRequestStore::new(sessions.clone())
            .with_max_age(config.pending_request_max_age);

        Self {
            flow: AuthorizationFlow::new(server, pending),
            sessions,
            session_config: config.session,
        }
    }

    /// The engine.
    #[must_use]
    pub fn server(&self) -> &Arc<OAuthServer> {
        self.flow.server()
    }

    /// Starts the background sweep of expired browser sessions.
    pub fn spawn_session_gc(&self) -> tokio::task::JoinHandle<()> {
        let sessions = Arc::clone(&self.sessions);
        let period = self.session_config.gc_interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                interval.tick().await;

                match sessions.cleanup_expired().await {
                    Ok(deleted) if deleted > 0 => {
                        tracing::debug!(deleted = deleted, "Expired browser sessions swept");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Browser session sweep failed");
                    }
                    _ => {}
                }
            }
        })
    }
}
