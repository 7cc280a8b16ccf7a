//! # sastlink-auth
//!
//! OAuth 2.0 authorization-code hand-off for SAST Link.
//!
//! This crate provides:
//! - Client registration (self-service and bootstrap)
//! - A header-based credential gate backed by JWT login tokens
//! - Suspending an authorize request across the login detour and resuming it
//! - Authorization code issuance
//! - Axum handlers and the JSON result envelope
//!
//! ## Modules
//!
//! - [`config`] - Hand-off configuration
//! - [`oauth`] - Credential gate, pending requests, flow controller, engine
//! - [`registry`] - Client registry
//! - [`session`] - Per-request browser session handle
//! - [`storage`] - Storage traits and in-memory backends
//! - [`http`] - Axum HTTP handlers

pub mod config;
pub mod error;
pub mod http;
pub mod oauth;
pub mod registry;
pub mod session;
pub mod storage;
pub mod types;

pub use config::{ConfigError, IdentityConfig, OAuthConfig, SessionConfig};
pub use error::{AuthError, BoxError, ErrorCategory};
pub use http::{
    ApiError, ApiResult, ClientRegistration, OAuthState, ResultCode, authorize_get,
    authorize_post, create_client_handler, init_server_handler, user_auth_handler,
};
pub use oauth::{
    Authentication, Authenticator, AuthorizationFlow, AuthorizeDecision, CredentialGate,
    FlowOutcome, Identity, IdentityVerifier, JwtIdentityVerifier, OAuthServer,
    PendingRequestStore,
};
pub use registry::ClientRegistry;
pub use session::Session;
pub use storage::{
    AuthorizationCodeStorage, ClientStorage, MemoryClientStorage, MemoryCodeStorage,
    MemorySessionStorage, SessionRecord, SessionStorage,
};
pub use types::{Client, ClientValidationError, FormValues};

/// Type alias for hand-off results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use sastlink_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::{ConfigError, OAuthConfig};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::oauth::{
        Authentication, Authenticator, AuthorizationFlow, CredentialGate, FlowOutcome,
        JwtIdentityVerifier, OAuthServer,
    };
    pub use crate::registry::ClientRegistry;
    pub use crate::storage::{AuthorizationCodeStorage, ClientStorage, SessionStorage};
    pub use crate::types::{Client, FormValues};
}
