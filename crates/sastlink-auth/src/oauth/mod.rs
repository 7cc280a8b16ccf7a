//! OAuth 2.0 authorization hand-off.
//!
//! The authorization code flow is implemented across several submodules:
//!
//! - [`authorize`] - Request/response types for the authorization endpoint
//! - [`gate`] - Credential gate deciding whether the user is logged in
//! - [`pending`] - Stashing the authorize request across the login detour
//! - [`flow`] - The controller running one authorize attempt
//! - [`server`] - The engine issuing authorization codes
//! - [`code`] - Authorization code values
//!
//! # Example
//!
//! ```ignore
//! use sastlink_auth::oauth::{AuthorizationFlow, FlowOutcome, PendingRequestStore};
//!
//! let flow = AuthorizationFlow::new(server, PendingRequestStore::new(sessions));
//!
//! match flow.authorize(&session, &headers, form).await? {
//!     FlowOutcome::Grant { location } => { /* back to the client */ }
//!     FlowOutcome::RedirectLogin { location } => { /* to the login page */ }
//! }
//! ```

pub mod authorize;
pub mod code;
pub mod flow;
pub mod gate;
pub mod pending;
pub mod server;

pub use authorize::{AuthorizationRequest, AuthorizationResponse, RESPONSE_TYPE_CODE};
pub use code::AuthorizationCode;
pub use flow::{AuthorizationFlow, FlowOutcome, FlowState};
pub use gate::{
    Authentication, Authenticator, CredentialGate, Identity, IdentityVerifier,
    JwtIdentityVerifier,
};
pub use pending::{PENDING_REQUEST_SLOT, PendingRequest, PendingRequestStore};
pub use server::{AuthorizeDecision, OAuthServer};
