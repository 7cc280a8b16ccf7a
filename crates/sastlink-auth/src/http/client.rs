//! Client registration endpoints.
//!
//! ```text
//! POST /oauth/client   (form: redirect_uri)              -> generated client id
//! GET  /oauth/init?client_id=...&redirect_uri=...        -> caller-chosen id
//! ```

use axum::Form;
use axum::extract::rejection::{FormRejection, QueryRejection};
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use super::OAuthState;
use super::result::{ApiError, ApiResult, ResultCode};
use crate::AuthError;
use crate::types::Client;

/// Form body for self-service registration.
#[derive(Debug, Default, Deserialize)]
pub struct CreateClientForm {
    #[serde(default)]
    pub redirect_uri: Option<String>,
}

/// Query parameters for the bootstrap registration.
#[derive(Debug, Default, Deserialize)]
pub struct InitServerParams {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
}

/// A registered client as reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRegistration {
    pub client_id: String,
    pub redirect_domain: String,
}

impl From<Client> for ClientRegistration {
    fn from(client: Client) -> Self {
        Self {
            client_id: client.id,
            redirect_domain: client.redirect_domain,
        }
    }
}

/// POST /oauth/client handler.
///
/// Registers a client under a generated id. A missing or blank
/// `redirect_uri` is rejected before storage is touched.
pub async fn create_client_handler(
    State(state): State<OAuthState>,
    form: Result<Form<CreateClientForm>, FormRejection>,
) -> Result<ApiResult<ClientRegistration>, ApiError> {
    let Form(form) =
        form.map_err(|e| AuthError::validation(format!("malformed form body: {e}")))?;

    let redirect_uri = form
        .redirect_uri
        .filter(|uri| !uri.trim().is_empty())
        .ok_or_else(|| AuthError::missing_parameter("redirect_uri"))?;

    let client = state
        .server()
        .registry()
        .register_generated(&redirect_uri)
        .await?;

    Ok(ApiResult::ok(client.into()))
}

/// GET /oauth/init handler.
///
/// Registers a client under the supplied id. Missing parameters are
/// reported as `ClientErr`. The running engine is not rebuilt: it already
/// reads clients from the same registry.
pub async fn init_server_handler(
    State(state): State<OAuthState>,
    params: Result<Query<InitServerParams>, QueryRejection>,
) -> Result<ApiResult<ClientRegistration>, ApiError> {
    let Query(params) = params.map_err(|e| {
        ApiError::with_code(
            ResultCode::ClientErr,
            AuthError::validation(format!("malformed query: {e}")),
        )
    })?;

    let client_id = params.client_id.ok_or_else(|| {
        ApiError::with_code(ResultCode::ClientErr, AuthError::missing_parameter("client_id"))
    })?;
    let redirect_uri = params.redirect_uri.ok_or_else(|| {
        ApiError::with_code(
            ResultCode::ClientErr,
            AuthError::missing_parameter("redirect_uri"),
        )
    })?;

    let client = state
        .server()
        .registry()
        .register(&client_id, None, &redirect_uri)
        .await?;

    Ok(ApiResult::ok(client.into()))
}
