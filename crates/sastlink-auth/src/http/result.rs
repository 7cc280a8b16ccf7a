//! Uniform JSON result envelope.
//!
//! Every endpoint except the redirecting ones answers with
//!
//! ```json
//! {"success": false, "errCode": "ParamError", "errMsg": "...", "data": null}
//! ```
//!
//! Client-input failures are 400, everything else 500. Server-side error
//! messages are logged and replaced with a generic text in the body.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

// =============================================================================
// Envelope
// =============================================================================

/// Machine-readable failure code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultCode {
    /// Missing or malformed request parameter.
    ParamError,
    /// Unknown or conflicting client, or other bad client input.
    ClientErr,
    /// Storage, engine or other server-side failure.
    InternalErr,
}

impl ResultCode {
    /// Picks the code for an error.
    #[must_use]
    pub fn for_error(error: &AuthError) -> Self {
        match error {
            AuthError::Validation { .. } => Self::ParamError,
            AuthError::DuplicateClient { .. } | AuthError::NotFound { .. } => Self::ClientErr,
            _ => Self::InternalErr,
        }
    }

    /// HTTP status mirroring the code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::ParamError | Self::ClientErr => StatusCode::BAD_REQUEST,
            Self::InternalErr => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// The result envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResult<T> {
    pub success: bool,
    pub err_code: Option<ResultCode>,
    pub err_msg: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResult<T> {
    /// A success envelope carrying `data`.
    #[must_use]
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            err_code: None,
            err_msg: None,
            data: Some(data),
        }
    }

    /// A success envelope without data.
    #[must_use]
    pub fn ok_empty() -> Self {
        Self {
            success: true,
            err_code: None,
            err_msg: None,
            data: None,
        }
    }

    /// A failure envelope.
    #[must_use]
    pub fn failed(code: ResultCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            err_code: Some(code),
            err_msg: Some(message.into()),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResult<T> {
    fn into_response(self) -> Response {
        let status = self.err_code.map_or(StatusCode::OK, |code| code.status());
        (status, Json(self)).into_response()
    }
}

// =============================================================================
// Errors
// =============================================================================

/// An error on its way to the envelope, with an optional code override.
#[derive(Debug)]
pub struct ApiError {
    code: ResultCode,
    error: AuthError,
}

impl ApiError {
    /// Reports `error` under an explicit code.
    #[must_use]
    pub fn with_code(code: ResultCode, error: AuthError) -> Self {
        Self { code, error }
    }

    /// The reported code.
    #[must_use]
    pub fn code(&self) -> ResultCode {
        self.code
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        Self {
            code: ResultCode::for_error(&error),
            error,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = if self.error.is_server_error() {
            tracing::error!(
                error = %self.error,
                error.category = %self.error.category(),
                "Request failed"
            );
            "internal server error".to_string()
        } else {
            tracing::debug!(
                error = %self.error,
                error.category = %self.error.category(),
                "Request rejected"
            );
            self.error.to_string()
        };

        ApiResult::<()>::failed(self.code, message).into_response()
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
