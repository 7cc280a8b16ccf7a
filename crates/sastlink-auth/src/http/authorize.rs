//! Authorization endpoint handlers.
//!
//! # Flow
//!
//! ```text
//! GET|POST /oauth/authorize
//!     ├─► pending request in session → merge it, clear the slot
//!     ├─► no valid login token       → stash request, 302 to login page
//!     ├─► valid login token          → issue code, 302 to client
//!     └─► failure                    → result envelope, no redirect
//! ```
//!
//! The browser session is correlated through an http-only cookie that is
//! set whenever a new session is started.

use axum::extract::{RawQuery, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use cookie::{Cookie, SameSite};

use super::OAuthState;
use super::result::ApiResult;
use crate::config::SessionConfig;
use crate::session::Session;
use crate::types::FormValues;

/// GET /oauth/authorize handler.
pub async fn authorize_get(
    State(state): State<OAuthState>,
    jar: CookieJar,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    let form = FormValues::parse(query.as_deref().unwrap_or_default());
    authorize(state, jar, headers, form).await
}

/// POST /oauth/authorize handler.
///
/// Body parameters come first, query parameters are appended after them.
pub async fn authorize_post(
    State(state): State<OAuthState>,
    jar: CookieJar,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: String,
) -> Response {
    let mut form = FormValues::parse(&body);
    for (key, value) in FormValues::parse(query.as_deref().unwrap_or_default()).iter() {
        form.append(key, value);
    }
    authorize(state, jar, headers, form).await
}

async fn authorize(
    state: OAuthState,
    jar: CookieJar,
    headers: HeaderMap,
    form: FormValues,
) -> Response {
    let config = &state.session_config;
    let cookie_id = jar.get(&config.cookie_name).map(|c| c.value().to_string());

    let session =
        match Session::start(state.sessions.as_ref(), cookie_id.as_deref(), config.ttl).await {
            Ok(session) => session,
            Err(e) => return e.into_response(),
        };

    let jar = if session.is_new() {
        jar.add(session_cookie(config, session.id()))
    } else {
        jar
    };

    match state.flow.authorize(&session, &headers, form).await {
        Ok(outcome) => (jar, found(outcome.location())).into_response(),
        Err(e) => (jar, e).into_response(),
    }
}

/// GET /oauth/user-auth handler.
///
/// Only checks that a login token header is present. A request without one
/// is sent to the login page; otherwise an empty success envelope is
/// returned.
pub async fn user_auth_handler(State(state): State<OAuthState>, headers: HeaderMap) -> Response {
    let config = state.server().config();

    let has_token = headers
        .get(config.token_header.as_str())
        .and_then(|value| value.to_str().ok())
        .is_some_and(|token| !token.trim().is_empty());

    if !has_token {
        return found(&config.login_url);
    }

    tracing::debug!("User-auth check passed on header presence only");
    ApiResult::<()>::ok_empty().into_response()
}

/// A 302 Found redirect.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Create the browser session cookie.
fn session_cookie(config: &SessionConfig, session_id: &str) -> Cookie<'static> {
    let max_age = time::Duration::try_from(config.ttl).unwrap_or(time::Duration::MAX);

    Cookie::build((config.cookie_name.clone(), session_id.to_string()))
        .http_only(true)
        .secure(config.secure_cookies)
        .same_site(SameSite::Lax)
        .path(config.cookie_path.clone())
        .max_age(max_age)
        .build()
}
