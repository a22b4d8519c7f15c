use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode, header::LOCATION};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use axum_extra::TypedHeader;
use oauth2_login::{AuthCallback, OAuth2Error, OAuth2Flow, STATE_COOKIE_NAME};

use crate::error::AuthError;

/// Routes for the login flow, to be nested under the configured prefix:
/// `GET /{provider}` starts a login, `GET /{provider}/callback` finishes
/// it.
pub fn oauth2_router(flow: Arc<OAuth2Flow>) -> Router {
    Router::new()
        .route("/{provider}", get(login))
        .route("/{provider}/callback", get(callback))
        .with_state(flow)
}

async fn login(
    State(flow): State<Arc<OAuth2Flow>>,
    Path(provider): Path<String>,
) -> Result<impl IntoResponse, AuthError> {
    let (auth_url, mut headers) = flow.prepare_auth_request(&provider)?;

    let location = HeaderValue::from_str(&auth_url)
        .map_err(|e| OAuth2Error::Internal(format!("invalid redirect target: {e}")))?;
    headers.insert(LOCATION, location);

    // 302, not 303: the client re-issues the GET at the provider.
    Ok((StatusCode::FOUND, headers))
}

async fn callback(
    State(flow): State<Arc<OAuth2Flow>>,
    Path(provider): Path<String>,
    Query(params): Query<AuthCallback>,
    cookies: Option<TypedHeader<headers::Cookie>>,
) -> Response {
    // No Cookie header at all is handled the same as a missing state.
    let state_cookie = cookies
        .as_ref()
        .and_then(|TypedHeader(cookies)| cookies.get(STATE_COOKIE_NAME));

    // The headers come back on both arms: after a successful validation
    // they carry the Set-Cookie that consumes the state, and that must
    // reach the client even when a later transition failed.
    let (headers, result) = flow
        .complete_authorization(&provider, &params, state_cookie)
        .await;

    match result {
        Ok(tokens) => (headers, Json(tokens)).into_response(),
        Err(error) => AuthError::with_headers(error, headers).into_response(),
    }
}
