use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use axum_extra::TypedHeader;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use oauth2_login::{AuthConfig, MemoryUserStore, OAuth2Flow, SqliteUserStore, User, UserStore};
use oauth2_login_axum::oauth2_router;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone)]
struct AppState {
    flow: Arc<OAuth2Flow>,
    store: Arc<dyn UserStore>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AuthConfig::from_env()?;
    let prefix = config.route_prefix.clone();

    let store: Arc<dyn UserStore> = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            tracing::info!(%url, "using SQLite user store");
            Arc::new(SqliteUserStore::connect(&url).await?)
        }
        Err(_) => {
            tracing::info!("DATABASE_URL not set, using in-memory user store");
            Arc::new(MemoryUserStore::new())
        }
    };

    let flow = Arc::new(OAuth2Flow::new(config, store.clone())?);
    let state = AppState {
        flow: flow.clone(),
        store,
    };

    let app = Router::new()
        .route("/", get(index))
        .route("/me", get(me))
        .with_state(state)
        .nest(&prefix, oauth2_router(flow));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3001").await?;
    tracing::info!("listening on http://127.0.0.1:3001");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index(State(state): State<AppState>) -> Html<String> {
    let prefix = &state.flow.config().route_prefix;
    Html(format!(
        "<h1>demo-login</h1>\
         <p><a href=\"{prefix}/github\">Sign in with GitHub</a></p>\
         <p><a href=\"{prefix}/google\">Sign in with Google</a></p>"
    ))
}

/// Protected route: resolves the bearer token back to the account it was
/// issued for.
async fn me(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
) -> Result<Json<User>, StatusCode> {
    let TypedHeader(auth) = auth.ok_or(StatusCode::UNAUTHORIZED)?;

    let claims = state
        .flow
        .issuer()
        .verify_access_token(auth.token())
        .map_err(|e| {
            tracing::debug!(error = %e, "access token rejected");
            StatusCode::UNAUTHORIZED
        })?;

    let user = state
        .store
        .get_user(&claims.sub)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "user lookup failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    Ok(Json(user))
}
