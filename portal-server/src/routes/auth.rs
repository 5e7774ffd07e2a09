use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use chrono::{Duration, Utc};
use database::queries;

use crate::{
    auth::{self, Credentials, Principal, session},
    error::Result,
    extract::Json,
    state::AppState,
};

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(credentials): Json<Credentials>,
) -> Result<impl IntoResponse> {
    let client = state.pool.get().await?;
    let login = auth::login(
        &client,
        &credentials,
        Duration::hours(state.config.session_ttl_hours),
        Utc::now(),
    )
    .await?;
    let cookie = session::cookie(login.token, login.expires_at, state.config.secure_cookies)?;

    Ok((jar.add(cookie), Json(login.principal)))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    jar: CookieJar,
) -> Result<impl IntoResponse> {
    if let Some(cookie) = jar.get(session::COOKIE_NAME) {
        let client = state.pool.get().await?;
        queries::session::delete(&client, cookie.value()).await?;
        tracing::info!(user = %principal.id, "session closed");
    }

    Ok((jar.remove(session::removal_cookie()), StatusCode::NO_CONTENT))
}

async fn me(principal: Principal) -> Json<Principal> {
    Json(principal)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
}
