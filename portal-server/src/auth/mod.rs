//! Session resolution and permission guards.
//!
//! A request is authenticated by the `SESSION` cookie. The cookie value is the
//! primary key of a session row; the row names the user, and the user's role
//! names the permission set checked by [`Principal::require`].

pub mod password;
pub mod session;

use std::{collections::BTreeSet, sync::Arc};

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::CookieJar;
use chrono::{DateTime, Duration, Utc};
use database::{GenericClient, queries, types::Permission};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    state::AppState,
};

#[derive(Debug, Clone, Serialize)]
pub struct PrincipalRole {
    pub id: i32,
    pub name: String,
    pub permissions: BTreeSet<Permission>,
}

/// The authenticated subject of one request.
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: PrincipalRole,
}

impl Principal {
    pub fn has(&self, permission: Permission) -> bool {
        self.role.permissions.contains(&permission)
    }

    pub fn require(&self, permission: Permission) -> Result<()> {
        if self.has(permission) {
            return Ok(());
        }

        tracing::debug!(user = %self.id, %permission, "permission denied");
        Err(AppError::Forbidden(format!("missing permission {permission}")))
    }
}

async fn load_permissions(client: &impl GenericClient, role_id: i32) -> Result<BTreeSet<Permission>> {
    let names = queries::role::permission_names(client, role_id).await?;

    Ok(names
        .into_iter()
        .filter_map(|name| match name.parse::<Permission>() {
            Ok(permission) => Some(permission),
            Err(error) => {
                tracing::warn!(%error, role_id, "ignoring permission outside the vocabulary");
                None
            }
        })
        .collect())
}

/// Turns a session token into a principal. Expired sessions are deleted on
/// sight.
#[tracing::instrument(skip_all)]
pub async fn resolve(client: &impl GenericClient, token: &str, now: DateTime<Utc>) -> Result<Principal> {
    let Some(owner) = queries::session::get_owner(client, token).await? else {
        tracing::debug!("unknown session token");
        return Err(AppError::Unauthenticated);
    };

    if owner.expires_at <= now {
        tracing::debug!(user = %owner.user_id, "session expired");
        queries::session::delete(client, token).await?;
        return Err(AppError::Unauthenticated);
    }

    Ok(Principal {
        id: owner.user_id,
        name: owner.name,
        email: owner.email,
        role: PrincipalRole {
            id: owner.role_id,
            name: owner.role_name,
            permissions: load_permissions(client, owner.role_id).await?,
        },
    })
}

impl FromRequestParts<Arc<AppState>> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self> {
        let jar = CookieJar::from_headers(&parts.headers);
        let Some(cookie) = jar.get(session::COOKIE_NAME) else {
            tracing::debug!("request without session cookie");
            return Err(AppError::Unauthenticated);
        };

        let client = state.pool.get().await?;
        resolve(&client, cookie.value(), Utc::now()).await
    }
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// A freshly created session for `principal`.
#[derive(Debug)]
pub struct Login {
    pub principal: Principal,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[tracing::instrument(skip_all, fields(email = %credentials.email))]
pub async fn login(
    client: &impl GenericClient,
    credentials: &Credentials,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<Login> {
    let invalid = || AppError::Unauthenticated;

    let user = queries::user::get_by_email(client, &credentials.email)
        .await?
        .ok_or_else(invalid)?;
    if !password::verify(&credentials.password, &user.password_hash) {
        tracing::debug!(user = %user.id, "wrong password");
        return Err(invalid());
    }

    let token = session::generate_token();
    let expires_at = now + ttl;
    queries::session::insert(client, &token, user.id, expires_at).await?;
    tracing::info!(user = %user.id, "session opened");

    let principal = resolve(client, &token, now).await?;

    Ok(Login {
        principal,
        token,
        expires_at,
    })
}
