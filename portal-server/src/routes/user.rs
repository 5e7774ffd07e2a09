use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use database::{
    is_unique_violation,
    queries::{
        self,
        role::Role,
        user::{NewUser, User},
    },
    types::Permission,
};
use serde::Deserialize;

use crate::{
    auth::{Principal, password},
    error::{AppError, Result},
    extract::Json,
    state::AppState,
};

#[derive(Debug, Deserialize)]
struct CreateUser {
    name: String,
    email: String,
    password: String,
    role: String,
}

async fn all_users(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<Json<Vec<User>>> {
    principal.require(Permission::ListAllUsers)?;

    let client = state.pool.get().await?;
    Ok(Json(queries::user::list(&client).await?))
}

/// Roles an account can be created with.
async fn roles(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<Json<Vec<Role>>> {
    principal.require(Permission::CreateUser)?;

    let client = state.pool.get().await?;
    Ok(Json(queries::role::list(&client).await?))
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(request): Json<CreateUser>,
) -> Result<impl IntoResponse> {
    principal.require(Permission::CreateUser)?;

    let email = request.email.trim();
    if request.name.trim().is_empty() || !email.contains('@') {
        return Err(AppError::bad_request("a name and a valid e-mail are required"));
    }
    if request.password.len() < 8 {
        return Err(AppError::bad_request("password must be at least 8 characters"));
    }

    let client = state.pool.get().await?;
    let role = queries::role::get_by_name(&client, &request.role)
        .await?
        .ok_or_else(|| AppError::bad_request(format!("unknown role {}", request.role)))?;
    let password_hash = password::hash(&request.password)?;

    let user = queries::user::insert(
        &client,
        &NewUser {
            name: request.name.trim(),
            email,
            password_hash: &password_hash,
            role_id: role.id,
        },
    )
    .await
    .map_err(|error| {
        if is_unique_violation(&error) {
            AppError::conflict("e-mail is already registered")
        } else {
            error.into()
        }
    })?;
    tracing::info!(user = %user.id, role = %role.name, "user created");

    Ok((StatusCode::CREATED, Json(user)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/user/allUsers", get(all_users))
        .route("/api/user/createUser", post(create_user))
        .route("/api/user/roles", get(roles))
}
