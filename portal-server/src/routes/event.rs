use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use database::{
    queries::{
        event::{Event, EventFields, EventFilter},
        event_registration::EventRegistration,
    },
    types::Permission,
};
use uuid::Uuid;

use crate::{
    auth::Principal,
    error::{AppError, Result},
    event::{self, RegistrationRequest},
    extract::{Json, Path, Query},
    state::AppState,
};

async fn list(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<EventFilter>,
) -> Result<Json<Vec<Event>>> {
    Ok(Json(event::list(&state.pool, &filter).await?))
}

async fn get_one(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<Json<Event>> {
    Ok(Json(event::get(&state.pool, id).await?))
}

async fn create(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(fields): Json<EventFields>,
) -> Result<impl IntoResponse> {
    principal.require(Permission::ManageEvents)?;

    let event = event::create(&state.pool, &fields).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

async fn update(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(fields): Json<EventFields>,
) -> Result<Json<Event>> {
    principal.require(Permission::ManageEvents)?;

    Ok(Json(event::update(&state.pool, id, &fields).await?))
}

async fn delete(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    principal.require(Permission::ManageEvents)?;

    event::delete(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The body is optional; an empty request registers with the account's own
/// name and e-mail.
async fn register(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<impl IntoResponse> {
    principal.require(Permission::RegisterEvent)?;

    let request: RegistrationRequest = if body.iter().all(u8::is_ascii_whitespace) {
        RegistrationRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|error| AppError::bad_request(format!("invalid registration body: {error}")))?
    };
    let registration = event::register(&state.pool, &principal, id, &request, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(registration)))
}

async fn registrations(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<EventRegistration>>> {
    principal.require(Permission::ManageEvents)?;

    Ok(Json(event::registrations(&state.pool, id).await?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/events", get(list).post(create))
        .route(
            "/api/events/{id}",
            get(get_one).put(update).delete(delete),
        )
        .route("/api/events/{id}/register", post(register))
        .route("/api/events/{id}/registrations", get(registrations))
}
