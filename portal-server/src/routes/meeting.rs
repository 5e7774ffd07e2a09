use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
};
use chrono::{NaiveDate, Utc};
use database::queries::meeting::{Meeting, MeetingFilter};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::Principal,
    booking::meeting::{self, Availability, MeetingChanges, MeetingRequest, Rsvp},
    error::Result,
    extract::{Json, Path, Query},
    state::AppState,
};

#[derive(Debug, Deserialize)]
struct AvailabilityQuery {
    date: NaiveDate,
}

async fn list(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Query(filter): Query<MeetingFilter>,
) -> Result<Json<Vec<Meeting>>> {
    Ok(Json(meeting::list(&state.pool, &principal, &filter).await?))
}

async fn create(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(request): Json<MeetingRequest>,
) -> Result<impl IntoResponse> {
    let meeting = meeting::create(&state.pool, &principal, &request, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(meeting)))
}

async fn get_one(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<Meeting>> {
    Ok(Json(meeting::get(&state.pool, &principal, id).await?))
}

async fn update(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(changes): Json<MeetingChanges>,
) -> Result<Json<Meeting>> {
    Ok(Json(
        meeting::update(&state.pool, &principal, id, &changes, Utc::now()).await?,
    ))
}

async fn delete(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    meeting::delete(&state.pool, &principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn rsvp(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(rsvp): Json<Rsvp>,
) -> Result<Json<Meeting>> {
    Ok(Json(meeting::rsvp(&state.pool, &principal, id, &rsvp).await?))
}

async fn availability(
    State(state): State<Arc<AppState>>,
    _principal: Principal,
    Path(faculty_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Availability>> {
    Ok(Json(
        meeting::availability(&state.pool, &state.config, faculty_id, query.date).await?,
    ))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/meetings", get(list).post(create))
        .route("/api/meetings/", get(list).post(create))
        .route(
            "/api/meetings/faculty/{id}/availability",
            get(availability),
        )
        .route("/api/meetings/{id}", get(get_one).put(update).delete(delete))
        .route("/api/meetings/{id}/rsvp", patch(rsvp))
}
