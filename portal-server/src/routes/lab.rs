use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use chrono::{NaiveDate, Utc};
use database::{
    queries::{
        self,
        lab::{Lab, NewLab},
        lab_booking::{LabBooking, LabBookingFilter},
    },
    types::{DayOfWeek, Permission},
};
use serde::Deserialize;
use timeslot::{Interval, TimeOfDay};
use uuid::Uuid;

use crate::{
    auth::Principal,
    booking::lab::{self, LabBookingRequest, LabBookingReview, SlotAvailability},
    error::{AppError, Result},
    extract::{Json, Path, Query},
    state::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewTimeSlot {
    day: DayOfWeek,
    start_time: TimeOfDay,
    end_time: TimeOfDay,
}

#[derive(Debug, Deserialize)]
struct AvailabilityQuery {
    date: NaiveDate,
}

async fn list_labs(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Lab>>> {
    let client = state.pool.get().await?;
    Ok(Json(queries::lab::list(&client).await?))
}

async fn get_lab(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<Json<Lab>> {
    let client = state.pool.get().await?;
    let lab = queries::lab::get(&client, id)
        .await?
        .ok_or(AppError::NotFound("lab"))?;

    Ok(Json(lab))
}

async fn create_lab(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(lab): Json<NewLab>,
) -> Result<impl IntoResponse> {
    principal.require(Permission::CreateLab)?;
    if lab.capacity <= 0 {
        return Err(AppError::bad_request("capacity must be positive"));
    }

    let client = state.pool.get().await?;
    let lab = queries::lab::insert(&client, &lab).await?;

    Ok((StatusCode::CREATED, Json(lab)))
}

async fn delete_lab(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    principal.require(Permission::CreateLab)?;

    let client = state.pool.get().await?;
    if queries::lab::delete(&client, id).await? == 0 {
        return Err(AppError::NotFound("lab"));
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn add_time_slot(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(slot): Json<NewTimeSlot>,
) -> Result<impl IntoResponse> {
    principal.require(Permission::CreateLab)?;
    let interval = Interval::new(slot.start_time, slot.end_time)?;

    let client = state.pool.get().await?;
    if !queries::lab::exists(&client, id).await? {
        return Err(AppError::NotFound("lab"));
    }
    let slot = queries::lab::insert_time_slot(&client, id, slot.day, interval).await?;

    Ok((StatusCode::CREATED, Json(slot)))
}

async fn availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Vec<SlotAvailability>>> {
    Ok(Json(lab::availability(&state.pool, id, query.date).await?))
}

async fn book(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(request): Json<LabBookingRequest>,
) -> Result<impl IntoResponse> {
    principal.require(Permission::BookLab)?;

    let booking = lab::create(&state.pool, &principal, &request, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

async fn list_bookings(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Query(filter): Query<LabBookingFilter>,
) -> Result<Json<Vec<LabBooking>>> {
    Ok(Json(lab::list(&state.pool, &principal, filter).await?))
}

async fn review(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(review): Json<LabBookingReview>,
) -> Result<Json<LabBooking>> {
    principal.require(Permission::ApproveLabBooking)?;

    Ok(Json(lab::review(&state.pool, id, &review).await?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/labs", get(list_labs).post(create_lab))
        .route("/api/labs/{id}", get(get_lab).delete(delete_lab))
        .route("/api/labs/{id}/time-slots", post(add_time_slot))
        .route("/api/labs/{id}/availability", get(availability))
        .route("/api/lab-bookings", get(list_bookings).post(book))
        .route("/api/lab-bookings/{id}", patch(review))
}
