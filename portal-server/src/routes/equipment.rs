use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, put},
};
use database::{
    queries::{
        self,
        equipment::{Equipment, EquipmentCategory, EquipmentFields},
        equipment_booking::{EquipmentBooking, EquipmentBookingFilter},
    },
    types::Permission,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::Principal,
    booking::equipment::{self, EquipmentBookingRequest, EquipmentBookingReview},
    error::{AppError, Result},
    extract::{Json, Path, Query},
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EquipmentFilter {
    category_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct NewCategory {
    name: String,
}

async fn list(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<EquipmentFilter>,
) -> Result<Json<Vec<Equipment>>> {
    let client = state.pool.get().await?;
    Ok(Json(queries::equipment::list(&client, filter.category_id).await?))
}

async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<EquipmentCategory>>> {
    let client = state.pool.get().await?;
    Ok(Json(queries::equipment::list_categories(&client).await?))
}

async fn create_category(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(category): Json<NewCategory>,
) -> Result<impl IntoResponse> {
    principal.require(Permission::ManageEquipment)?;
    let name = category.name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("category name is required"));
    }

    let client = state.pool.get().await?;
    let category = queries::equipment::insert_category(&client, name).await?;

    Ok((StatusCode::CREATED, Json(category)))
}

async fn create(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(fields): Json<EquipmentFields>,
) -> Result<impl IntoResponse> {
    principal.require(Permission::ManageEquipment)?;

    let equipment = equipment::create(&state.pool, &fields).await?;
    Ok((StatusCode::CREATED, Json(equipment)))
}

async fn update(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(fields): Json<EquipmentFields>,
) -> Result<Json<Equipment>> {
    principal.require(Permission::ManageEquipment)?;

    Ok(Json(equipment::update(&state.pool, id, &fields).await?))
}

async fn delete(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    principal.require(Permission::ManageEquipment)?;

    let client = state.pool.get().await?;
    if queries::equipment::delete(&client, id).await? == 0 {
        return Err(AppError::NotFound("equipment"));
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn book(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(request): Json<EquipmentBookingRequest>,
) -> Result<impl IntoResponse> {
    principal.require(Permission::BookEquipment)?;

    let booking = equipment::book(&state.pool, &principal, &request).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

async fn list_bookings(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Query(filter): Query<EquipmentBookingFilter>,
) -> Result<Json<Vec<EquipmentBooking>>> {
    Ok(Json(
        equipment::list_bookings(&state.pool, &principal, filter).await?,
    ))
}

async fn review(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(review): Json<EquipmentBookingReview>,
) -> Result<Json<EquipmentBooking>> {
    principal.require(Permission::ApproveEquipmentBooking)?;

    Ok(Json(equipment::review(&state.pool, id, &review).await?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/equipment", get(list).post(create))
        .route(
            "/api/equipment/categories",
            get(list_categories).post(create_category),
        )
        .route("/api/equipment/bookings", get(list_bookings).post(book))
        .route("/api/equipment/bookings/{id}", patch(review))
        .route("/api/equipment/{id}", put(update).delete(delete))
}
