use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use database::{
    queries::{
        self,
        faculty::{Faculty, FacultyProfile},
    },
    types::{Designation, Permission},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::Principal,
    error::{AppError, Result},
    extract::{Json, Path, Query},
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
struct FacultyFilter {
    designation: Option<Designation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewFaculty {
    user_id: Uuid,
    #[serde(flatten)]
    profile: FacultyProfile,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Chairman {
    faculty_id: Uuid,
}

async fn list(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<FacultyFilter>,
) -> Result<Json<Vec<Faculty>>> {
    let client = state.pool.get().await?;
    Ok(Json(queries::faculty::list(&client, filter.designation).await?))
}

async fn get_one(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<Json<Faculty>> {
    let client = state.pool.get().await?;
    let faculty = queries::faculty::get(&client, id)
        .await?
        .ok_or(AppError::NotFound("faculty member"))?;

    Ok(Json(faculty))
}

async fn create(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(request): Json<NewFaculty>,
) -> Result<impl IntoResponse> {
    principal.require(Permission::ManageFaculty)?;

    let client = state.pool.get().await?;
    if queries::user::get(&client, request.user_id).await?.is_none() {
        return Err(AppError::bad_request("user does not exist"));
    }
    queries::faculty::insert(&client, request.user_id, &request.profile).await?;
    let faculty = queries::faculty::get(&client, request.user_id)
        .await?
        .ok_or(AppError::NotFound("faculty member"))?;

    Ok((StatusCode::CREATED, Json(faculty)))
}

async fn update(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(profile): Json<FacultyProfile>,
) -> Result<Json<Faculty>> {
    principal.require(Permission::ManageFaculty)?;

    let client = state.pool.get().await?;
    if queries::faculty::update(&client, id, &profile).await? == 0 {
        return Err(AppError::NotFound("faculty member"));
    }
    let faculty = queries::faculty::get(&client, id)
        .await?
        .ok_or(AppError::NotFound("faculty member"))?;

    Ok(Json(faculty))
}

async fn set_chairman(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(request): Json<Chairman>,
) -> Result<Json<Faculty>> {
    principal.require(Permission::ManageFaculty)?;

    let client = state.pool.get().await?;
    if queries::faculty::get(&client, request.faculty_id).await?.is_none() {
        return Err(AppError::NotFound("faculty member"));
    }
    queries::faculty::set_chairman(&client, request.faculty_id).await?;
    tracing::info!(faculty = %request.faculty_id, "chairman changed");

    let faculty = queries::faculty::get(&client, request.faculty_id)
        .await?
        .ok_or(AppError::NotFound("faculty member"))?;
    Ok(Json(faculty))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/faculty", get(list).post(create))
        .route("/api/faculty/chairman", put(set_chairman))
        .route("/api/faculty/{id}", get(get_one).put(update))
}
